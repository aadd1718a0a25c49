//! TCP transport helper: a background thread owns the socket and exchanges
//! one request/response frame at a time with the VM-owning thread through a
//! small atomic state word. Keeps socket I/O off the thread that is ticking
//! the host VM, without needing an async runtime.

use std::net::TcpStream;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;

use log::{debug, warn};

use crate::wire::framing::{recv_frame, send_frame, tune_tcp_stream};
use crate::Result;

const CONNECTING: u8 = 0;
const NO_REQ: u8 = 1;
const HAS_REQ: u8 = 2;
const SENDING_RES: u8 = 3;
const ERROR: u8 = 4;

struct Shared {
    state: AtomicU8,
    inbox: Mutex<Option<Vec<u8>>>,
    outbox: Mutex<Option<Vec<u8>>>,
}

/// Handle the VM-owning thread polls once per instruction. The paired
/// background thread is joined on drop.
pub struct ServerTransport {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl ServerTransport {
    /// Spawns the background I/O thread for an already-accepted connection.
    /// Starts in `connecting`, which the thread moves out of the instant it
    /// starts waiting for the first frame.
    pub fn spawn(stream: TcpStream) -> Result<Self> {
        tune_tcp_stream(&stream)?;
        let shared = Arc::new(Shared {
            state: AtomicU8::new(CONNECTING),
            inbox: Mutex::new(None),
            outbox: Mutex::new(None),
        });
        let worker_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || io_loop(stream, worker_shared));
        Ok(ServerTransport {
            shared,
            handle: Some(handle),
        })
    }

    /// Non-blocking: returns the next request frame if the I/O thread has
    /// one ready, else `None`. Call once per instruction.
    pub fn poll_request(&self) -> Option<Vec<u8>> {
        if self.shared.state.load(Ordering::Acquire) == HAS_REQ {
            self.shared.inbox.lock().unwrap().take()
        } else {
            None
        }
    }

    /// Hands a response frame to the I/O thread and moves the lifecycle to
    /// `sending_res`. Must only be called after `poll_request` returned
    /// `Some`.
    pub fn send_response(&self, bytes: Vec<u8>) {
        *self.shared.outbox.lock().unwrap() = Some(bytes);
        self.shared.state.store(SENDING_RES, Ordering::Release);
    }

    /// True once the I/O thread has hit an unrecoverable transport error;
    /// the connection is dead and should be torn down.
    pub fn is_errored(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == ERROR
    }
}

impl Drop for ServerTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn io_loop(stream: TcpStream, shared: Arc<Shared>) {
    let mut reader = stream.try_clone().expect("tcp stream clone");
    let mut writer = stream;
    shared.state.store(NO_REQ, Ordering::Release);

    loop {
        let bytes = match recv_frame(&mut reader) {
            Ok(b) => b,
            Err(e) => {
                debug!("transport read failed, closing: {e}");
                shared.state.store(ERROR, Ordering::Release);
                return;
            }
        };
        *shared.inbox.lock().unwrap() = Some(bytes);
        shared.state.store(HAS_REQ, Ordering::Release);

        loop {
            match shared.state.load(Ordering::Acquire) {
                SENDING_RES => break,
                ERROR => return,
                _ => thread::yield_now(),
            }
        }

        let resp = shared
            .outbox
            .lock()
            .unwrap()
            .take()
            .expect("sending_res implies a response was queued");
        if let Err(e) = send_frame(&mut writer, &resp) {
            warn!("transport write failed, closing: {e}");
            shared.state.store(ERROR, Ordering::Release);
            return;
        }
        shared.state.store(NO_REQ, Ordering::Release);
    }
}
