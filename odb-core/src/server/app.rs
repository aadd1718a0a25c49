//! The host-facing entry point: a struct a VM's own main loop calls once per
//! instruction. Lazily builds the debugger and handler set on first use, so
//! a disabled debugger costs one branch, and drives the connection-bringup
//! / dispatch / cooperative-stop dance described alongside it.

use std::net::TcpListener;
use std::time::Duration;

use log::debug;

use crate::client::{ClientFacade, ClientState, FetchCache, InProcessBackend};
use crate::config::ServerConfig;
use crate::debugger::{Debugger, State};
use crate::server::dispatch::dispatch;
use crate::server::{sighandler, ServerTransport};
use crate::types::{ResumeType, VmInfos};
use crate::vm_api::VmAdapter;
use crate::wire::{Request, Response};
use crate::{cli, Result};

/// Bookkeeping for the in-process CLI: the façade itself can't be stored
/// (its backend borrows the debugger for one call), so its state and cache
/// are carried across lines instead.
struct LocalCli {
    state: ClientState,
    cache: FetchCache,
    vm_infos: Option<VmInfos>,
}

impl LocalCli {
    fn new() -> Self {
        LocalCli {
            state: ClientState::NotConnected,
            cache: FetchCache::new(),
            vm_infos: None,
        }
    }
}

pub struct ServerApp<V> {
    config: ServerConfig,
    vm: Option<V>,
    debugger: Option<Debugger<V>>,
    listener: Option<TcpListener>,
    transport: Option<ServerTransport>,
    local_cli: Option<LocalCli>,
}

impl<V: VmAdapter> ServerApp<V> {
    pub fn new(vm: V, config: ServerConfig) -> Result<Self> {
        if config.server_cli_sighandler {
            sighandler::install()?;
        }
        Ok(ServerApp {
            config,
            vm: Some(vm),
            debugger: None,
            listener: None,
            transport: None,
            local_cli: None,
        })
    }

    /// Call once per VM instruction. A no-op when `enabled` is false.
    pub fn on_tick(&mut self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.ensure_active();

        if self.config.mode_tcp {
            self.try_accept()?;
        }

        self.debugger_mut().on_update();

        if sighandler::take_stop_request() {
            let _ = self.debugger_mut().stop();
        }

        if self.debugger_mut().state().is_stopped() {
            self.drain_stopped_session()?;
        } else {
            self.probe_running()?;
        }
        Ok(())
    }

    fn ensure_active(&mut self) {
        if self.debugger.is_some() {
            return;
        }
        let vm = self.vm.take().expect("activated at most once");
        let mut debugger = Debugger::new(vm);
        debugger.on_init();
        if self.config.nostart {
            debugger.force_stopped();
        }
        self.debugger = Some(debugger);
    }

    fn debugger_mut(&mut self) -> &mut Debugger<V> {
        self.debugger.as_mut().expect("ensure_active runs first")
    }

    fn try_accept(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Ok(());
        }
        if self.listener.is_none() {
            let listener = TcpListener::bind(("0.0.0.0", self.config.tcp_port))?;
            listener.set_nonblocking(true)?;
            self.listener = Some(listener);
        }
        match self.listener.as_ref().unwrap().accept() {
            Ok((stream, peer)) => {
                debug!("accepted connection from {peer}");
                self.transport = Some(ServerTransport::spawn(stream)?);
                let _ = self.debugger_mut().stop();
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// While the VM is running: service a pending `stop`/`check_stopped`
    /// without blocking.
    fn probe_running(&mut self) -> Result<()> {
        if self.transport.as_ref().map(|t| t.is_errored()).unwrap_or(false) {
            self.on_disconnect();
            return Ok(());
        }
        if let Some(bytes) = self.transport.as_ref().and_then(|t| t.poll_request()) {
            self.serve_one(&bytes)?;
        }
        Ok(())
    }

    /// While the VM is stopped: block here, servicing one request/command
    /// at a time, until the session resumes it or disconnects.
    fn drain_stopped_session(&mut self) -> Result<()> {
        loop {
            if self.debugger_mut().state() != State::Stopped {
                return Ok(());
            }
            if self.transport.is_some() {
                if self.transport.as_ref().unwrap().is_errored() {
                    self.on_disconnect();
                    return Ok(());
                }
                match self.transport.as_ref().unwrap().poll_request() {
                    Some(bytes) => self.serve_one(&bytes)?,
                    None => std::thread::sleep(Duration::from_millis(2)),
                }
            } else if self.config.mode_server_cli {
                self.serve_one_local_cli_line()?;
            } else {
                return Ok(());
            }
        }
    }

    fn serve_one(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let wire_tag = bytes[0] as i8;
        let (resp, req_tag) = match Request::decode_body(wire_tag, &bytes[1..]) {
            Ok(req) => {
                let req_tag = req.tag();
                (dispatch(self.debugger_mut(), req), req_tag)
            }
            Err(e) => (
                Response::Err {
                    message: e.to_string(),
                },
                wire_tag,
            ),
        };
        if let Some(transport) = &self.transport {
            transport.send_response(resp.encode(req_tag));
        }
        Ok(())
    }

    fn serve_one_local_cli_line(&mut self) -> Result<()> {
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            self.on_disconnect();
            return Ok(());
        }
        if self.local_cli.is_none() {
            self.local_cli = Some(LocalCli::new());
        }
        let local = self.local_cli.as_mut().unwrap();
        let state = local.state;
        let cache = std::mem::take(&mut local.cache);
        let vm_infos = local.vm_infos.take();

        let debugger = self.debugger.as_mut().expect("ensure_active runs first");
        let backend = InProcessBackend::new(debugger);
        let mut facade = ClientFacade::from_parts(backend, state, cache, vm_infos);
        let output = cli::evaluate(line.trim_end(), &mut facade);
        let (state, cache, vm_infos) = facade.into_parts();

        let local = self.local_cli.as_mut().unwrap();
        local.state = state;
        local.cache = cache;
        local.vm_infos = vm_infos;

        println!("{output}");
        Ok(())
    }

    /// Client disconnect (transport error or local CLI EOF) while stopped:
    /// resume to completion rather than leave the host VM paused forever.
    fn on_disconnect(&mut self) {
        self.transport = None;
        self.local_cli = None;
        if self.debugger_mut().state() == State::Stopped {
            let _ = self.debugger_mut().resume(ResumeType::ToFinish);
        }
    }
}
