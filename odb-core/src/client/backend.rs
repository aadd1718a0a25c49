//! The capability set a client façade needs from whatever it is actually
//! talking to: "run this request, get a response back". Two implementors —
//! a TCP round-trip and a direct in-process call against a live debugger —
//! so the façade, the fetch cache and the CLI evaluator never know which one
//! they are driving.

use std::net::TcpStream;

use crate::debugger::Debugger;
use crate::server::dispatch::dispatch;
use crate::vm_api::VmAdapter;
use crate::wire::framing::{recv_frame, send_frame, tune_tcp_stream};
use crate::wire::{Request, Response};
use crate::{Error, Result};

pub trait Backend {
    fn call(&mut self, req: Request) -> Result<Response>;
}

/// Talks to a real `odb` server over a blocking TCP connection: one
/// request frame out, one response frame back, every call.
pub struct TcpBackend {
    stream: TcpStream,
}

impl TcpBackend {
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        tune_tcp_stream(&stream)?;
        Ok(TcpBackend { stream })
    }
}

impl Backend for TcpBackend {
    fn call(&mut self, req: Request) -> Result<Response> {
        let tag = req.tag();
        send_frame(&mut self.stream, &req.encode())?;
        let bytes = recv_frame(&mut self.stream)?;
        if bytes.is_empty() {
            return Err(Error::transport("empty response frame"));
        }
        let wire_tag = bytes[0] as i8;
        Response::decode(&req, wire_tag, &bytes[1..])
    }
}

/// Drives a debugger directly on the same thread, through the same dispatch
/// switch the TCP server uses. Backs the local `mode_server_cli` evaluator
/// and every in-process integration test; never errors itself, since
/// `dispatch` already turns failures into `Response::Err`.
pub struct InProcessBackend<'a, V> {
    debugger: &'a mut Debugger<V>,
}

impl<'a, V: VmAdapter> InProcessBackend<'a, V> {
    pub fn new(debugger: &'a mut Debugger<V>) -> Self {
        InProcessBackend { debugger }
    }
}

impl<'a, V: VmAdapter> Backend for InProcessBackend<'a, V> {
    fn call(&mut self, req: Request) -> Result<Response> {
        Ok(dispatch(self.debugger, req))
    }
}
