//! Out-of-band debugger runtime for embedding into a host virtual machine.
//!
//! A host VM implements [`VmAdapter`] for its own instruction loop, then
//! drives a [`ServerApp`] once per instruction from that loop. The debugger
//! runs entirely out of band: it never owns the VM's control flow, only
//! observes each completed instruction and decides, from breakpoints and the
//! current [`ResumeType`], whether the VM should keep ticking or block until
//! a client tells it to resume.
//!
//! Three ways to talk to a running session:
//! - an in-process [`client::InProcessBackend`], for a host that wants to
//!   drive its own debugger without a socket in between;
//! - the bundled TCP handler (`ServerConfig::mode_tcp`), to be reached with
//!   [`client::TcpBackend`] from another process or from the `odb-cli`
//!   binary;
//! - the on-server line CLI (`ServerConfig::mode_server_cli`), which needs
//!   no client at all.
//!
//! Do not depend on `odb-core` directly: it is the engine behind this
//! crate.

#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub use odb_core::config::{ClientConfig, ServerConfig};
pub use odb_core::error::{Error, Result};
pub use odb_core::server::ServerApp;
pub use odb_core::vm_api::{UpdateInfos, UpdateState, VmAdapter};

pub use odb_core::types::{
    Addr, CallFrame, CallStack, RegId, RegInfos, RegKind, ResumeType, Size, StoppedState,
    StoppedUpdate, SymId, SymbolInfos, VmInfos, DEFAULT_SYMBOL_PRELOAD_WINDOW, DEFAULT_TCP_PORT,
    SYM_ID_NONE,
};

/// Talks to a running session: over a socket, in process, or (for the
/// `odb-cli` binary) from a standalone client process.
pub mod client {
    pub use odb_core::client::{Backend, ClientFacade, ClientState, FetchCache, InProcessBackend, TcpBackend};
}

/// The line-oriented command language shared by the on-server CLI and the
/// `odb-cli` binary: same grammar, same symbol/register substitution rules,
/// wherever it runs.
pub mod cli {
    pub use odb_core::cli::evaluate;
}
