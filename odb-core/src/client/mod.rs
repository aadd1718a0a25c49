//! The client side: a state-gated façade over either an in-process or a
//! TCP-backed connection to a running debugger, with a fetch cache batching
//! register lookups underneath it.

pub mod backend;
pub mod facade;
mod fetch_cache;

pub use backend::{Backend, InProcessBackend, TcpBackend};
pub use facade::{ClientFacade, ClientState};
pub use fetch_cache::FetchCache;
