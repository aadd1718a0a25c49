//! Implementation of the odb out-of-band VM debugger.
//!
//! Do not depend on this crate directly: it is the engine behind the `odb`
//! facade crate. Use `odb` to embed a debugger into a host VM, or the
//! `odb-cli` binary to talk to one remotely.

pub mod cli;
pub mod client;
pub mod config;
pub mod debugger;
pub mod error;
pub mod range_map;
pub mod server;
pub mod types;
pub mod vm_api;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};
pub use vm_api::VmAdapter;
