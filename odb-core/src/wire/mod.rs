//! The wire protocol: length-framed envelopes (`framing`), little-endian
//! primitives (`codec`), and the per-request-type schemas built on top of
//! them (`request`).

pub mod codec;
pub mod framing;
pub mod request;

pub use request::{Request, Response, Sizes};
