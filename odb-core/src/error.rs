use thiserror::Error;

/// Everything that can go wrong inside the debugger core, the wire codec or
/// the transport that carries it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The VM adapter rejected an operation (bad register id, address out of
    /// range, unknown symbol name, ...).
    #[error("vm adapter error: {0}")]
    VmAdapter(String),

    /// A client API was called in the wrong debugger/façade state, or with
    /// arguments that are individually valid but mutually inconsistent.
    #[error("precondition violation: {0}")]
    Precondition(String),

    /// Short read/write, closed socket, or any other channel failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The peer reported a failure; carries only the message it sent, never
    /// the remote's own error kind.
    #[error("remote error: {0}")]
    Remote(String),

    /// A wire payload could not be decoded into the shape its schema expects.
    #[error("codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn vm_adapter(msg: impl Into<String>) -> Self {
        Error::VmAdapter(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// The message carried across the wire in a tag-100 response, regardless
    /// of which variant produced it.
    pub fn wire_message(&self) -> String {
        match self {
            Error::Remote(m) => m.clone(),
            other => other.to_string(),
        }
    }
}
