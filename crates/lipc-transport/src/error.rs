use lipc_wire::{Message, WireError};

/// Errors raised while sending a call or receiving its reply.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded, or the stream carried a malformed one.
    #[error("wire error: {0}")]
    Wire(WireError),

    /// The reply body did not have the expected shape.
    #[error("failed to decode reply body: {0}")]
    Decode(WireError),

    /// The peer answered the call with an error message.
    #[error("remote error {name}: {message}")]
    Remote { name: String, message: String },

    /// The connection is closed; no reply will arrive.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Build a [`TransportError::Remote`] from an error reply.
    ///
    /// The description is the first body field when it is a string.
    pub fn from_error_reply(reply: &Message) -> Self {
        let name = reply
            .error_name()
            .unwrap_or("org.freedesktop.DBus.Error.Failed")
            .to_string();
        let message = reply
            .body
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        TransportError::Remote { name, message }
    }
}

impl From<WireError> for TransportError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Io(io) => TransportError::Io(io),
            other => TransportError::Wire(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
