use lipc_transport::TransportError;
use lipc_wire::WireError;

/// Errors returned by LIPC property operations.
#[derive(Debug, thiserror::Error)]
pub enum LipcError {
    /// The value type has no LIPC wire mapping. Raised before any I/O.
    #[error("unsupported property type {type_name}")]
    UnsupportedType { type_name: &'static str },

    /// The constructed call message failed validation.
    #[error("invalid property message: {0}")]
    InvalidMessage(#[source] WireError),

    /// Sending the call or receiving and decoding its reply failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with a non-zero status word.
    #[error("property call failed with status {status} ({name})")]
    Protocol { status: u32, name: &'static str },

    /// The caller cancelled before a reply arrived.
    #[error("property call cancelled")]
    Cancelled,

    /// The caller's deadline passed before a reply arrived.
    #[error("property call deadline exceeded")]
    DeadlineExceeded,
}

impl LipcError {
    /// Status word of a [`LipcError::Protocol`] failure.
    pub fn status(&self) -> Option<u32> {
        match self {
            LipcError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LipcError>;
