/// Errors that can occur while building, validating, encoding or decoding
/// bus messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The message failed structural validation.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The stream announced a protocol version other than 1.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// The first header byte is neither `l` nor `B`.
    #[error("invalid endianness marker {0:#04x}")]
    InvalidEndianness(u8),

    /// The message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// A body or header used a type code this codec does not handle.
    #[error("unsupported signature '{0}'")]
    UnsupportedSignature(String),

    /// Wire data ended before a value was complete.
    #[error("truncated data while reading {0}")]
    Truncated(&'static str),

    /// A decoded value did not have the expected wire type.
    #[error("type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: char, found: char },

    /// A body had a different number of fields than requested.
    #[error("body has {found} fields, expected {expected}")]
    BodyLength { expected: usize, found: usize },

    /// A string on the wire was not valid UTF-8 or was not NUL-terminated.
    #[error("malformed string: {0}")]
    MalformedString(&'static str),

    /// An I/O error surfaced through the framed codec.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
