use std::fmt;

use lipc_client::LipcError;
use lipc_transport::TransportError;
use lipc_wire::WireError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(DATA_INVALID, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn wire_error(context: &str, err: WireError) -> CliError {
    match err {
        WireError::InvalidMessage(_)
        | WireError::MessageTooLarge { .. }
        | WireError::UnsupportedSignature(_) => {
            CliError::data(format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn lipc_error(context: &str, err: LipcError) -> CliError {
    match err {
        LipcError::UnsupportedType { .. } => CliError::usage(format!("{context}: {err}")),
        LipcError::InvalidMessage(err) => wire_error(context, err),
        LipcError::Transport(TransportError::Decode(_)) => {
            CliError::data(format!("{context}: {err}"))
        }
        LipcError::Protocol { .. }
        | LipcError::Transport(_)
        | LipcError::Cancelled
        | LipcError::DeadlineExceeded => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
