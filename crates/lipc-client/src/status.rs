//! LIPC status codes.
//!
//! Every property reply starts with a `u32` status word. Zero is success;
//! the remaining known codes cover both library-level and property-level
//! failures. Names are for diagnostics only.

use std::fmt;

/// Name returned for codes outside the table.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Known status codes and their names.
pub const STATUS_TABLE: &[(u32, &str)] = &[
    (0x00, "lipcErrNone"),
    (0x01, "lipcErrUnknown"),
    (0x02, "lipcErrInternal"),
    (0x03, "lipcErrNoSuchSource"),
    (0x04, "lipcErrOperationNotSupported"),
    (0x05, "lipcErrOutOfMemory"),
    (0x06, "lipcErrSubscriptionFailed"),
    (0x07, "lipcErrNoSuchParam"),
    (0x08, "lipcErrNoSuchProperty"),
    (0x09, "lipcErrAccessNotAllowed"),
    (0x0a, "lipcErrBufferTooSmall"),
    (0x0b, "lipcErrInvalidHandle"),
    (0x0c, "lipcErrInvalidArg"),
    (0x0d, "lipcErrOperationNotAllowed"),
    (0x0e, "lipcErrParamsSizeExceeded"),
    (0x0f, "lipcErrTimedOut"),
    (0x10, "lipcErrServiceNameTooLong"),
    (0x11, "lipcErrDuplicateServiceName"),
    (0x12, "lipcErrInitDbus"),
    (0x100, "lipcPropErrInvalidState"),
    (0x101, "lipcPropErrNotInitialized"),
    (0x102, "lipcPropErrInternal"),
];

/// Symbolic name for a status word. Never fails; unknown codes map to
/// [`UNKNOWN_STATUS`].
pub fn name_for_status(code: u32) -> &'static str {
    STATUS_TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_STATUS)
}

/// A status word as returned by a property call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    pub fn name(self) -> &'static str {
        name_for_status(self.0)
    }
}

impl From<u32> for StatusCode {
    fn from(code: u32) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#x})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(name_for_status(0), "lipcErrNone");
        assert_eq!(name_for_status(5), "lipcErrOutOfMemory");
        assert_eq!(name_for_status(8), "lipcErrNoSuchProperty");
        assert_eq!(name_for_status(0x12), "lipcErrInitDbus");
        assert_eq!(name_for_status(0x100), "lipcPropErrInvalidState");
        assert_eq!(name_for_status(0x102), "lipcPropErrInternal");
    }

    #[test]
    fn lookup_is_total() {
        for code in [0x13, 0xff, 0x103, 0x1000, u32::MAX] {
            assert_eq!(name_for_status(code), UNKNOWN_STATUS);
        }
        for code in (0..0x200).chain([u32::MAX - 1, u32::MAX]) {
            assert!(!name_for_status(code).is_empty());
        }
    }

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut codes: Vec<u32> = STATUS_TABLE.iter().map(|(code, _)| *code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), STATUS_TABLE.len());
        assert_eq!(STATUS_TABLE.len(), 0x13 + 3);
    }

    #[test]
    fn status_display() {
        assert!(StatusCode::OK.is_success());
        assert!(!StatusCode(8).is_success());
        assert_eq!(StatusCode(8).to_string(), "lipcErrNoSuchProperty (0x8)");
    }
}
