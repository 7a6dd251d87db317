//! Fixed-header enumerations: message type, flags and header field codes.

use std::fmt;

use crate::error::{Result, WireError};

/// Protocol version carried in every fixed header.
pub const PROTOCOL_VERSION: u8 = 1;

/// Kind of bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    MethodCall = 1,
    MethodReturn = 2,
    Error = 3,
    Signal = 4,
}

impl MessageType {
    pub fn from_u8(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(Self::MethodCall),
            2 => Ok(Self::MethodReturn),
            3 => Ok(Self::Error),
            4 => Ok(Self::Signal),
            other => Err(WireError::InvalidMessage(format!(
                "invalid message type {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MethodCall => "method_call",
            Self::MethodReturn => "method_return",
            Self::Error => "error",
            Self::Signal => "signal",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Flags(u8);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// The caller does not want a reply.
    pub const NO_REPLY_EXPECTED: Flags = Flags(0x1);
    /// The bus must not launch the destination to deliver this message.
    pub const NO_AUTO_START: Flags = Flags(0x2);
    pub const ALLOW_INTERACTIVE_AUTHORIZATION: Flags = Flags(0x4);

    const KNOWN: u8 = 0x1 | 0x2 | 0x4;

    pub const fn from_bits(bits: u8) -> Self {
        Flags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bits outside the three defined flags.
    pub const fn unknown_bits(self) -> u8 {
        self.0 & !Self::KNOWN
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// Header field codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum HeaderField {
    Path = 1,
    Interface = 2,
    Member = 3,
    ErrorName = 4,
    ReplySerial = 5,
    Destination = 6,
    Sender = 7,
    Signature = 8,
    UnixFds = 9,
}

impl HeaderField {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Path),
            2 => Some(Self::Interface),
            3 => Some(Self::Member),
            4 => Some(Self::ErrorName),
            5 => Some(Self::ReplySerial),
            6 => Some(Self::Destination),
            7 => Some(Self::Sender),
            8 => Some(Self::Signature),
            9 => Some(Self::UnixFds),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The wire type code a value for this field must have.
    pub fn expected_type(self) -> char {
        match self {
            Self::Path => 'o',
            Self::Interface | Self::Member | Self::ErrorName => 's',
            Self::Destination | Self::Sender => 's',
            Self::ReplySerial | Self::UnixFds => 'u',
            Self::Signature => 'g',
        }
    }

    /// Human-readable field name, for logs and dumps.
    pub fn name(self) -> &'static str {
        match self {
            Self::Path => "Path",
            Self::Interface => "Interface",
            Self::Member => "Member",
            Self::ErrorName => "ErrorName",
            Self::ReplySerial => "ReplySerial",
            Self::Destination => "Destination",
            Self::Sender => "Sender",
            Self::Signature => "Signature",
            Self::UnixFds => "UnixFDs",
        }
    }
}

/// Name for a raw header field code; codes outside 1..=9 are `"Unknown"`.
pub fn header_field_name(code: u8) -> &'static str {
    HeaderField::from_code(code)
        .map(HeaderField::name)
        .unwrap_or("Unknown")
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_field_codes_roundtrip_through_from_code() {
        for code in 1..=9u8 {
            let field = HeaderField::from_code(code).unwrap();
            assert_eq!(field.code(), code);
        }
        assert!(HeaderField::from_code(0).is_none());
        assert!(HeaderField::from_code(10).is_none());
    }

    #[test]
    fn header_field_names() {
        assert_eq!(header_field_name(1), "Path");
        assert_eq!(header_field_name(8), "Signature");
        assert_eq!(header_field_name(9), "UnixFDs");
        assert_eq!(header_field_name(0), "Unknown");
        assert_eq!(header_field_name(200), "Unknown");
    }

    #[test]
    fn flags_unknown_bits() {
        let flags = Flags::NO_AUTO_START | Flags::NO_REPLY_EXPECTED;
        assert!(flags.contains(Flags::NO_AUTO_START));
        assert_eq!(flags.unknown_bits(), 0);
        assert_eq!(Flags::from_bits(0x80).unknown_bits(), 0x80);
    }

    #[test]
    fn message_type_rejects_zero() {
        assert!(MessageType::from_u8(0).is_err());
        assert_eq!(MessageType::from_u8(3).unwrap(), MessageType::Error);
    }
}
