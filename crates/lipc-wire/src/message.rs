use std::collections::BTreeMap;

use crate::error::{Result, WireError};
use crate::header::{Flags, HeaderField, MessageType};
use crate::names::{
    is_valid_bus_name, is_valid_error_name, is_valid_interface_name, is_valid_member_name,
    MAX_NAME_LEN,
};
use crate::value::{FromBody, ObjectPath, Signature, Value, MAX_VARIANT_DEPTH};

/// A bus message: fixed header, header fields and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub message_type: MessageType,
    pub flags: Flags,
    /// Assigned by the connection right before the message is written.
    /// Zero means unassigned.
    pub serial: u32,
    pub headers: BTreeMap<HeaderField, Value>,
    pub body: Vec<Value>,
    /// Signature of a received body the codec could not unpack.
    pub(crate) opaque_body: Option<Signature>,
}

impl Message {
    /// An empty message of the given type, with no headers.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            flags: Flags::NONE,
            serial: 0,
            headers: BTreeMap::new(),
            body: Vec::new(),
            opaque_body: None,
        }
    }

    /// A method call addressed to `path` / `member`.
    pub fn method_call(path: ObjectPath, member: impl Into<String>) -> Self {
        let mut msg = Self::new(MessageType::MethodCall);
        msg.headers.insert(HeaderField::Path, Value::ObjectPath(path));
        msg.headers.insert(HeaderField::Member, Value::Str(member.into()));
        msg
    }

    /// A successful reply to `call_serial`.
    pub fn method_return(call_serial: u32, body: Vec<Value>) -> Self {
        let mut msg = Self::new(MessageType::MethodReturn);
        msg.headers.insert(HeaderField::ReplySerial, Value::UInt32(call_serial));
        msg.set_body(body);
        msg
    }

    /// An error reply to `call_serial`.
    pub fn error(call_serial: u32, name: impl Into<String>, text: Option<&str>) -> Self {
        let mut msg = Self::new(MessageType::Error);
        msg.headers.insert(HeaderField::ReplySerial, Value::UInt32(call_serial));
        msg.headers.insert(HeaderField::ErrorName, Value::Str(name.into()));
        msg.set_body(text.map(Value::from).into_iter().collect());
        msg
    }

    /// Replace the body and keep the Signature header in step with it.
    pub fn set_body(&mut self, body: Vec<Value>) {
        if body.is_empty() {
            self.headers.remove(&HeaderField::Signature);
        } else {
            self.headers.insert(HeaderField::Signature, Value::Signature(Signature::of(&body)));
        }
        self.body = body;
        self.opaque_body = None;
    }

    pub fn header(&self, field: HeaderField) -> Option<&Value> {
        self.headers.get(&field)
    }

    pub fn path(&self) -> Option<&str> {
        self.header_str(HeaderField::Path)
    }

    pub fn interface(&self) -> Option<&str> {
        self.header_str(HeaderField::Interface)
    }

    pub fn member(&self) -> Option<&str> {
        self.header_str(HeaderField::Member)
    }

    pub fn destination(&self) -> Option<&str> {
        self.header_str(HeaderField::Destination)
    }

    pub fn sender(&self) -> Option<&str> {
        self.header_str(HeaderField::Sender)
    }

    pub fn error_name(&self) -> Option<&str> {
        self.header_str(HeaderField::ErrorName)
    }

    pub fn signature(&self) -> Option<&str> {
        self.header_str(HeaderField::Signature)
    }

    pub fn reply_serial(&self) -> Option<u32> {
        self.headers
            .get(&HeaderField::ReplySerial)
            .and_then(Value::as_u32)
    }

    /// Whether the sender expects a reply to this message.
    pub fn expects_reply(&self) -> bool {
        self.message_type == MessageType::MethodCall
            && !self.flags.contains(Flags::NO_REPLY_EXPECTED)
    }

    /// Decode the whole body into a tuple of typed fields, in order.
    pub fn store<B: FromBody>(&self) -> Result<B> {
        if let Some(signature) = &self.opaque_body {
            return Err(WireError::UnsupportedSignature(signature.to_string()));
        }
        B::from_body(self.body.clone())
    }

    fn header_str(&self, field: HeaderField) -> Option<&str> {
        self.headers.get(&field).and_then(Value::as_str)
    }

    /// Check structural well-formedness.
    ///
    /// Covers flags, header value types, required headers per message type,
    /// name syntax, and body/signature consistency. Rejects anything the
    /// codec cannot write faithfully: strings with NUL bytes, variants nested
    /// past [`MAX_VARIANT_DEPTH`] and body signatures over 255 codes. Does
    /// not look at the serial; that is assigned later by the connection.
    pub fn validate(&self) -> Result<()> {
        let unknown = self.flags.unknown_bits();
        if unknown != 0 {
            return Err(invalid(format!("invalid flags {unknown:#04x}")));
        }

        for (field, value) in &self.headers {
            if value.type_code() != field.expected_type() {
                return Err(invalid(format!(
                    "header {field} has type '{}', expected '{}'",
                    value.type_code(),
                    field.expected_type()
                )));
            }
        }

        let required: &[HeaderField] = match self.message_type {
            MessageType::MethodCall => &[HeaderField::Path, HeaderField::Member],
            MessageType::MethodReturn => &[HeaderField::ReplySerial],
            MessageType::Error => &[HeaderField::ErrorName, HeaderField::ReplySerial],
            MessageType::Signal => &[
                HeaderField::Path,
                HeaderField::Interface,
                HeaderField::Member,
            ],
        };
        if let Some(missing) = required.iter().find(|f| !self.headers.contains_key(*f)) {
            return Err(invalid(format!(
                "missing required header {missing} for {}",
                self.message_type
            )));
        }

        if let Some(name) = self.interface() {
            if !is_valid_interface_name(name) {
                return Err(invalid(format!("invalid interface name '{name}'")));
            }
        }
        if let Some(name) = self.member() {
            if !is_valid_member_name(name) {
                return Err(invalid(format!("invalid member name '{name}'")));
            }
        }
        if let Some(name) = self.error_name() {
            if !is_valid_error_name(name) {
                return Err(invalid(format!("invalid error name '{name}'")));
            }
        }
        for field in [HeaderField::Destination, HeaderField::Sender] {
            if let Some(name) = self.header_str(field) {
                if !is_valid_bus_name(name) {
                    return Err(invalid(format!("invalid bus name '{name}' in {field}")));
                }
            }
        }
        if self.reply_serial() == Some(0) {
            return Err(invalid("reply serial must not be zero".to_string()));
        }

        for value in self.headers.values().chain(&self.body) {
            if value.variant_depth() > MAX_VARIANT_DEPTH {
                return Err(invalid(format!(
                    "variants nested deeper than {MAX_VARIANT_DEPTH}"
                )));
            }
            if let Value::Str(s) = value.innermost() {
                if s.contains('\0') {
                    return Err(invalid("string contains a NUL byte".to_string()));
                }
            }
        }

        let declared = self.signature().unwrap_or("");
        if self.opaque_body.is_none() {
            let actual = Signature::of(&self.body);
            if actual.as_str().len() > MAX_NAME_LEN {
                return Err(invalid(format!(
                    "body signature too long ({} bytes, max {MAX_NAME_LEN})",
                    actual.as_str().len()
                )));
            }
            if !self.body.is_empty() && self.signature().is_none() {
                return Err(invalid("missing signature for non-empty body".to_string()));
            }
            if declared != actual.as_str() {
                return Err(invalid(format!(
                    "body signature '{actual}' does not match header '{declared}'"
                )));
            }
        }

        Ok(())
    }
}

fn invalid(reason: String) -> WireError {
    WireError::InvalidMessage(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> Message {
        let mut msg = Message::method_call(ObjectPath::new("/default").unwrap(), "getstatusStr");
        msg.headers.insert(HeaderField::Destination, "com.lab126.powerd".into());
        msg.headers.insert(HeaderField::Interface, "com.lab126.powerd".into());
        msg
    }

    #[test]
    fn valid_method_call() {
        let msg = call();
        msg.validate().unwrap();
        assert_eq!(msg.path(), Some("/default"));
        assert_eq!(msg.member(), Some("getstatusStr"));
        assert!(msg.expects_reply());
    }

    #[test]
    fn missing_member_is_invalid() {
        let mut msg = call();
        msg.headers.remove(&HeaderField::Member);
        assert!(matches!(msg.validate(), Err(WireError::InvalidMessage(_))));
    }

    #[test]
    fn body_without_signature_is_invalid() {
        let mut msg = call();
        msg.body.push(Value::Int32(1));
        let err = msg.validate().unwrap_err();
        assert!(err.to_string().contains("missing signature"));
    }

    #[test]
    fn mismatched_signature_is_invalid() {
        let mut msg = call();
        msg.set_body(vec![Value::Int32(1)]);
        msg.headers.insert(
            HeaderField::Signature,
            Value::Signature(Signature::new("s").unwrap()),
        );
        assert!(msg.validate().is_err());
    }

    #[test]
    fn string_with_nul_is_invalid() {
        let mut msg = call();
        msg.set_body(vec!["de\0bug".into()]);
        let err = msg.validate().unwrap_err();
        assert!(err.to_string().contains("NUL"), "{err}");

        msg.set_body(vec![Value::Variant(Box::new("a\0".into()))]);
        assert!(msg.validate().is_err());
    }

    #[test]
    fn oversized_body_signature_is_invalid() {
        let mut msg = call();
        msg.set_body(vec![Value::Int32(0); MAX_NAME_LEN + 1]);
        assert!(msg.validate().is_err());

        msg.set_body(vec![Value::Int32(0); MAX_NAME_LEN]);
        msg.validate().unwrap();
    }

    #[test]
    fn header_with_wrong_type_is_invalid() {
        let mut msg = call();
        msg.headers.insert(HeaderField::Member, Value::UInt32(3));
        assert!(msg.validate().is_err());
    }

    #[test]
    fn unknown_flags_are_invalid() {
        let mut msg = call();
        msg.flags = Flags::from_bits(0x10);
        assert!(msg.validate().is_err());
    }

    #[test]
    fn error_reply_accessors() {
        let msg = Message::error(7, "org.freedesktop.DBus.Error.ServiceUnknown", Some("gone"));
        msg.validate().unwrap();
        assert_eq!(msg.reply_serial(), Some(7));
        assert_eq!(
            msg.error_name(),
            Some("org.freedesktop.DBus.Error.ServiceUnknown")
        );
        assert_eq!(msg.signature(), Some("s"));
    }

    #[test]
    fn store_decodes_return_body() {
        let msg = Message::method_return(3, vec![Value::UInt32(0), "on".into()]);
        let (status, value): (u32, String) = msg.store().unwrap();
        assert_eq!(status, 0);
        assert_eq!(value, "on");
    }
}
