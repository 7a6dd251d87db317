use lipc_wire::{Flags, HeaderField, Message, ObjectPath, Value, WireError};
use tracing::error;

use crate::error::{LipcError, Result};
use crate::property::{method_name, PropertyRequestKind, PropertyTypeTag};

/// Object path every LIPC endpoint answers on.
pub const LIPC_OBJECT_PATH: &str = "/default";

/// Build the method call for one property operation.
///
/// The member is `{get|set}{property}{Int|Str}`. `service` is used as both
/// destination and interface, since that is how LIPC services register
/// their methods. Calls never auto-start the destination. A `Get` carries no
/// body; a `Set` carries exactly `value`, whose wire type must match `tag`.
pub fn build_property_message(
    kind: PropertyRequestKind,
    service: &str,
    property: &str,
    tag: PropertyTypeTag,
    value: Option<Value>,
) -> Result<Message> {
    if service.is_empty() {
        return Err(invalid("service name must not be empty"));
    }
    if property.is_empty() {
        return Err(invalid("property name must not be empty"));
    }

    let path = ObjectPath::new(LIPC_OBJECT_PATH).map_err(LipcError::InvalidMessage)?;
    let mut msg = Message::method_call(path, method_name(kind, property, tag));
    msg.flags = Flags::NO_AUTO_START;
    msg.headers.insert(HeaderField::Destination, Value::from(service));
    msg.headers.insert(HeaderField::Interface, Value::from(service));

    match (kind, value) {
        (PropertyRequestKind::Get, None) => {}
        (PropertyRequestKind::Get, Some(_)) => {
            return Err(invalid("get request must not carry a value"));
        }
        (PropertyRequestKind::Set, None) => {
            return Err(invalid("set request requires a value"));
        }
        (PropertyRequestKind::Set, Some(value)) => {
            if value.type_code() != tag.wire_code() {
                return Err(invalid(&format!(
                    "value of type '{}' does not match {tag} property",
                    value.type_code()
                )));
            }
            msg.set_body(vec![value]);
        }
    }

    if let Err(err) = msg.validate() {
        error!(error = %err, service, property, "property message is not valid");
        return Err(LipcError::InvalidMessage(err));
    }
    Ok(msg)
}

fn invalid(reason: &str) -> LipcError {
    LipcError::InvalidMessage(WireError::InvalidMessage(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use lipc_wire::MessageType;

    use super::*;

    #[test]
    fn get_message_headers() {
        let msg = build_property_message(
            PropertyRequestKind::Get,
            "com.lab126.powerd",
            "flIntensity",
            PropertyTypeTag::Integer,
            None,
        )
        .unwrap();

        assert_eq!(msg.message_type, MessageType::MethodCall);
        assert_eq!(msg.path(), Some("/default"));
        assert_eq!(msg.destination(), Some("com.lab126.powerd"));
        assert_eq!(msg.interface(), Some("com.lab126.powerd"));
        assert_eq!(msg.member(), Some("getflIntensityInt"));
        assert!(msg.flags.contains(Flags::NO_AUTO_START));
        assert!(msg.body.is_empty());
        assert!(msg.header(HeaderField::Signature).is_none());
    }

    #[test]
    fn set_message_carries_single_value() {
        let msg = build_property_message(
            PropertyRequestKind::Set,
            "com.lab126.powerd",
            "flIntensity",
            PropertyTypeTag::Integer,
            Some(Value::Int32(13)),
        )
        .unwrap();

        assert_eq!(msg.member(), Some("setflIntensityInt"));
        assert_eq!(msg.body, vec![Value::Int32(13)]);
        assert_eq!(msg.signature(), Some("i"));
    }

    #[test]
    fn set_string_message() {
        let msg = build_property_message(
            PropertyRequestKind::Set,
            "com.lab126.cvm",
            "logLevel",
            PropertyTypeTag::String,
            Some("debug".into()),
        )
        .unwrap();

        assert_eq!(msg.member(), Some("setlogLevelStr"));
        assert_eq!(msg.signature(), Some("s"));
    }

    #[test]
    fn get_with_value_is_rejected() {
        let result = build_property_message(
            PropertyRequestKind::Get,
            "com.lab126.powerd",
            "flIntensity",
            PropertyTypeTag::Integer,
            Some(Value::Int32(1)),
        );
        assert!(matches!(result, Err(LipcError::InvalidMessage(_))));
    }

    #[test]
    fn set_without_value_is_rejected() {
        let result = build_property_message(
            PropertyRequestKind::Set,
            "com.lab126.powerd",
            "flIntensity",
            PropertyTypeTag::Integer,
            None,
        );
        assert!(matches!(result, Err(LipcError::InvalidMessage(_))));
    }

    #[test]
    fn set_value_must_match_tag() {
        let result = build_property_message(
            PropertyRequestKind::Set,
            "com.lab126.powerd",
            "flIntensity",
            PropertyTypeTag::Integer,
            Some("13".into()),
        );
        assert!(matches!(result, Err(LipcError::InvalidMessage(_))));
    }

    #[test]
    fn set_string_with_nul_is_rejected() {
        let result = build_property_message(
            PropertyRequestKind::Set,
            "com.lab126.cvm",
            "logLevel",
            PropertyTypeTag::String,
            Some("de\0bug".into()),
        );
        assert!(matches!(
            result,
            Err(LipcError::InvalidMessage(WireError::InvalidMessage(_)))
        ));
    }

    #[test]
    fn malformed_names_are_rejected() {
        for (service, property) in [
            ("", "flIntensity"),
            ("com.lab126.powerd", ""),
            ("powerd", "flIntensity"),
            ("com.lab126.powerd", "fl.Intensity"),
            ("com.lab126.powerd", "fl-intensity"),
        ] {
            let result = build_property_message(
                PropertyRequestKind::Get,
                service,
                property,
                PropertyTypeTag::String,
                None,
            );
            assert!(
                matches!(result, Err(LipcError::InvalidMessage(_))),
                "{service}/{property} should be rejected"
            );
        }
    }
}
