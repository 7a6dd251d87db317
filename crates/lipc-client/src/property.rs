use std::fmt;

use lipc_wire::WireType;

use crate::error::{LipcError, Result};

/// Wire type of a property. Picks the method-name suffix and body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyTypeTag {
    /// 32-bit signed integer, wire type `i`.
    Integer,
    /// UTF-8 string, wire type `s`.
    String,
}

impl PropertyTypeTag {
    /// Method-name suffix: `Int` or `Str`.
    pub fn suffix(self) -> &'static str {
        match self {
            PropertyTypeTag::Integer => "Int",
            PropertyTypeTag::String => "Str",
        }
    }

    /// Wire type code of values carried under this tag.
    pub fn wire_code(self) -> char {
        match self {
            PropertyTypeTag::Integer => 'i',
            PropertyTypeTag::String => 's',
        }
    }

    /// Tag for the Rust value type `T`.
    ///
    /// Only `i32` and `String` have a tag; every other type fails with
    /// [`LipcError::UnsupportedType`].
    pub fn resolve<T: WireType>() -> Result<Self> {
        match T::CODE {
            'i' => Ok(PropertyTypeTag::Integer),
            's' => Ok(PropertyTypeTag::String),
            _ => Err(LipcError::UnsupportedType {
                type_name: std::any::type_name::<T>(),
            }),
        }
    }
}

impl fmt::Display for PropertyTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Whether a request reads or writes the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyRequestKind {
    Get,
    Set,
}

impl PropertyRequestKind {
    /// Method-name prefix: `get` or `set`.
    pub fn verb(self) -> &'static str {
        match self {
            PropertyRequestKind::Get => "get",
            PropertyRequestKind::Set => "set",
        }
    }
}

impl fmt::Display for PropertyRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// `{verb}{property}{suffix}`, e.g. `setflIntensityInt`.
pub fn method_name(kind: PropertyRequestKind, property: &str, tag: PropertyTypeTag) -> String {
    format!("{}{}{}", kind.verb(), property, tag.suffix())
}

#[cfg(test)]
mod tests {
    use lipc_wire::ObjectPath;

    use super::*;

    #[test]
    fn method_names_are_plain_concatenation() {
        use PropertyRequestKind::{Get, Set};
        use PropertyTypeTag::{Integer, String as Str};

        let cases = [
            (Get, "flIntensity", Integer, "getflIntensityInt"),
            (Set, "flIntensity", Integer, "setflIntensityInt"),
            (Get, "status", Str, "getstatusStr"),
            (Set, "status", Str, "setstatusStr"),
            (Get, "logLevel", Str, "getlogLevelStr"),
            (Set, "x", Integer, "setxInt"),
        ];
        for (kind, property, tag, expected) in cases {
            let name = method_name(kind, property, tag);
            assert_eq!(name, expected);
            assert_eq!(
                name.len(),
                kind.verb().len() + property.len() + tag.suffix().len()
            );
        }
    }

    #[test]
    fn resolves_supported_types() {
        assert_eq!(
            PropertyTypeTag::resolve::<i32>().unwrap(),
            PropertyTypeTag::Integer
        );
        assert_eq!(
            PropertyTypeTag::resolve::<String>().unwrap(),
            PropertyTypeTag::String
        );
    }

    #[test]
    fn rejects_other_wire_types() {
        for result in [
            PropertyTypeTag::resolve::<f64>(),
            PropertyTypeTag::resolve::<u32>(),
            PropertyTypeTag::resolve::<i64>(),
            PropertyTypeTag::resolve::<bool>(),
            PropertyTypeTag::resolve::<ObjectPath>(),
        ] {
            assert!(matches!(result, Err(LipcError::UnsupportedType { .. })));
        }

        match PropertyTypeTag::resolve::<f64>() {
            Err(LipcError::UnsupportedType { type_name }) => assert_eq!(type_name, "f64"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
