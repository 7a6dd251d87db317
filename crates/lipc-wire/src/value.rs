use std::fmt;

use crate::error::{Result, WireError};
use crate::names::{is_valid_object_path, MAX_NAME_LEN};

/// Type codes accepted inside a signature string.
const SIGNATURE_CHARS: &str = "ybnqiuxtdsogvha(){}";

/// Basic type codes this codec can marshal as standalone values.
pub const BASIC_TYPE_CODES: &str = "ybiuxtdsogv";

/// Deepest variant nesting the bus protocol allows.
pub const MAX_VARIANT_DEPTH: usize = 64;

/// A validated object path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !is_valid_object_path(&path) {
            return Err(WireError::InvalidMessage(format!(
                "invalid object path '{path}'"
            )));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A type signature string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature(String);

impl Signature {
    pub fn new(signature: impl Into<String>) -> Result<Self> {
        let signature = signature.into();
        if signature.len() > MAX_NAME_LEN {
            return Err(WireError::InvalidMessage(format!(
                "signature too long ({} bytes)",
                signature.len()
            )));
        }
        if let Some(bad) = signature.chars().find(|c| !SIGNATURE_CHARS.contains(*c)) {
            return Err(WireError::InvalidMessage(format!(
                "invalid type code '{bad}' in signature '{signature}'"
            )));
        }
        Ok(Self(signature))
    }

    /// Signature describing a sequence of values.
    pub fn of(values: &[Value]) -> Self {
        Self(values.iter().map(Value::type_code).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every code is a standalone basic type (no containers).
    pub fn is_basic_sequence(&self) -> bool {
        self.0.chars().all(|c| BASIC_TYPE_CODES.contains(c))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single marshallable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Str(String),
    ObjectPath(ObjectPath),
    Signature(Signature),
    Variant(Box<Value>),
}

impl Value {
    pub fn type_code(&self) -> char {
        match self {
            Value::Byte(_) => 'y',
            Value::Bool(_) => 'b',
            Value::Int32(_) => 'i',
            Value::UInt32(_) => 'u',
            Value::Int64(_) => 'x',
            Value::UInt64(_) => 't',
            Value::Double(_) => 'd',
            Value::Str(_) => 's',
            Value::ObjectPath(_) => 'o',
            Value::Signature(_) => 'g',
            Value::Variant(_) => 'v',
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::ObjectPath(p) => Some(p.as_str()),
            Value::Signature(g) => Some(g.as_str()),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    /// Number of variants wrapped around the innermost value.
    pub fn variant_depth(&self) -> usize {
        let mut depth = 0;
        let mut value = self;
        while let Value::Variant(inner) = value {
            depth += 1;
            value = inner;
        }
        depth
    }

    /// The value inside any variant wrappers.
    pub fn innermost(&self) -> &Value {
        let mut value = self;
        while let Value::Variant(inner) = value {
            value = inner;
        }
        value
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "\"{v}\""),
            Value::ObjectPath(v) => write!(f, "{v}"),
            Value::Signature(v) => write!(f, "{v}"),
            Value::Variant(v) => write!(f, "<{}> {v}", v.type_code()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

/// A Rust scalar with a fixed wire type.
pub trait WireType: Sized {
    /// Single-character type code.
    const CODE: char;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_wire_type {
    ($ty:ty, $code:literal, $variant:ident) => {
        impl WireType for $ty {
            const CODE: char = $code;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(WireError::TypeMismatch {
                        expected: $code,
                        found: other.type_code(),
                    }),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

impl_wire_type!(u8, 'y', Byte);
impl_wire_type!(bool, 'b', Bool);
impl_wire_type!(i32, 'i', Int32);
impl_wire_type!(u32, 'u', UInt32);
impl_wire_type!(i64, 'x', Int64);
impl_wire_type!(u64, 't', UInt64);
impl_wire_type!(f64, 'd', Double);
impl_wire_type!(String, 's', Str);
impl_wire_type!(ObjectPath, 'o', ObjectPath);
impl_wire_type!(Signature, 'g', Signature);

/// Decodes a complete message body into a tuple.
pub trait FromBody: Sized {
    fn from_body(body: Vec<Value>) -> Result<Self>;
}

macro_rules! impl_from_body {
    ($len:literal; $($t:ident),+) => {
        impl<$($t: WireType),+> FromBody for ($($t,)+) {
            fn from_body(body: Vec<Value>) -> Result<Self> {
                let found = body.len();
                if found != $len {
                    return Err(WireError::BodyLength { expected: $len, found });
                }
                let mut fields = body.into_iter();
                Ok(($(
                    $t::from_value(
                        fields.next().ok_or(WireError::BodyLength { expected: $len, found })?,
                    )?,
                )+))
            }
        }
    };
}

impl_from_body!(1; A);
impl_from_body!(2; A, B);
impl_from_body!(3; A, B, C);
