//! Core value types shared by the codec, descriptor and store layers.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

/// One JSON value as it appears on the wire, without schema knowledge.
pub type WireValue = Value;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalar attribute kinds supported by the store schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Boolean,
    Integer16,
    Integer32,
    Integer64,
    Decimal,
    Double,
    Float,
    String,
    Date,
    Binary,
    Uuid,
    Uri,
}

impl ScalarKind {
    /// Human-readable kind name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Integer16 => "Int16",
            ScalarKind::Integer32 => "Int32",
            ScalarKind::Integer64 => "Int64",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::Double => "Double",
            ScalarKind::Float => "Float",
            ScalarKind::String => "String",
            ScalarKind::Date => "Date",
            ScalarKind::Binary => "Binary",
            ScalarKind::Uuid => "UUID",
            ScalarKind::Uri => "URI",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed attribute value as held by the store.
///
/// Floating point variants compare and hash by bit pattern so that every
/// value can serve as a record identifier key.
#[derive(Debug, Clone)]
pub enum NativeValue {
    Boolean(bool),
    Integer16(i16),
    Integer32(i32),
    Integer64(i64),
    Decimal(f64),
    Double(f64),
    Float(f32),
    String(String),
    Date(OffsetDateTime),
    Binary(Vec<u8>),
    Uuid(Uuid),
    Uri(Url),
}

impl NativeValue {
    /// The scalar kind this value belongs to.
    pub fn kind(&self) -> ScalarKind {
        match self {
            NativeValue::Boolean(_) => ScalarKind::Boolean,
            NativeValue::Integer16(_) => ScalarKind::Integer16,
            NativeValue::Integer32(_) => ScalarKind::Integer32,
            NativeValue::Integer64(_) => ScalarKind::Integer64,
            NativeValue::Decimal(_) => ScalarKind::Decimal,
            NativeValue::Double(_) => ScalarKind::Double,
            NativeValue::Float(_) => ScalarKind::Float,
            NativeValue::String(_) => ScalarKind::String,
            NativeValue::Date(_) => ScalarKind::Date,
            NativeValue::Binary(_) => ScalarKind::Binary,
            NativeValue::Uuid(_) => ScalarKind::Uuid,
            NativeValue::Uri(_) => ScalarKind::Uri,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        use NativeValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer16(a), Integer16(b)) => a == b,
            (Integer32(a), Integer32(b)) => a == b,
            (Integer64(a), Integer64(b)) => a == b,
            (Decimal(a), Decimal(b)) | (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Uri(a), Uri(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for NativeValue {}

impl Hash for NativeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            NativeValue::Boolean(v) => v.hash(state),
            NativeValue::Integer16(v) => v.hash(state),
            NativeValue::Integer32(v) => v.hash(state),
            NativeValue::Integer64(v) => v.hash(state),
            NativeValue::Decimal(v) | NativeValue::Double(v) => v.to_bits().hash(state),
            NativeValue::Float(v) => v.to_bits().hash(state),
            NativeValue::String(v) => v.hash(state),
            NativeValue::Date(v) => v.hash(state),
            NativeValue::Binary(v) => v.hash(state),
            NativeValue::Uuid(v) => v.hash(state),
            NativeValue::Uri(v) => v.hash(state),
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Boolean(v) => write!(f, "{}", v),
            NativeValue::Integer16(v) => write!(f, "{}", v),
            NativeValue::Integer32(v) => write!(f, "{}", v),
            NativeValue::Integer64(v) => write!(f, "{}", v),
            NativeValue::Decimal(v) | NativeValue::Double(v) => write!(f, "{}", v),
            NativeValue::Float(v) => write!(f, "{}", v),
            NativeValue::String(v) => f.write_str(v),
            NativeValue::Date(v) => match v.format(&Rfc3339) {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{}", v),
            },
            NativeValue::Binary(v) => write!(f, "<{} bytes>", v.len()),
            NativeValue::Uuid(v) => write!(f, "{}", v),
            NativeValue::Uri(v) => f.write_str(v.as_str()),
        }
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Boolean(value)
    }
}

impl From<i16> for NativeValue {
    fn from(value: i16) -> Self {
        NativeValue::Integer16(value)
    }
}

impl From<i32> for NativeValue {
    fn from(value: i32) -> Self {
        NativeValue::Integer32(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Integer64(value)
    }
}

impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        NativeValue::Double(value)
    }
}

impl From<f32> for NativeValue {
    fn from(value: f32) -> Self {
        NativeValue::Float(value)
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::String(value)
    }
}

impl From<OffsetDateTime> for NativeValue {
    fn from(value: OffsetDateTime) -> Self {
        NativeValue::Date(value)
    }
}

impl From<Vec<u8>> for NativeValue {
    fn from(value: Vec<u8>) -> Self {
        NativeValue::Binary(value)
    }
}

impl From<Uuid> for NativeValue {
    fn from(value: Uuid) -> Self {
        NativeValue::Uuid(value)
    }
}

impl From<Url> for NativeValue {
    fn from(value: Url) -> Self {
        NativeValue::Uri(value)
    }
}
