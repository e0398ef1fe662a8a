//! String-backed codecs: plain strings, UUIDs, URIs and base64 blobs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::Codec;
use crate::error::CodecError;
use crate::types::{json_type_name, NativeValue, WireValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

/// Hyphenated UUID text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

/// Absolute URI text. Relative references are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriCodec;

/// Standard base64 with padding. Whitespace inside the text is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl Codec for StringCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::String(s) => Ok(Value::String(s.clone())),
            other => Err(CodecError::unexpected("String", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        Ok(string(value)?.map(|s| NativeValue::String(s.to_string())))
    }
}

impl Codec for UuidCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Uuid(u) => Ok(Value::String(u.hyphenated().to_string())),
            other => Err(CodecError::unexpected("UUID", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let Some(s) = string(value)? else {
            return Ok(None);
        };
        Uuid::parse_str(s)
            .map(|u| Some(NativeValue::Uuid(u)))
            .map_err(|e| CodecError::failed(format!("'{}' is not a valid UUID: {}", s, e)))
    }
}

impl Codec for UriCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Uri(u) => Ok(Value::String(u.as_str().to_string())),
            other => Err(CodecError::unexpected("URI", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let Some(s) = string(value)? else {
            return Ok(None);
        };
        // Url::parse only succeeds for absolute URIs.
        Url::parse(s)
            .map(|u| Some(NativeValue::Uri(u)))
            .map_err(|e| CodecError::failed(format!("'{}' is not a valid URI: {}", s, e)))
    }
}

impl Codec for Base64Codec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Binary(bytes) => Ok(Value::String(STANDARD.encode(bytes))),
            other => Err(CodecError::unexpected("Binary", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let Some(s) = string(value)? else {
            return Ok(None);
        };
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map(|bytes| Some(NativeValue::Binary(bytes)))
            .map_err(|e| CodecError::failed(format!("invalid base64 data: {}", e)))
    }
}

// --- Internal implementation ---

fn string(value: &WireValue) -> Result<Option<&str>, CodecError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(CodecError::unexpected("string", json_type_name(other))),
    }
}
