//! Date codecs.

use std::borrow::Cow;

use serde_json::{Number, Value};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use super::Codec;
use crate::error::CodecError;
use crate::types::{json_type_name, NativeValue, WireValue};

/// ISO 8601 / RFC 3339 timestamps with second precision.
///
/// A fractional-seconds suffix is dropped before parsing. Serialized dates are
/// always UTC with a `Z` designator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso8601DateCodec;

/// Seconds since the Unix epoch as a JSON number.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixTimestampCodec;

impl Codec for Iso8601DateCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        let NativeValue::Date(date) = value else {
            return Err(CodecError::unexpected("Date", value.kind().name()));
        };
        let whole = date
            .to_offset(UtcOffset::UTC)
            .replace_nanosecond(0)
            .map_err(|e| CodecError::failed(e.to_string()))?;
        whole
            .format(&Rfc3339)
            .map(Value::String)
            .map_err(|e| CodecError::failed(format!("could not format date: {}", e)))
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let text = match value {
            Value::Null => return Ok(None),
            Value::String(s) => s,
            other => return Err(CodecError::unexpected("string", json_type_name(other))),
        };
        OffsetDateTime::parse(&strip_fraction(text), &Rfc3339)
            .map(|date| Some(NativeValue::Date(date)))
            .map_err(|e| CodecError::failed(format!("'{}' is not a valid date: {}", text, e)))
    }
}

impl Codec for UnixTimestampCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        let NativeValue::Date(date) = value else {
            return Err(CodecError::unexpected("Date", value.kind().name()));
        };
        let seconds = date.unix_timestamp_nanos() as f64 / 1e9;
        Number::from_f64(seconds)
            .map(Value::Number)
            .ok_or_else(|| CodecError::failed(format!("{} has no JSON representation", seconds)))
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let seconds = match value {
            Value::Null => return Ok(None),
            Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            other => return Err(CodecError::unexpected("number", json_type_name(other))),
        };
        if !seconds.is_finite() {
            return Err(CodecError::failed(format!("{} is not a timestamp", seconds)));
        }
        let nanos = (seconds * 1e9).round() as i128;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map(|date| Some(NativeValue::Date(date)))
            .map_err(|e| CodecError::failed(format!("timestamp {} out of range: {}", seconds, e)))
    }
}

// --- Internal implementation ---

/// Remove `.123` style fractional seconds from the time part.
fn strip_fraction(text: &str) -> Cow<'_, str> {
    let Some(t) = text.find(|c: char| c == 'T' || c == 't') else {
        return Cow::Borrowed(text);
    };
    let Some(dot) = text[t..].find('.').map(|i| t + i) else {
        return Cow::Borrowed(text);
    };
    let digits = text[dot + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 {
        return Cow::Borrowed(text);
    }

    let mut stripped = String::with_capacity(text.len());
    stripped.push_str(&text[..dot]);
    stripped.push_str(&text[dot + 1 + digits..]);
    Cow::Owned(stripped)
}
