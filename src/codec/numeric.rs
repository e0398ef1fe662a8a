//! Boolean, integer and floating point codecs.

use serde_json::{Number, Value};

use super::Codec;
use crate::error::CodecError;
use crate::types::{json_type_name, NativeValue, ScalarKind, WireValue};

/// `true` / `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCodec;

/// 16-bit signed integer, range checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int16Codec;

/// 32-bit signed integer, range checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int32Codec;

/// 64-bit signed integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int64Codec;

#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

impl Codec for BooleanCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Boolean(b) => Ok(Value::Bool(*b)),
            other => Err(CodecError::unexpected("Boolean", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(NativeValue::Boolean(*b))),
            other => Err(CodecError::unexpected("boolean", json_type_name(other))),
        }
    }
}

impl Codec for Int16Codec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Integer16(v) => Ok(Value::from(*v)),
            other => Err(CodecError::unexpected("Int16", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let Some(number) = number(value)? else {
            return Ok(None);
        };
        let v = integral(number, ScalarKind::Integer16)?;
        i16::try_from(v)
            .map(|v| Some(NativeValue::Integer16(v)))
            .map_err(|_| overflow(v, ScalarKind::Integer16))
    }
}

impl Codec for Int32Codec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Integer32(v) => Ok(Value::from(*v)),
            other => Err(CodecError::unexpected("Int32", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let Some(number) = number(value)? else {
            return Ok(None);
        };
        let v = integral(number, ScalarKind::Integer32)?;
        i32::try_from(v)
            .map(|v| Some(NativeValue::Integer32(v)))
            .map_err(|_| overflow(v, ScalarKind::Integer32))
    }
}

impl Codec for Int64Codec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Integer64(v) => Ok(Value::from(*v)),
            other => Err(CodecError::unexpected("Int64", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        let Some(number) = number(value)? else {
            return Ok(None);
        };
        integral(number, ScalarKind::Integer64).map(|v| Some(NativeValue::Integer64(v)))
    }
}

impl Codec for DecimalCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Decimal(v) => float_value(*v),
            other => Err(CodecError::unexpected("Decimal", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        Ok(number(value)?.map(|n| NativeValue::Decimal(as_f64(n))))
    }
}

impl Codec for DoubleCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Double(v) => float_value(*v),
            other => Err(CodecError::unexpected("Double", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        Ok(number(value)?.map(|n| NativeValue::Double(as_f64(n))))
    }
}

impl Codec for FloatCodec {
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError> {
        match value {
            NativeValue::Float(v) => float_value(shortest_f64(*v)),
            other => Err(CodecError::unexpected("Float", other.kind().name())),
        }
    }

    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError> {
        Ok(number(value)?.map(|n| NativeValue::Float(as_f64(n) as f32)))
    }
}

// --- Internal implementation ---

fn number(value: &WireValue) -> Result<Option<&Number>, CodecError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(n)),
        other => Err(CodecError::unexpected("number", json_type_name(other))),
    }
}

fn as_f64(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}

/// Integral value of `number`, rejecting any fractional component.
fn integral(number: &Number, kind: ScalarKind) -> Result<i64, CodecError> {
    if let Some(v) = number.as_i64() {
        return Ok(v);
    }
    if let Some(v) = number.as_u64() {
        return Err(CodecError::failed(format!(
            "value '{}' overflows the capacity of an {}",
            v, kind
        )));
    }

    let v = as_f64(number);
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(CodecError::failed(format!(
            "could not deserialize {} into an {}",
            v, kind
        )));
    }
    // 2^63 is exactly representable; anything at or above it does not fit.
    if v < -9_223_372_036_854_775_808.0 || v >= 9_223_372_036_854_775_808.0 {
        return Err(CodecError::failed(format!(
            "value '{}' overflows the capacity of an {}",
            v, kind
        )));
    }
    Ok(v as i64)
}

fn overflow(v: i64, kind: ScalarKind) -> CodecError {
    CodecError::failed(format!("value '{}' overflows the capacity of an {}", v, kind))
}

/// Widen an `f32` through its shortest decimal text, so `3.456` stays `3.456`.
fn shortest_f64(v: f32) -> f64 {
    v.to_string().parse().unwrap_or_else(|_| f64::from(v))
}

fn float_value(v: f64) -> Result<WireValue, CodecError> {
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| CodecError::failed(format!("{} has no JSON representation", v)))
}
