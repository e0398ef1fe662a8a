//! Scalar codecs: conversion between wire values and native values.
//!
//! Every supported [`ScalarKind`] has a default codec chosen by
//! [`CodecTable::for_kind`]. Attributes may name a different codec, looked up
//! in the table's named entries.
//!
//! Codecs map wire `null` to `Ok(None)`. Whether `None` is acceptable is
//! decided by the attribute descriptor that owns the codec.

mod date;
mod numeric;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::CodecError;
use crate::types::{NativeValue, ScalarKind, WireValue};

pub use date::{Iso8601DateCodec, UnixTimestampCodec};
pub use numeric::{
    BooleanCodec, DecimalCodec, DoubleCodec, FloatCodec, Int16Codec, Int32Codec, Int64Codec,
};
pub use text::{Base64Codec, StringCodec, UriCodec, UuidCodec};

/// Bidirectional converter between a wire value and one native scalar type.
pub trait Codec: fmt::Debug + Send + Sync {
    /// Convert a native value into its wire form.
    ///
    /// # Errors
    ///
    /// `CodecError::UnexpectedObject` if the value has the wrong kind,
    /// `CodecError::Failed` if it has no wire representation.
    fn serialize(&self, value: &NativeValue) -> Result<WireValue, CodecError>;

    /// Convert a wire value into a native value. `null` yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// `CodecError::UnexpectedObject` for the wrong wire variant,
    /// `CodecError::Failed` for unparsable or out-of-range values.
    fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, CodecError>;
}

/// Codecs available to a schema registry.
///
/// Holds the default date and binary codecs plus every codec that can be
/// selected by name from an attribute's codec override.
#[derive(Debug, Clone)]
pub struct CodecTable {
    named: HashMap<String, Arc<dyn Codec>>,
    date: Arc<dyn Codec>,
    binary: Arc<dyn Codec>,
}

impl Default for CodecTable {
    fn default() -> Self {
        let mut named: HashMap<String, Arc<dyn Codec>> = HashMap::new();
        named.insert("iso8601".to_string(), Arc::new(Iso8601DateCodec));
        named.insert("unix-timestamp".to_string(), Arc::new(UnixTimestampCodec));
        named.insert("base64".to_string(), Arc::new(Base64Codec));

        Self {
            named,
            date: Arc::new(Iso8601DateCodec),
            binary: Arc::new(Base64Codec),
        }
    }
}

impl CodecTable {
    /// Register a codec under `name` for use in attribute overrides.
    pub fn with_codec(mut self, name: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        self.named.insert(name.into(), codec);
        self
    }

    /// Replace the codec used for every `date` attribute without an override.
    pub fn with_date_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.date = codec;
        self
    }

    /// Replace the codec used for every `binary` attribute without an override.
    pub fn with_binary_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.binary = codec;
        self
    }

    /// Codec registered under `name`.
    pub fn named(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.named.get(name).cloned()
    }

    /// Default codec for a scalar kind.
    pub fn for_kind(&self, kind: ScalarKind) -> Arc<dyn Codec> {
        match kind {
            ScalarKind::Boolean => Arc::new(BooleanCodec),
            ScalarKind::Integer16 => Arc::new(Int16Codec),
            ScalarKind::Integer32 => Arc::new(Int32Codec),
            ScalarKind::Integer64 => Arc::new(Int64Codec),
            ScalarKind::Decimal => Arc::new(DecimalCodec),
            ScalarKind::Double => Arc::new(DoubleCodec),
            ScalarKind::Float => Arc::new(FloatCodec),
            ScalarKind::String => Arc::new(StringCodec),
            ScalarKind::Date => Arc::clone(&self.date),
            ScalarKind::Binary => Arc::clone(&self.binary),
            ScalarKind::Uuid => Arc::new(UuidCodec),
            ScalarKind::Uri => Arc::new(UriCodec),
        }
    }
}
