//! Schema binding for one scalar field.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::codec::Codec;
use crate::error::{CodecError, SyncError};
use crate::types::{NativeValue, ScalarKind, WireValue};

/// One attribute of an entity, bound to its codec and remote name.
///
/// The owning entity is referenced by name only.
#[derive(Clone)]
pub struct AttributeDescriptor {
    entity: String,
    name: String,
    remote_name: String,
    kind: ScalarKind,
    optional: bool,
    codec: Arc<dyn Codec>,
}

impl fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("path", &self.path())
            .field("remote_name", &self.remote_name)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .finish()
    }
}

impl AttributeDescriptor {
    pub(crate) fn new(
        entity: impl Into<String>,
        name: impl Into<String>,
        remote_name: impl Into<String>,
        kind: ScalarKind,
        optional: bool,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
            remote_name: remote_name.into(),
            kind,
            optional,
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Local name of the owning entity.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Dotted `Entity.field` path used in errors.
    pub fn path(&self) -> String {
        format!("{}.{}", self.entity, self.name)
    }

    /// Convert a wire value for this field.
    ///
    /// # Errors
    ///
    /// `SyncError::NullInNonOptional` for `null` on a required field,
    /// `SyncError::Codec` (carrying the field path) when the codec rejects
    /// the value.
    pub fn deserialize(&self, value: &WireValue) -> Result<Option<NativeValue>, SyncError> {
        if value.is_null() {
            return self.null_value();
        }
        match self.codec.deserialize(value) {
            Ok(Some(native)) => Ok(Some(native)),
            Ok(None) => self.null_value(),
            Err(source) => Err(SyncError::Codec {
                path: self.path(),
                source,
            }),
        }
    }

    /// Convert a native value for this field; absent values become `null`.
    ///
    /// # Errors
    ///
    /// `SyncError::Codec` when the codec cannot represent the value.
    pub fn serialize(&self, value: Option<&NativeValue>) -> Result<WireValue, SyncError> {
        let Some(value) = value else {
            return Ok(Value::Null);
        };
        self.codec.serialize(value).map_err(|source| SyncError::Codec {
            path: self.path(),
            source,
        })
    }

    /// Convert a wire resource identifier using this attribute's codec.
    ///
    /// Resource identifiers are always strings on the wire. For integer kinds
    /// the decimal text is parsed before the codec sees it.
    ///
    /// # Errors
    ///
    /// `SyncError::Codec` for identifiers the codec rejects.
    pub fn deserialize_identifier(&self, id: &str) -> Result<NativeValue, SyncError> {
        let wire = match self.kind {
            ScalarKind::Integer16 | ScalarKind::Integer32 | ScalarKind::Integer64 => {
                let number = id.parse::<i64>().map_err(|_| SyncError::Codec {
                    path: self.path(),
                    source: CodecError::failed(format!("'{}' is not an integer identifier", id)),
                })?;
                Value::from(number)
            }
            _ => Value::String(id.to_string()),
        };
        match self.codec.deserialize(&wire) {
            Ok(Some(native)) => Ok(native),
            Ok(None) => Err(SyncError::NullIdentifier {
                entity: self.entity.clone(),
            }),
            Err(source) => Err(SyncError::Codec {
                path: self.path(),
                source,
            }),
        }
    }

    /// Render an identifier as wire text.
    ///
    /// # Errors
    ///
    /// `SyncError::Codec` when the codec output is neither a string nor a number.
    pub fn serialize_identifier(&self, id: &NativeValue) -> Result<String, SyncError> {
        match self.serialize(Some(id))? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(SyncError::Codec {
                path: self.path(),
                source: CodecError::unexpected("string", crate::types::json_type_name(&other)),
            }),
        }
    }

    fn null_value(&self) -> Result<Option<NativeValue>, SyncError> {
        if self.optional {
            Ok(None)
        } else {
            Err(SyncError::NullInNonOptional {
                path: self.path(),
                kind: self.kind.name().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Int16Codec, Int64Codec, StringCodec, UuidCodec};
    use crate::error::ErrorKind;
    use serde_json::json;

    fn attribute(kind: ScalarKind, optional: bool, codec: Arc<dyn Codec>) -> AttributeDescriptor {
        AttributeDescriptor::new("Pet", "age", "age", kind, optional, codec)
    }

    #[test]
    fn null_on_optional_is_absent() {
        let attr = attribute(ScalarKind::Integer16, true, Arc::new(Int16Codec));
        assert_eq!(attr.deserialize(&json!(null)).unwrap(), None);
    }

    #[test]
    fn null_on_required_fails() {
        let attr = attribute(ScalarKind::Integer16, false, Arc::new(Int16Codec));
        let err = attr.deserialize(&json!(null)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullInNonOptional);
        assert!(err.to_string().contains("Pet.age"));
    }

    #[test]
    fn codec_errors_carry_path() {
        let attr = attribute(ScalarKind::Integer16, true, Arc::new(Int16Codec));
        let err = attr.deserialize(&json!(40000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        match err {
            SyncError::Codec { path, .. } => assert_eq!(path, "Pet.age"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn serialize_absent_is_null() {
        let attr = attribute(ScalarKind::Integer16, true, Arc::new(Int16Codec));
        assert_eq!(attr.serialize(None).unwrap(), json!(null));
        assert_eq!(attr.serialize(Some(&NativeValue::Integer16(3))).unwrap(), json!(3));
    }

    #[test]
    fn string_identifiers() {
        let attr = attribute(ScalarKind::String, false, Arc::new(StringCodec));
        let id = attr.deserialize_identifier("42").unwrap();
        assert_eq!(id, NativeValue::from("42"));
        assert_eq!(attr.serialize_identifier(&id).unwrap(), "42");
    }

    #[test]
    fn integer_identifiers_parse_decimal_text() {
        let attr = attribute(ScalarKind::Integer64, false, Arc::new(Int64Codec));
        let id = attr.deserialize_identifier("42").unwrap();
        assert_eq!(id, NativeValue::Integer64(42));
        assert_eq!(attr.serialize_identifier(&id).unwrap(), "42");

        let err = attr.deserialize_identifier("forty-two").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
    }

    #[test]
    fn identifier_codec_validates() {
        let attr = attribute(ScalarKind::Uuid, false, Arc::new(UuidCodec));
        let err = attr.deserialize_identifier("not-a-uuid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
    }
}
