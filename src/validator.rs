//! Structural validation of model files.
//!
//! Model files are checked against an embedded JSON Schema before they are
//! deserialized, so every problem is reported with its JSON pointer instead of
//! only the first serde error.

use serde_json::{json, Value};

use crate::error::{SchemaError, Violation};

/// Validate a model file against the model JSON Schema.
///
/// # Errors
///
/// Returns `SchemaError::InvalidModel` listing every violation.
pub fn validate_model(model: &Value) -> Result<(), SchemaError> {
    let schema = model_schema();
    let validator = jsonschema::validator_for(&schema).map_err(|e| SchemaError::InvalidModel {
        violations: vec![Violation {
            path: String::new(),
            message: format!("model schema could not be compiled: {}", e),
        }],
    })?;

    let violations: Vec<Violation> = validator
        .iter_errors(model)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::InvalidModel { violations })
    }
}

/// JSON Schema describing the model file format.
pub fn model_schema() -> Value {
    let kinds = json!([
        "boolean", "integer16", "integer32", "integer64", "decimal", "double", "float",
        "string", "date", "binary", "uuid", "uri"
    ]);

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["entities"],
        "additionalProperties": false,
        "properties": {
            "entities": {
                "type": "array",
                "items": { "$ref": "#/$defs/entity" }
            }
        },
        "$defs": {
            "name": { "type": "string", "minLength": 1 },
            "entity": {
                "type": "object",
                "required": ["name"],
                "additionalProperties": false,
                "properties": {
                    "name": { "$ref": "#/$defs/name" },
                    "remote_name": { "$ref": "#/$defs/name" },
                    "ignore": { "type": "boolean" },
                    "attributes": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/attribute" }
                    },
                    "relationships": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/relationship" }
                    }
                }
            },
            "attribute": {
                "type": "object",
                "required": ["name", "kind"],
                "additionalProperties": false,
                "properties": {
                    "name": { "$ref": "#/$defs/name" },
                    "kind": { "enum": kinds },
                    "optional": { "type": "boolean" },
                    "remote_id": { "type": "boolean" },
                    "ignore": { "type": "boolean" },
                    "remote_name": { "$ref": "#/$defs/name" },
                    "codec": { "$ref": "#/$defs/name" }
                }
            },
            "relationship": {
                "type": "object",
                "required": ["name", "target"],
                "additionalProperties": false,
                "properties": {
                    "name": { "$ref": "#/$defs/name" },
                    "target": { "$ref": "#/$defs/name" },
                    "to_many": { "type": "boolean" },
                    "ordered": { "type": "boolean" },
                    "optional": { "type": "boolean" },
                    "ignore": { "type": "boolean" },
                    "remote_name": { "$ref": "#/$defs/name" }
                }
            }
        }
    })
}
