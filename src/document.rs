//! JSON:API document model and structural parser.
//!
//! Parsing is purely structural: it checks the document shape (resource
//! objects, linkage, top-level member rules) and knows nothing about the
//! schema. Attribute values are kept as raw [`WireValue`]s.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::{DocumentError, ServerError};
use crate::types::{json_type_name, WireValue};

/// JSON:API versions this parser accepts in `jsonapi.version`.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// One parsed wire document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Primary resources. `Some(vec![])` for `"data": null` or `"data": []`.
    pub data: Option<Vec<Resource>>,
    /// Side-loaded resources from `included`.
    pub included: Option<Vec<Resource>>,
    /// Upstream errors. Never set together with `data`.
    pub errors: Option<Vec<ServerError>>,
    pub meta: Option<Map<String, Value>>,
}

/// One resource object.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub resource_type: String,
    /// Absent only for resources created client-side.
    pub id: Option<String>,
    pub attributes: Map<String, WireValue>,
    pub relationships: BTreeMap<String, RelationshipRef>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, id: Option<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }
}

/// Resource linkage of one relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRef {
    /// Declared target type. `None` for null linkage and for `[]`.
    pub resource_type: Option<String>,
    pub linkage: Linkage,
}

/// Shape of a relationship's `data` member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Linkage {
    Null,
    ToOne(String),
    ToMany(Vec<String>),
}

impl Document {
    /// Iterates `included` resources first, then primary `data`.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.included
            .iter()
            .flatten()
            .chain(self.data.iter().flatten())
    }

    /// Rebuilds the wire representation of the whole document.
    pub fn to_wire(&self) -> Value {
        let mut result = Map::new();
        result.insert("jsonapi".to_string(), json!({ "version": "1.0" }));

        if let Some(errors) = &self.errors {
            let errors = errors
                .iter()
                .map(|e| Value::Object(e.object.clone()))
                .collect();
            result.insert("errors".to_string(), Value::Array(errors));
        }
        if let Some(data) = &self.data {
            let data = data.iter().map(to_wire_object).collect();
            result.insert("data".to_string(), Value::Array(data));
        }
        if let Some(included) = &self.included {
            let included = included.iter().map(to_wire_object).collect();
            result.insert("included".to_string(), Value::Array(included));
        }
        if let Some(meta) = &self.meta {
            result.insert("meta".to_string(), Value::Object(meta.clone()));
        }

        Value::Object(result)
    }
}

/// Parse a raw JSON value into a [`Document`].
///
/// # Errors
///
/// Returns `DocumentError::Malformed` for structural violations,
/// `DocumentError::Unsupported` for linkage this parser does not handle
/// and `DocumentError::UnsupportedVersion` for an unknown `jsonapi.version`.
pub fn parse_document(raw: &Value) -> Result<Document, DocumentError> {
    let Some(root) = raw.as_object() else {
        return Err(DocumentError::malformed(format!(
            "a document must be an object, got {}",
            json_type_name(raw)
        )));
    };

    validate_version(root)?;

    if let Some(errors) = parse_errors(root)? {
        return Ok(Document {
            errors: Some(errors),
            ..Document::default()
        });
    }

    let meta = match root.get("meta") {
        None => None,
        Some(Value::Object(meta)) => Some(meta.clone()),
        Some(_) => return Err(DocumentError::malformed("meta must be an object")),
    };

    let Some(data_value) = root.get("data") else {
        if meta.is_some() {
            return Ok(Document {
                meta,
                ..Document::default()
            });
        }
        return Err(DocumentError::malformed(
            "a document must contain at least one of data, errors or meta",
        ));
    };

    let data = match data_value {
        Value::Object(object) => vec![parse_resource(object)?],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(object) => parse_resource(object),
                other => Err(DocumentError::malformed(format!(
                    "primary data entries must be resource objects, got {}",
                    json_type_name(other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Value::Null => Vec::new(),
        other => {
            return Err(DocumentError::malformed(format!(
                "primary data must be a resource object, an array of resource objects or null, got {}",
                json_type_name(other)
            )))
        }
    };

    let included = match root.get("included") {
        None => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => parse_resource(object),
                    _ => Err(included_error()),
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => return Err(included_error()),
    };

    Ok(Document {
        data: Some(data),
        included,
        errors: None,
        meta,
    })
}

/// Convert a resource back into its JSON:API resource object.
///
/// `attributes` and `relationships` are always present, even when empty.
pub fn to_wire_object(resource: &Resource) -> Value {
    let mut result = Map::new();
    result.insert(
        "type".to_string(),
        Value::String(resource.resource_type.clone()),
    );
    if let Some(id) = &resource.id {
        result.insert("id".to_string(), Value::String(id.clone()));
    }

    result.insert(
        "attributes".to_string(),
        Value::Object(resource.attributes.clone()),
    );

    let mut relationships = Map::new();
    for (name, relationship) in &resource.relationships {
        let identifier = |id: &String| -> Value {
            let mut obj = Map::new();
            if let Some(resource_type) = &relationship.resource_type {
                obj.insert("type".to_string(), Value::String(resource_type.clone()));
            }
            obj.insert("id".to_string(), Value::String(id.clone()));
            Value::Object(obj)
        };

        let data = match &relationship.linkage {
            Linkage::Null => Value::Null,
            Linkage::ToOne(id) => identifier(id),
            Linkage::ToMany(ids) => Value::Array(ids.iter().map(identifier).collect()),
        };
        relationships.insert(name.clone(), json!({ "data": data }));
    }
    result.insert("relationships".to_string(), Value::Object(relationships));

    Value::Object(result)
}

// --- Internal implementation ---

fn validate_version(root: &Map<String, Value>) -> Result<(), DocumentError> {
    let Some(jsonapi) = root.get("jsonapi") else {
        return Ok(());
    };
    let Some(jsonapi) = jsonapi.as_object() else {
        return Err(DocumentError::malformed("jsonapi must be an object"));
    };

    match jsonapi.get("version") {
        None => Ok(()),
        Some(Value::String(version)) => {
            if SUPPORTED_VERSIONS.contains(&version.as_str()) {
                Ok(())
            } else {
                Err(DocumentError::UnsupportedVersion {
                    version: version.clone(),
                })
            }
        }
        Some(_) => Err(DocumentError::malformed("jsonapi.version must be a string")),
    }
}

fn parse_errors(root: &Map<String, Value>) -> Result<Option<Vec<ServerError>>, DocumentError> {
    let Some(errors) = root.get("errors") else {
        return Ok(None);
    };

    let not_objects =
        || DocumentError::malformed("errors must be an array of error objects");
    let items = errors.as_array().ok_or_else(not_objects)?;

    if root.contains_key("data") {
        return Err(DocumentError::malformed(
            "data and errors must not coexist in the same document",
        ));
    }

    items
        .iter()
        .map(|item| {
            item.as_object()
                .map(|object| ServerError::from_object(object.clone()))
                .ok_or_else(not_objects)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn parse_resource(object: &Map<String, Value>) -> Result<Resource, DocumentError> {
    let (resource_type, id) = resource_identifier(object)?;
    let mut resource = Resource::new(resource_type, Some(id));

    if let Some(attributes) = object.get("attributes") {
        let Some(attributes) = attributes.as_object() else {
            return Err(DocumentError::malformed("attributes must be an object"));
        };
        resource.attributes = attributes.clone();
    }

    if let Some(relationships) = object.get("relationships") {
        let Some(relationships) = relationships.as_object() else {
            return Err(DocumentError::malformed("relationships must be an object"));
        };
        for (name, content) in relationships {
            let relationship = parse_relationship(name, content)?;
            resource.relationships.insert(name.clone(), relationship);
        }
    }

    Ok(resource)
}

fn parse_relationship(name: &str, content: &Value) -> Result<RelationshipRef, DocumentError> {
    let Some(data) = content.as_object().and_then(|c| c.get("data")) else {
        return Err(DocumentError::unsupported(format!(
            "relationship '{}' has no resource linkage; only relationships with data are supported",
            name
        )));
    };

    match data {
        Value::Null => Ok(RelationshipRef {
            resource_type: None,
            linkage: Linkage::Null,
        }),
        Value::Object(object) => {
            let (resource_type, id) = resource_identifier(object)?;
            Ok(RelationshipRef {
                resource_type: Some(resource_type),
                linkage: Linkage::ToOne(id),
            })
        }
        Value::Array(items) => {
            let mut resource_type: Option<String> = None;
            let mut ids = Vec::with_capacity(items.len());

            for item in items {
                let Some(object) = item.as_object() else {
                    return Err(DocumentError::malformed(format!(
                        "relationship '{}' must contain resource identifier objects",
                        name
                    )));
                };
                let (item_type, id) = resource_identifier(object)?;
                match &resource_type {
                    Some(existing) if *existing != item_type => {
                        return Err(DocumentError::unsupported(format!(
                            "relationship '{}' includes objects of different types",
                            name
                        )));
                    }
                    Some(_) => {}
                    None => resource_type = Some(item_type),
                }
                ids.push(id);
            }

            Ok(RelationshipRef {
                resource_type,
                linkage: Linkage::ToMany(ids),
            })
        }
        other => Err(DocumentError::malformed(format!(
            "resource linkage of '{}' must be null, an object or an array, got {}",
            name,
            json_type_name(other)
        ))),
    }
}

fn resource_identifier(object: &Map<String, Value>) -> Result<(String, String), DocumentError> {
    let (Some(resource_type), Some(id)) = (object.get("type"), object.get("id")) else {
        return Err(DocumentError::malformed(
            "every resource object must contain an id member and a type member",
        ));
    };

    match (resource_type, id) {
        (Value::String(resource_type), Value::String(id)) => {
            Ok((resource_type.clone(), id.clone()))
        }
        _ => Err(DocumentError::malformed(
            "the values of the id and type members must be strings",
        )),
    }
}

fn included_error() -> DocumentError {
    DocumentError::malformed("included must be an array of resource objects")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kind_of(raw: Value) -> ErrorKind {
        parse_document(&raw).unwrap_err().kind()
    }

    #[test]
    fn parses_single_resource() {
        let doc = parse_document(&json!({
            "data": { "type": "pet", "id": "1", "attributes": { "age": 1 } }
        }))
        .unwrap();

        let data = doc.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].resource_type, "pet");
        assert_eq!(data[0].id.as_deref(), Some("1"));
        assert_eq!(data[0].attributes["age"], json!(1));
        assert!(data[0].relationships.is_empty());
        assert!(doc.included.is_none());
    }

    #[test]
    fn null_data_is_empty_list() {
        let doc = parse_document(&json!({ "data": null })).unwrap();
        assert_eq!(doc.data, Some(vec![]));
    }

    #[test]
    fn meta_only_document() {
        let doc = parse_document(&json!({ "meta": { "total": 0 } })).unwrap();
        assert!(doc.data.is_none());
        assert_eq!(doc.meta.unwrap()["total"], json!(0));
    }

    #[test]
    fn empty_document_is_malformed() {
        assert_eq!(kind_of(json!({})), ErrorKind::MalformedDocument);
        assert_eq!(kind_of(json!([])), ErrorKind::MalformedDocument);
    }

    #[test]
    fn meta_must_be_object() {
        assert_eq!(
            kind_of(json!({ "meta": 1, "data": null })),
            ErrorKind::MalformedDocument
        );
    }

    #[test]
    fn data_must_be_resource_shaped() {
        assert_eq!(kind_of(json!({ "data": 5 })), ErrorKind::MalformedDocument);
        assert_eq!(kind_of(json!({ "data": ["a"] })), ErrorKind::MalformedDocument);
    }

    #[test]
    fn numeric_id_is_malformed() {
        assert_eq!(
            kind_of(json!({ "data": { "type": "pet", "id": 1 } })),
            ErrorKind::MalformedDocument
        );
    }

    #[test]
    fn missing_id_is_malformed() {
        assert_eq!(
            kind_of(json!({ "data": { "type": "pet" } })),
            ErrorKind::MalformedDocument
        );
    }

    #[test]
    fn attributes_must_be_object() {
        assert_eq!(
            kind_of(json!({ "data": { "type": "pet", "id": "1", "attributes": [] } })),
            ErrorKind::MalformedDocument
        );
        assert_eq!(
            kind_of(json!({ "data": { "type": "pet", "id": "1", "relationships": "x" } })),
            ErrorKind::MalformedDocument
        );
    }

    #[test]
    fn version_checks() {
        assert!(parse_document(&json!({ "jsonapi": { "version": "1.0" }, "data": null })).is_ok());
        assert!(parse_document(&json!({ "jsonapi": {}, "data": null })).is_ok());
        assert_eq!(
            kind_of(json!({ "jsonapi": { "version": "1.1" }, "data": null })),
            ErrorKind::UnsupportedVersion
        );
        assert_eq!(
            kind_of(json!({ "jsonapi": { "version": 1 }, "data": null })),
            ErrorKind::MalformedDocument
        );
        assert_eq!(
            kind_of(json!({ "jsonapi": "1.0", "data": null })),
            ErrorKind::MalformedDocument
        );
    }

    #[test]
    fn linkage_variants() {
        let doc = parse_document(&json!({
            "data": {
                "type": "pet", "id": "1",
                "relationships": {
                    "owner": { "data": null },
                    "vet": { "data": { "type": "vet", "id": "9" } },
                    "toys": { "data": [{ "type": "toy", "id": "2" }, { "type": "toy", "id": "3" }] },
                    "friends": { "data": [] }
                }
            }
        }))
        .unwrap();
        let rels = &doc.data.unwrap()[0].relationships;

        assert_eq!(rels["owner"].resource_type, None);
        assert_eq!(rels["owner"].linkage, Linkage::Null);
        assert_eq!(rels["vet"].resource_type.as_deref(), Some("vet"));
        assert_eq!(rels["vet"].linkage, Linkage::ToOne("9".into()));
        assert_eq!(
            rels["toys"].linkage,
            Linkage::ToMany(vec!["2".into(), "3".into()])
        );
        assert_eq!(rels["friends"].resource_type, None);
        assert_eq!(rels["friends"].linkage, Linkage::ToMany(vec![]));
    }

    #[test]
    fn mixed_types_are_unsupported() {
        let raw = json!({
            "data": {
                "type": "pet", "id": "1",
                "relationships": {
                    "things": { "data": [{ "type": "a", "id": "1" }, { "type": "b", "id": "2" }] }
                }
            }
        });
        assert_eq!(kind_of(raw), ErrorKind::Unsupported);
    }

    #[test]
    fn relationship_without_data_is_unsupported() {
        let raw = json!({
            "data": {
                "type": "pet", "id": "1",
                "relationships": { "owner": { "links": { "related": "/owner" } } }
            }
        });
        assert_eq!(kind_of(raw), ErrorKind::Unsupported);
    }

    #[test]
    fn linkage_of_wrong_type_is_malformed() {
        let raw = json!({
            "data": {
                "type": "pet", "id": "1",
                "relationships": { "owner": { "data": "7" } }
            }
        });
        assert_eq!(kind_of(raw), ErrorKind::MalformedDocument);
    }

    #[test]
    fn included_must_be_array_of_objects() {
        assert_eq!(
            kind_of(json!({ "data": null, "included": {} })),
            ErrorKind::MalformedDocument
        );
        assert_eq!(
            kind_of(json!({ "data": null, "included": [1] })),
            ErrorKind::MalformedDocument
        );
    }

    #[test]
    fn errors_document() {
        let doc = parse_document(&json!({
            "errors": [{ "status": "422", "title": "Invalid attribute" }],
            "meta": { "ignored": true }
        }))
        .unwrap();

        let errors = doc.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Invalid attribute");
        assert!(doc.data.is_none());
        assert!(doc.meta.is_none());
    }

    #[test]
    fn errors_and_data_conflict() {
        assert_eq!(
            kind_of(json!({ "errors": [], "data": null })),
            ErrorKind::MalformedDocument
        );
        assert_eq!(kind_of(json!({ "errors": {} })), ErrorKind::MalformedDocument);
    }

    #[test]
    fn wire_object_always_has_members() {
        let resource = Resource::new("pet", Some("1".into()));
        let wire = to_wire_object(&resource);
        assert_eq!(
            wire,
            json!({ "type": "pet", "id": "1", "attributes": {}, "relationships": {} })
        );
    }

    #[test]
    fn wire_object_wraps_linkage() {
        let mut resource = Resource::new("pet", Some("1".into()));
        resource.relationships.insert(
            "owner".into(),
            RelationshipRef {
                resource_type: Some("person".into()),
                linkage: Linkage::ToOne("4".into()),
            },
        );
        resource.relationships.insert(
            "vet".into(),
            RelationshipRef {
                resource_type: Some("vet".into()),
                linkage: Linkage::Null,
            },
        );

        let wire = to_wire_object(&resource);
        assert_eq!(
            wire["relationships"]["owner"],
            json!({ "data": { "type": "person", "id": "4" } })
        );
        assert_eq!(wire["relationships"]["vet"], json!({ "data": null }));
    }

    #[test]
    fn document_to_wire_reparses() {
        let raw = json!({
            "data": [{ "type": "pet", "id": "1", "attributes": { "name": "Rex" } }],
            "included": [{ "type": "person", "id": "2" }],
            "meta": { "page": 1 }
        });
        let doc = parse_document(&raw).unwrap();
        let again = parse_document(&doc.to_wire()).unwrap();
        assert_eq!(doc, again);
    }

    #[test]
    fn resources_iterates_included_first() {
        let doc = parse_document(&json!({
            "data": [{ "type": "pet", "id": "1" }],
            "included": [{ "type": "person", "id": "2" }]
        }))
        .unwrap();
        let types: Vec<_> = doc.resources().map(|r| r.resource_type.as_str()).collect();
        assert_eq!(types, vec!["person", "pet"]);
    }
}
