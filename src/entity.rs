//! Schema binding for one entity type.

use std::collections::{BTreeMap, HashMap};

use serde_json::Map;

use crate::attribute::AttributeDescriptor;
use crate::changeset::ChangeSet;
use crate::codec::CodecTable;
use crate::diagnostics::Diagnostic;
use crate::document::Resource;
use crate::error::{SchemaError, SyncError};
use crate::model::{AttributeModel, EntityModel};
use crate::naming::NamingConvention;
use crate::registry::SchemaRegistry;
use crate::relationship::RelationshipDescriptor;

/// Identifier, attributes and relationships of one entity.
///
/// Built once by the registry and read-only afterwards.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    remote_name: String,
    identifier: AttributeDescriptor,
    attributes: BTreeMap<String, AttributeDescriptor>,
    relationships: BTreeMap<String, RelationshipDescriptor>,
    /// Remote name -> local name.
    remote_attributes: HashMap<String, String>,
    remote_relationships: HashMap<String, String>,
}

impl EntityDescriptor {
    /// Build the descriptor for one entity model.
    ///
    /// # Errors
    ///
    /// `SchemaError::MissingIdentifier` / `SchemaError::MultipleIdentifiers`
    /// when the identifier cannot be chosen, `SchemaError::DuplicateField`
    /// for clashing local or remote names, and `SchemaError::UnknownCodec`
    /// for a codec override missing from `codecs`.
    pub fn build(
        model: &EntityModel,
        naming: NamingConvention,
        default_id_names: &[String],
        codecs: &CodecTable,
    ) -> Result<Self, SchemaError> {
        let attributes: Vec<&AttributeModel> =
            model.attributes.iter().filter(|a| !a.ignore).collect();
        let id_model = find_identifier(&model.name, &attributes, default_id_names)?;

        let remote_name = model
            .remote_name
            .clone()
            .unwrap_or_else(|| naming.to_remote(&model.name));

        let build_attribute = |attribute: &AttributeModel| -> Result<AttributeDescriptor, SchemaError> {
            let codec = match &attribute.codec {
                Some(codec_name) => codecs.named(codec_name).ok_or_else(|| {
                    SchemaError::UnknownCodec {
                        path: format!("{}.{}", model.name, attribute.name),
                        codec: codec_name.clone(),
                    }
                })?,
                None => codecs.for_kind(attribute.kind),
            };
            let remote = attribute
                .remote_name
                .clone()
                .unwrap_or_else(|| naming.to_remote(&attribute.name));
            Ok(AttributeDescriptor::new(
                &model.name,
                &attribute.name,
                remote,
                attribute.kind,
                attribute.optional,
                codec,
            ))
        };

        let mut descriptor = Self {
            name: model.name.clone(),
            remote_name,
            identifier: build_attribute(id_model)?,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
            remote_attributes: HashMap::new(),
            remote_relationships: HashMap::new(),
        };

        for attribute in attributes {
            if attribute.name == id_model.name {
                continue;
            }
            let built = build_attribute(attribute)?;
            descriptor.claim(built.name(), built.remote_name())?;
            descriptor
                .remote_attributes
                .insert(built.remote_name().to_string(), built.name().to_string());
            descriptor.attributes.insert(built.name().to_string(), built);
        }

        for relationship in model.relationships.iter().filter(|r| !r.ignore) {
            let remote = relationship
                .remote_name
                .clone()
                .unwrap_or_else(|| naming.to_remote(&relationship.name));
            descriptor.claim(&relationship.name, &remote)?;
            descriptor
                .remote_relationships
                .insert(remote.clone(), relationship.name.clone());
            descriptor.relationships.insert(
                relationship.name.clone(),
                RelationshipDescriptor::new(
                    &model.name,
                    &relationship.name,
                    remote,
                    &relationship.target,
                    relationship.to_many,
                    relationship.ordered,
                    relationship.optional,
                ),
            );
        }

        Ok(descriptor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote type name, as used in `type` members.
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn identifier(&self) -> &AttributeDescriptor {
        &self.identifier
    }

    /// Attribute by local name. The identifier is not included.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.get(name)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDescriptor> {
        self.relationships.values()
    }

    pub fn attribute_by_remote(&self, remote_name: &str) -> Option<&AttributeDescriptor> {
        self.remote_attributes
            .get(remote_name)
            .and_then(|name| self.attributes.get(name))
    }

    pub fn relationship_by_remote(&self, remote_name: &str) -> Option<&RelationshipDescriptor> {
        self.remote_relationships
            .get(remote_name)
            .and_then(|name| self.relationships.get(name))
    }

    /// Convert a resource of this entity's type into a change set.
    ///
    /// Fields missing from the resource are left out of the change set.
    /// Unknown and missing fields are reported to the registry's diagnostic
    /// sink, if any.
    ///
    /// # Errors
    ///
    /// `SyncError::TypeMismatch` when the resource type is not this entity's
    /// remote name, and any attribute or relationship conversion error.
    pub fn deserialize(
        &self,
        registry: &SchemaRegistry,
        resource: &Resource,
    ) -> Result<ChangeSet, SyncError> {
        if resource.resource_type != self.remote_name {
            return Err(SyncError::TypeMismatch {
                found: resource.resource_type.clone(),
                expected: self.remote_name.clone(),
            });
        }

        let id = resource
            .id
            .as_deref()
            .map(|id| self.identifier.deserialize_identifier(id))
            .transpose()?;
        let mut changeset = ChangeSet::new(&self.name, id);
        let sink = registry.diagnostics();

        for (remote, value) in &resource.attributes {
            match self.attribute_by_remote(remote) {
                Some(attribute) => {
                    let native = attribute.deserialize(value)?;
                    changeset
                        .attributes
                        .insert(attribute.name().to_string(), native);
                }
                None => {
                    if let Some(sink) = sink {
                        sink.report(Diagnostic::unknown("attribute", &self.name, remote));
                    }
                }
            }
        }

        for (remote, reference) in &resource.relationships {
            match self.relationship_by_remote(remote) {
                Some(relationship) => {
                    let change = relationship.deserialize(registry, reference)?;
                    changeset
                        .relationships
                        .insert(relationship.name().to_string(), change);
                }
                None => {
                    if let Some(sink) = sink {
                        sink.report(Diagnostic::unknown("relationship", &self.name, remote));
                    }
                }
            }
        }

        if let Some(sink) = sink {
            for attribute in self.attributes.values() {
                if !resource.attributes.contains_key(attribute.remote_name()) {
                    sink.report(Diagnostic::missing(
                        "attribute",
                        &self.name,
                        attribute.name(),
                        attribute.remote_name(),
                    ));
                }
            }
            for relationship in self.relationships.values() {
                if !resource.relationships.contains_key(relationship.remote_name()) {
                    sink.report(Diagnostic::missing(
                        "relationship",
                        &self.name,
                        relationship.name(),
                        relationship.remote_name(),
                    ));
                }
            }
        }

        Ok(changeset)
    }

    /// Convert a change set of this entity back into a resource.
    ///
    /// # Errors
    ///
    /// `SyncError::TypeMismatch` for a change set of another entity,
    /// `SyncError::UnexpectedField` for fields this entity does not declare,
    /// and codec failures.
    pub fn serialize(
        &self,
        registry: &SchemaRegistry,
        changeset: &ChangeSet,
    ) -> Result<Resource, SyncError> {
        if changeset.entity != self.name {
            return Err(SyncError::TypeMismatch {
                found: changeset.entity.clone(),
                expected: self.name.clone(),
            });
        }

        let id = changeset
            .id
            .as_ref()
            .map(|id| self.identifier.serialize_identifier(id))
            .transpose()?;
        let mut resource = Resource::new(&self.remote_name, id);

        let mut attributes = Map::new();
        for (name, value) in &changeset.attributes {
            let attribute = self.attribute(name).ok_or_else(|| SyncError::UnexpectedField {
                path: format!("{}.{}", self.name, name),
                message: "not an attribute of this entity".to_string(),
            })?;
            attributes.insert(
                attribute.remote_name().to_string(),
                attribute.serialize(value.as_ref())?,
            );
        }
        resource.attributes = attributes;

        for (name, change) in &changeset.relationships {
            let relationship =
                self.relationship(name)
                    .ok_or_else(|| SyncError::UnexpectedField {
                        path: format!("{}.{}", self.name, name),
                        message: "not a relationship of this entity".to_string(),
                    })?;
            resource.relationships.insert(
                relationship.remote_name().to_string(),
                relationship.serialize(registry, change)?,
            );
        }

        Ok(resource)
    }

    /// Record a local and remote field name, rejecting clashes with the
    /// identifier and with fields claimed before.
    fn claim(&self, name: &str, remote_name: &str) -> Result<(), SchemaError> {
        let duplicate = |field: &str| SchemaError::DuplicateField {
            entity: self.name.clone(),
            field: field.to_string(),
        };
        if name == self.identifier.name()
            || self.attributes.contains_key(name)
            || self.relationships.contains_key(name)
        {
            return Err(duplicate(name));
        }
        if remote_name == "id"
            || remote_name == "type"
            || self.remote_attributes.contains_key(remote_name)
            || self.remote_relationships.contains_key(remote_name)
        {
            return Err(duplicate(remote_name));
        }
        Ok(())
    }
}

// --- Internal implementation ---

/// Pick the identifier attribute: the one flagged `remote_id`, otherwise the
/// unique attribute named like one of the default identifier names.
fn find_identifier<'m>(
    entity: &str,
    attributes: &[&'m AttributeModel],
    default_id_names: &[String],
) -> Result<&'m AttributeModel, SchemaError> {
    let flagged: Vec<&AttributeModel> =
        attributes.iter().copied().filter(|a| a.remote_id).collect();
    let candidates = if flagged.is_empty() {
        attributes
            .iter()
            .copied()
            .filter(|a| default_id_names.iter().any(|id| *id == a.name))
            .collect()
    } else {
        flagged
    };

    match candidates.as_slice() {
        [] => Err(SchemaError::MissingIdentifier {
            entity: entity.to_string(),
        }),
        [single] => Ok(*single),
        many => Err(SchemaError::MultipleIdentifiers {
            entity: entity.to_string(),
            names: many.iter().map(|a| a.name.clone()).collect(),
        }),
    }
}
