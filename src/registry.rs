//! Schema registry: the facade between wire documents and the store.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::changeset::{ChangeSet, IdCollection, RelationshipChange, RelationshipTarget};
use crate::codec::{Codec, CodecTable};
use crate::diagnostics::DiagnosticSink;
use crate::document::{parse_document, to_wire_object, Document, Resource};
use crate::entity::EntityDescriptor;
use crate::error::{SchemaError, SyncError};
use crate::model::ModelDescription;
use crate::naming::NamingConvention;
use crate::store::{FieldValue, Store};
use crate::types::NativeValue;
use crate::updater::{UpdateEngine, UpdateResult};

/// Identifier attribute names tried when no attribute is flagged `remote_id`.
pub const DEFAULT_ID_NAMES: &[&str] = &["id", "remoteId"];

/// Options for building a [`SchemaRegistry`].
#[derive(Clone)]
pub struct RegistryOptions {
    pub naming: NamingConvention,
    pub default_id_names: Vec<String>,
    pub codecs: CodecTable,
    pub diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            naming: NamingConvention::default(),
            default_id_names: DEFAULT_ID_NAMES.iter().map(|s| s.to_string()).collect(),
            codecs: CodecTable::default(),
            diagnostics: None,
        }
    }
}

impl fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("naming", &self.naming)
            .field("default_id_names", &self.default_id_names)
            .field("codecs", &self.codecs)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl RegistryOptions {
    /// Default options: snake_case names, `id` / `remoteId` identifiers,
    /// ISO 8601 dates, base64 binaries and no diagnostic sink.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn default_id_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_id_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Register a codec that attributes can select by name.
    pub fn codec(mut self, name: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        self.codecs = self.codecs.with_codec(name, codec);
        self
    }

    pub fn date_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs = self.codecs.with_date_codec(codec);
        self
    }

    pub fn binary_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs = self.codecs.with_binary_codec(codec);
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

/// Entity descriptors indexed by local and remote name.
///
/// Built once from a [`ModelDescription`] and read-only afterwards.
#[derive(Debug)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, EntityDescriptor>,
    /// Remote type name -> local entity name.
    remote_types: HashMap<String, String>,
    naming: NamingConvention,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl SchemaRegistry {
    /// Build descriptors for every entity of `model` that is not ignored.
    ///
    /// # Errors
    ///
    /// Any entity build error, `SchemaError::DuplicateEntity`,
    /// `SchemaError::DuplicateType` when two entities share a remote name, and
    /// `SchemaError::UnknownTarget` for relationships to undeclared entities.
    pub fn new(model: &ModelDescription, options: RegistryOptions) -> Result<Self, SchemaError> {
        let mut entities = BTreeMap::new();
        let mut remote_types = HashMap::new();

        for entity_model in model.entities.iter().filter(|e| !e.ignore) {
            let entity = EntityDescriptor::build(
                entity_model,
                options.naming,
                &options.default_id_names,
                &options.codecs,
            )?;
            if entities.contains_key(entity.name()) {
                return Err(SchemaError::DuplicateEntity {
                    entity: entity.name().to_string(),
                });
            }
            if let Some(first) =
                remote_types.insert(entity.remote_name().to_string(), entity.name().to_string())
            {
                return Err(SchemaError::DuplicateType {
                    remote_name: entity.remote_name().to_string(),
                    first,
                    second: entity.name().to_string(),
                });
            }
            entities.insert(entity.name().to_string(), entity);
        }

        for entity in entities.values() {
            for relationship in entity.relationships() {
                if !entities.contains_key(relationship.target()) {
                    return Err(SchemaError::UnknownTarget {
                        path: relationship.path(),
                        target: relationship.target().to_string(),
                    });
                }
            }
        }

        debug!(entities = entities.len(), "schema registry built");
        Ok(Self {
            entities,
            remote_types,
            naming: options.naming,
            diagnostics: options.diagnostics,
        })
    }

    /// Entity by local name.
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// Entity by remote type name.
    pub fn entity_for_type(&self, remote_type: &str) -> Option<&EntityDescriptor> {
        self.remote_types
            .get(remote_type)
            .and_then(|name| self.entities.get(name))
    }

    /// All entities, ordered by local name.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    pub fn naming(&self) -> NamingConvention {
        self.naming
    }

    pub fn diagnostics(&self) -> Option<&dyn DiagnosticSink> {
        self.diagnostics.as_deref()
    }

    /// Convert one resource into a change set of its entity.
    ///
    /// # Errors
    ///
    /// `SyncError::UnknownType` when no entity has the resource's type, and
    /// any field conversion error.
    pub fn deserialize_resource(&self, resource: &Resource) -> Result<ChangeSet, SyncError> {
        let entity = self
            .entity_for_type(&resource.resource_type)
            .ok_or_else(|| SyncError::UnknownType {
                remote_type: resource.resource_type.clone(),
            })?;
        entity.deserialize(self, resource)
    }

    /// Convert every resource of a document, `included` first, then `data`.
    ///
    /// # Errors
    ///
    /// `SyncError::Server` for a document carrying `errors`, and the first
    /// resource conversion error.
    pub fn deserialize(&self, document: &Document) -> Result<Vec<ChangeSet>, SyncError> {
        if let Some(errors) = &document.errors {
            return Err(SyncError::Server {
                errors: errors.clone(),
            });
        }
        document
            .resources()
            .map(|resource| self.deserialize_resource(resource))
            .collect()
    }

    /// Parse a raw document and apply it to the store.
    ///
    /// # Errors
    ///
    /// `SyncError::Document` for documents rejected by the parser, and any
    /// error of [`update_document`](Self::update_document).
    pub fn update<S: Store>(
        &self,
        store: &mut S,
        raw: &Value,
    ) -> Result<UpdateResult<S::Record>, SyncError> {
        let document = parse_document(raw)?;
        self.update_document(store, &document)
    }

    /// Apply a parsed document to the store.
    ///
    /// Returns the records of the document's resources, `included` first.
    /// Nothing is committed: transaction handling belongs to the caller.
    ///
    /// # Errors
    ///
    /// Deserialization, resolution and store errors. Records written before
    /// the failure stay written.
    #[instrument(skip_all)]
    pub fn update_document<S: Store>(
        &self,
        store: &mut S,
        document: &Document,
    ) -> Result<UpdateResult<S::Record>, SyncError> {
        let changesets = self.deserialize(document)?;
        UpdateEngine::new(self, store).update(&changesets)
    }

    /// Read a record back into a change set.
    ///
    /// # Errors
    ///
    /// `SyncError::UnknownEntity` for records of undeclared entities, and
    /// store failures.
    pub fn changeset_for<S: Store>(
        &self,
        store: &S,
        record: &S::Record,
    ) -> Result<ChangeSet, SyncError> {
        let entity_name = store.entity_name(record)?;
        let entity = self
            .entity(&entity_name)
            .ok_or_else(|| SyncError::UnknownEntity {
                entity: entity_name.clone(),
            })?;

        let id = match store.get_field(record, entity.identifier().name())? {
            FieldValue::Null => None,
            FieldValue::Value(id) => Some(id),
            other => return Err(unexpected(entity.name(), entity.identifier().name(), &other)),
        };
        let mut changeset = ChangeSet::new(entity.name(), id);

        for attribute in entity.attributes() {
            let value = match store.get_field(record, attribute.name())? {
                FieldValue::Null => None,
                FieldValue::Value(v) => Some(v),
                other => return Err(unexpected(entity.name(), attribute.name(), &other)),
            };
            changeset
                .attributes
                .insert(attribute.name().to_string(), value);
        }

        for relationship in entity.relationships() {
            let target = relationship.target_entity(self)?;
            let id_field = target.identifier().name();
            let related_id = |related: &S::Record| -> Result<NativeValue, SyncError> {
                match store.get_field(related, id_field)? {
                    FieldValue::Value(id) => Ok(id),
                    other => Err(unexpected(target.name(), id_field, &other)),
                }
            };

            let value = match store.get_field(record, relationship.name())? {
                FieldValue::Null if relationship.is_to_many() => {
                    RelationshipTarget::Many(IdCollection::Ordered(Vec::new()))
                }
                FieldValue::Null => RelationshipTarget::None,
                FieldValue::One(related) => RelationshipTarget::One(related_id(&related)?),
                FieldValue::Many(related) => {
                    let ids = related
                        .iter()
                        .map(&related_id)
                        .collect::<Result<Vec<_>, _>>()?;
                    RelationshipTarget::Many(if relationship.is_ordered() {
                        IdCollection::ordered(ids)
                    } else {
                        IdCollection::unordered(ids)
                    })
                }
                other => return Err(unexpected(entity.name(), relationship.name(), &other)),
            };
            changeset.relationships.insert(
                relationship.name().to_string(),
                RelationshipChange {
                    target: relationship.target().to_string(),
                    value,
                },
            );
        }

        Ok(changeset)
    }

    /// Build the wire resource for a record.
    ///
    /// # Errors
    ///
    /// See [`changeset_for`](Self::changeset_for), plus codec failures.
    pub fn serialize_record<S: Store>(
        &self,
        store: &S,
        record: &S::Record,
    ) -> Result<Resource, SyncError> {
        let changeset = self.changeset_for(store, record)?;
        let entity = self
            .entity(&changeset.entity)
            .ok_or_else(|| SyncError::UnknownEntity {
                entity: changeset.entity.clone(),
            })?;
        entity.serialize(self, &changeset)
    }

    /// Build the JSON:API resource object for a record.
    ///
    /// # Errors
    ///
    /// See [`serialize_record`](Self::serialize_record).
    pub fn serialize<S: Store>(&self, store: &S, record: &S::Record) -> Result<Value, SyncError> {
        self.serialize_record(store, record)
            .map(|resource| to_wire_object(&resource))
    }

    /// Look up the record for a remote type and wire identifier.
    ///
    /// # Errors
    ///
    /// `SyncError::UnknownType`, identifier codec failures, and
    /// `SyncError::DuplicateRecord` when more than one record matches.
    pub fn find_record<S: Store>(
        &self,
        store: &mut S,
        remote_type: &str,
        id: &str,
    ) -> Result<Option<S::Record>, SyncError> {
        let entity = self
            .entity_for_type(remote_type)
            .ok_or_else(|| SyncError::UnknownType {
                remote_type: remote_type.to_string(),
            })?;
        let native = entity.identifier().deserialize_identifier(id)?;
        let mut records =
            store.fetch_by_ids(entity.name(), entity.identifier().name(), &[native])?;

        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            _ => Err(SyncError::DuplicateRecord {
                entity: entity.name().to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Records for a list of resources of one type, in the same order.
    ///
    /// Uses a single store fetch.
    ///
    /// # Errors
    ///
    /// `SyncError::TypeMismatch` for mixed resource types,
    /// `SyncError::NullIdentifier` for resources without id, and
    /// `SyncError::MissingRecord` when a resource has no record.
    pub fn records_for<S: Store>(
        &self,
        store: &mut S,
        resources: &[Resource],
    ) -> Result<Vec<S::Record>, SyncError> {
        let Some(first) = resources.first() else {
            return Ok(Vec::new());
        };
        let entity = self
            .entity_for_type(&first.resource_type)
            .ok_or_else(|| SyncError::UnknownType {
                remote_type: first.resource_type.clone(),
            })?;
        let identifier = entity.identifier();

        let mut ids = Vec::with_capacity(resources.len());
        for resource in resources {
            if resource.resource_type != first.resource_type {
                return Err(SyncError::TypeMismatch {
                    found: resource.resource_type.clone(),
                    expected: first.resource_type.clone(),
                });
            }
            let Some(id) = &resource.id else {
                return Err(SyncError::NullIdentifier {
                    entity: entity.name().to_string(),
                });
            };
            ids.push(identifier.deserialize_identifier(id)?);
        }

        let mut by_id = HashMap::new();
        for record in store.fetch_by_ids(entity.name(), identifier.name(), &ids)? {
            if let FieldValue::Value(id) = store.get_field(&record, identifier.name())? {
                by_id.insert(id, record);
            }
        }

        ids.iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| SyncError::MissingRecord {
                        entity: entity.name().to_string(),
                        id: id.to_string(),
                    })
            })
            .collect()
    }
}

fn unexpected<R: fmt::Debug>(entity: &str, field: &str, value: &FieldValue<R>) -> SyncError {
    SyncError::UnexpectedField {
        path: format!("{}.{}", entity, field),
        message: format!("unexpected store value {:?}", value),
    }
}
