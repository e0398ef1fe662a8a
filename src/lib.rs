//! JSON:API Graph
//!
//! Schema-driven conversion between JSON:API documents and records held in a
//! persistent store.
//!
//! A [`SchemaRegistry`] is built once from a [`ModelDescription`]. It parses
//! wire documents into validated [`ChangeSet`]s and applies them to any
//! [`Store`] with one fetch per entity type, writing only fields whose value
//! actually changed.
//!
//! # Example
//!
//! ```
//! use jsonapi_graph::{
//!     AttributeModel, EntityModel, MemoryStore, ModelDescription, RegistryOptions,
//!     RelationshipModel, ScalarKind, SchemaRegistry,
//! };
//! use serde_json::json;
//!
//! let model = ModelDescription::new()
//!     .entity(
//!         EntityModel::new("Pet")
//!             .attribute(AttributeModel::new("id", ScalarKind::String))
//!             .attribute(AttributeModel::new("age", ScalarKind::Integer16))
//!             .relationship(RelationshipModel::to_one("owner", "Person")),
//!     )
//!     .entity(EntityModel::new("Person").attribute(AttributeModel::new("id", ScalarKind::String)));
//!
//! let registry = SchemaRegistry::new(&model, RegistryOptions::default()).unwrap();
//! let mut store = MemoryStore::for_model(&model);
//!
//! let document = json!({
//!     "data": {
//!         "type": "pet",
//!         "id": "1",
//!         "attributes": { "age": 3 },
//!         "relationships": { "owner": { "data": { "type": "person", "id": "7" } } }
//!     }
//! });
//!
//! let first = registry.update(&mut store, &document).unwrap();
//! assert_eq!(first.stats.created, 2);
//!
//! // Nothing changed, so nothing is written.
//! let second = registry.update(&mut store, &document).unwrap();
//! assert_eq!(second.stats.writes, 0);
//! ```
//!
//! # Pipeline
//!
//! | Step | Entry point | Fails with |
//! |------|-------------|------------|
//! | parse | [`parse_document`] | [`DocumentError`] |
//! | deserialize | [`SchemaRegistry::deserialize`] | [`SyncError`] |
//! | resolve | [`BatchResolver`] | [`SyncError`] |
//! | apply | [`UpdateEngine`] | [`SyncError`] |
//!
//! Transactions are the caller's concern: nothing is committed.

mod attribute;
mod changeset;
pub mod codec;
mod diagnostics;
mod document;
mod entity;
mod error;
mod loader;
mod model;
mod naming;
mod registry;
mod relationship;
mod resolver;
mod store;
mod types;
mod updater;
mod validator;

pub use attribute::AttributeDescriptor;
pub use changeset::{ChangeSet, IdCollection, RelationshipChange, RelationshipTarget};
pub use codec::{Codec, CodecTable};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, Severity, TracingSink};
pub use document::{
    parse_document, to_wire_object, Document, Linkage, RelationshipRef, Resource,
    SUPPORTED_VERSIONS,
};
pub use entity::EntityDescriptor;
pub use error::{
    CodecError, DocumentError, ErrorKind, SchemaError, ServerError, StoreError, SyncError,
    Violation,
};
pub use loader::{
    is_url, load_document, load_document_auto, load_document_str, load_model, load_model_str,
};
pub use model::{AttributeModel, EntityModel, ModelDescription, RelationshipModel};
pub use naming::NamingConvention;
pub use registry::{RegistryOptions, SchemaRegistry, DEFAULT_ID_NAMES};
pub use relationship::RelationshipDescriptor;
pub use resolver::{BatchResolver, ResolveStats};
pub use store::{FieldValue, MemoryStore, RecordRef, Store, StoreStats};
pub use types::{json_type_name, NativeValue, ScalarKind, WireValue};
pub use updater::{UpdateEngine, UpdateResult, UpdateStats};
pub use validator::{model_schema, validate_model};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
