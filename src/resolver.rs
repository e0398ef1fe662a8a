//! Batched record resolution.
//!
//! Collects every (entity, identifier) pair a batch of change sets touches,
//! fetches each entity's records with a single store query and creates
//! placeholders for identifiers the store does not know yet. Lookups after
//! [`BatchResolver::fetch`] never hit the store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::changeset::ChangeSet;
use crate::error::SyncError;
use crate::registry::SchemaRegistry;
use crate::store::{FieldValue, Store};
use crate::types::NativeValue;

/// Counters for one resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    /// Store fetches issued.
    pub fetches: usize,
    /// Records matched by those fetches.
    pub found: usize,
    /// Placeholder records created.
    pub created: usize,
}

/// Identifiers registered for one entity, in registration order.
#[derive(Debug, Default)]
struct Required {
    ids: Vec<NativeValue>,
    seen: HashSet<NativeValue>,
}

impl Required {
    fn insert(&mut self, id: &NativeValue) {
        if self.seen.insert(id.clone()) {
            self.ids.push(id.clone());
        }
    }
}

/// Two-phase resolver: register requirements, then fetch them in bulk.
#[derive(Debug)]
pub struct BatchResolver<R> {
    required: BTreeMap<String, Required>,
    resolved: HashMap<String, HashMap<NativeValue, R>>,
    stats: ResolveStats,
}

impl<R> Default for BatchResolver<R> {
    fn default() -> Self {
        Self {
            required: BTreeMap::new(),
            resolved: HashMap::new(),
            stats: ResolveStats::default(),
        }
    }
}

impl<R: Clone + fmt::Debug> BatchResolver<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one record that must be available after [`fetch`](Self::fetch).
    pub fn require(&mut self, entity: &str, id: &NativeValue) {
        self.required.entry(entity.to_string()).or_default().insert(id);
    }

    /// Register every record the change sets touch: the change sets' own
    /// records and every related record they reference.
    ///
    /// # Errors
    ///
    /// `SyncError::NullIdentifier` for a change set without an identifier.
    pub fn compute_required(&mut self, changesets: &[ChangeSet]) -> Result<(), SyncError> {
        for changeset in changesets {
            let Some(id) = &changeset.id else {
                return Err(SyncError::NullIdentifier {
                    entity: changeset.entity.clone(),
                });
            };
            self.require(&changeset.entity, id);

            for change in changeset.relationships.values() {
                for id in change.value.ids() {
                    self.require(&change.target, id);
                }
            }
        }
        Ok(())
    }

    /// Resolve all registered records with one store fetch per entity.
    ///
    /// Identifiers resolved by an earlier call are not fetched again.
    ///
    /// # Errors
    ///
    /// `SyncError::UnknownEntity` for an entity the registry does not know,
    /// `SyncError::DuplicateRecord` when the store holds two records with the
    /// same identifier, and store failures.
    pub fn fetch<S>(&mut self, registry: &SchemaRegistry, store: &mut S) -> Result<(), SyncError>
    where
        S: Store<Record = R>,
    {
        for (entity_name, required) in &self.required {
            let entity = registry
                .entity(entity_name)
                .ok_or_else(|| SyncError::UnknownEntity {
                    entity: entity_name.clone(),
                })?;
            let id_field = entity.identifier().name();
            let resolved = self.resolved.entry(entity_name.clone()).or_default();

            let pending: Vec<NativeValue> = required
                .ids
                .iter()
                .filter(|id| !resolved.contains_key(*id))
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }

            let records = store.fetch_by_ids(entity_name, id_field, &pending)?;
            self.stats.fetches += 1;
            let found = records.len();

            for record in records {
                let id = match store.get_field(&record, id_field)? {
                    FieldValue::Value(id) => id,
                    other => {
                        return Err(SyncError::UnexpectedField {
                            path: format!("{}.{}", entity_name, id_field),
                            message: format!("expected an identifier value, got {:?}", other),
                        })
                    }
                };
                if resolved.insert(id.clone(), record).is_some() {
                    return Err(SyncError::DuplicateRecord {
                        entity: entity_name.clone(),
                        id: id.to_string(),
                    });
                }
            }

            let mut created = 0;
            for id in pending {
                if resolved.contains_key(&id) {
                    continue;
                }
                let record = store.create_record(entity_name)?;
                store.set_field(&record, id_field, FieldValue::Value(id.clone()))?;
                resolved.insert(id, record);
                created += 1;
            }

            self.stats.found += found;
            self.stats.created += created;
            debug!(entity = %entity_name, found, created, "resolved records");
        }
        Ok(())
    }

    /// Record resolved for `(entity, id)`.
    ///
    /// # Errors
    ///
    /// `SyncError::Unresolved` if the pair was never registered and fetched.
    pub fn object(&self, entity: &str, id: &NativeValue) -> Result<&R, SyncError> {
        self.resolved
            .get(entity)
            .and_then(|records| records.get(id))
            .ok_or_else(|| SyncError::Unresolved {
                entity: entity.to_string(),
                id: id.to_string(),
            })
    }

    /// Records resolved for several identifiers, in the given order.
    ///
    /// # Errors
    ///
    /// `SyncError::Unresolved` for the first identifier that was not fetched.
    pub fn objects<'i>(
        &self,
        entity: &str,
        ids: impl IntoIterator<Item = &'i NativeValue>,
    ) -> Result<Vec<R>, SyncError> {
        ids.into_iter()
            .map(|id| self.object(entity, id).cloned())
            .collect()
    }

    pub fn stats(&self) -> ResolveStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::{IdCollection, RelationshipChange, RelationshipTarget};
    use crate::error::ErrorKind;
    use crate::model::{AttributeModel, EntityModel, ModelDescription, RelationshipModel};
    use crate::registry::RegistryOptions;
    use crate::store::MemoryStore;
    use crate::types::ScalarKind;

    fn registry() -> SchemaRegistry {
        let model = ModelDescription::new()
            .entity(
                EntityModel::new("Pet")
                    .attribute(AttributeModel::new("id", ScalarKind::String))
                    .relationship(RelationshipModel::to_many("toys", "Toy")),
            )
            .entity(EntityModel::new("Toy").attribute(AttributeModel::new("id", ScalarKind::String)));
        SchemaRegistry::new(&model, RegistryOptions::default()).unwrap()
    }

    fn pet(id: &str, toys: &[&str]) -> ChangeSet {
        let mut changeset = ChangeSet::new("Pet", Some(id.into()));
        changeset.relationships.insert(
            "toys".to_string(),
            RelationshipChange {
                target: "Toy".to_string(),
                value: RelationshipTarget::Many(IdCollection::unordered(
                    toys.iter().map(|t| NativeValue::from(*t)),
                )),
            },
        );
        changeset
    }

    #[test]
    fn one_fetch_per_entity() {
        let registry = registry();
        let mut store = MemoryStore::new();
        let mut resolver = BatchResolver::new();

        let changesets = vec![pet("1", &["a", "b"]), pet("2", &["b", "c"]), pet("3", &[])];
        resolver.compute_required(&changesets).unwrap();
        resolver.fetch(&registry, &mut store).unwrap();

        assert_eq!(store.stats().fetches["Pet"], 1);
        assert_eq!(store.stats().fetches["Toy"], 1);
        assert_eq!(resolver.stats().created, 6);
        assert!(resolver.object("Toy", &"c".into()).is_ok());
        assert_eq!(
            resolver
                .objects("Toy", &[NativeValue::from("a"), NativeValue::from("b")])
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn existing_records_are_reused() {
        let registry = registry();
        let mut store = MemoryStore::new();
        let existing = store.create_record("Toy").unwrap();
        store
            .set_field(&existing, "id", FieldValue::Value("a".into()))
            .unwrap();

        let mut resolver = BatchResolver::new();
        resolver.compute_required(&[pet("1", &["a"])]).unwrap();
        resolver.fetch(&registry, &mut store).unwrap();

        assert_eq!(*resolver.object("Toy", &"a".into()).unwrap(), existing);
        assert_eq!(resolver.stats().found, 1);
        assert_eq!(resolver.stats().created, 1);
    }

    #[test]
    fn second_fetch_only_queries_new_ids() {
        let registry = registry();
        let mut store = MemoryStore::new();
        let mut resolver = BatchResolver::new();

        resolver.compute_required(&[pet("1", &[])]).unwrap();
        resolver.fetch(&registry, &mut store).unwrap();
        resolver.fetch(&registry, &mut store).unwrap();
        assert_eq!(store.stats().total_fetches(), 1);
    }

    #[test]
    fn missing_identifier_is_rejected() {
        let mut resolver: BatchResolver<crate::store::RecordRef> = BatchResolver::new();
        let err = resolver
            .compute_required(&[ChangeSet::new("Pet", None)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingIdentifier);
    }

    #[test]
    fn lookups_before_fetch_fail() {
        let mut resolver: BatchResolver<crate::store::RecordRef> = BatchResolver::new();
        resolver.require("Pet", &"1".into());
        let err = resolver.object("Pet", &"1".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    /// Hands out one record whose identifier field holds a relation.
    #[derive(Debug, Default)]
    struct MisshapedStore;

    impl Store for MisshapedStore {
        type Record = u32;

        fn fetch_by_ids(
            &mut self,
            _entity: &str,
            _id_field: &str,
            _ids: &[NativeValue],
        ) -> Result<Vec<u32>, crate::error::StoreError> {
            Ok(vec![7])
        }

        fn create_record(&mut self, _entity: &str) -> Result<u32, crate::error::StoreError> {
            Ok(8)
        }

        fn get_field(
            &self,
            _record: &u32,
            _field: &str,
        ) -> Result<FieldValue<u32>, crate::error::StoreError> {
            Ok(FieldValue::Many(vec![1, 2]))
        }

        fn set_field(
            &mut self,
            _record: &u32,
            _field: &str,
            _value: FieldValue<u32>,
        ) -> Result<(), crate::error::StoreError> {
            Ok(())
        }

        fn entity_name(&self, _record: &u32) -> Result<String, crate::error::StoreError> {
            Ok("Pet".to_string())
        }
    }

    #[test]
    fn non_scalar_identifier_in_store() {
        let registry = registry();
        let mut store = MisshapedStore;
        let mut resolver = BatchResolver::new();
        resolver.require("Pet", &"1".into());

        let err = resolver.fetch(&registry, &mut store).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("Pet.id"));
        assert!(err.to_string().contains("Many([1, 2])"));
    }

    #[test]
    fn duplicate_records_in_store() {
        let registry = registry();
        let mut store = MemoryStore::new();
        for _ in 0..2 {
            let record = store.create_record("Pet").unwrap();
            store
                .set_field(&record, "id", FieldValue::Value("1".into()))
                .unwrap();
        }
        let mut resolver = BatchResolver::new();
        resolver.require("Pet", &"1".into());
        let err = resolver.fetch(&registry, &mut store).unwrap_err();
        assert!(matches!(err, SyncError::DuplicateRecord { .. }));
    }
}
