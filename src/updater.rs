//! Diff-and-apply of change sets onto store records.
//!
//! The engine runs in three steps: [`UpdateEngine::compute_required`],
//! [`UpdateEngine::fetch`] and [`UpdateEngine::apply`]. [`UpdateEngine::update`]
//! runs all three. A field is written only when its value differs from the
//! stored one, so applying the same change sets twice writes nothing the
//! second time.

use serde::Serialize;
use tracing::{instrument, trace};

use crate::changeset::{ChangeSet, IdCollection, RelationshipChange, RelationshipTarget};
use crate::entity::EntityDescriptor;
use crate::error::SyncError;
use crate::registry::SchemaRegistry;
use crate::resolver::BatchResolver;
use crate::store::{FieldValue, Store};
use crate::types::NativeValue;

/// Counters for one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    /// Change sets applied.
    pub resources: usize,
    pub fetches: usize,
    /// Placeholder records created by the resolver.
    pub created: usize,
    /// Field writes, excluding placeholder identifiers.
    pub writes: usize,
    /// Fields left untouched because the value was already current.
    pub unchanged: usize,
}

impl UpdateStats {
    /// Add another update's counters to these.
    pub fn merge(&mut self, other: &UpdateStats) {
        self.resources += other.resources;
        self.fetches += other.fetches;
        self.created += other.created;
        self.writes += other.writes;
        self.unchanged += other.unchanged;
    }
}

/// Records touched by an update, with its counters.
#[derive(Debug, Clone)]
pub struct UpdateResult<R> {
    /// One record per change set, in change set order.
    pub records: Vec<R>,
    pub stats: UpdateStats,
}

/// Applies change sets to a store with minimal writes.
pub struct UpdateEngine<'a, S: Store> {
    registry: &'a SchemaRegistry,
    store: &'a mut S,
    resolver: BatchResolver<S::Record>,
    stats: UpdateStats,
}

impl<'a, S: Store> UpdateEngine<'a, S> {
    pub fn new(registry: &'a SchemaRegistry, store: &'a mut S) -> Self {
        Self {
            registry,
            store,
            resolver: BatchResolver::new(),
            stats: UpdateStats::default(),
        }
    }

    /// Register every record the change sets touch.
    ///
    /// # Errors
    ///
    /// `SyncError::NullIdentifier` for a change set without an identifier.
    pub fn compute_required(&mut self, changesets: &[ChangeSet]) -> Result<(), SyncError> {
        self.resolver.compute_required(changesets)
    }

    /// Fetch or create every registered record.
    ///
    /// # Errors
    ///
    /// Resolver and store failures.
    pub fn fetch(&mut self) -> Result<(), SyncError> {
        self.resolver.fetch(self.registry, &mut *self.store)
    }

    /// Apply change sets onto the resolved records.
    ///
    /// Must run after [`compute_required`](Self::compute_required) and
    /// [`fetch`](Self::fetch) over the same change sets. Stops at the first
    /// failure; records already written stay written.
    ///
    /// # Errors
    ///
    /// `SyncError::Unresolved` when a record was not fetched, and store
    /// failures.
    pub fn apply(&mut self, changesets: &[ChangeSet]) -> Result<Vec<S::Record>, SyncError> {
        let mut records = Vec::with_capacity(changesets.len());
        for changeset in changesets {
            records.push(self.apply_one(changeset)?);
        }
        Ok(records)
    }

    /// Run `compute_required`, `fetch` and `apply` in sequence.
    ///
    /// # Errors
    ///
    /// Any error of the three steps.
    #[instrument(skip_all, fields(changesets = changesets.len()))]
    pub fn update(mut self, changesets: &[ChangeSet]) -> Result<UpdateResult<S::Record>, SyncError> {
        self.compute_required(changesets)?;
        self.fetch()?;
        let records = self.apply(changesets)?;
        let stats = self.stats();
        trace!(?stats, "update finished");
        Ok(UpdateResult { records, stats })
    }

    pub fn stats(&self) -> UpdateStats {
        let resolved = self.resolver.stats();
        UpdateStats {
            fetches: resolved.fetches,
            created: resolved.created,
            ..self.stats
        }
    }

    fn apply_one(&mut self, changeset: &ChangeSet) -> Result<S::Record, SyncError> {
        let registry = self.registry;
        let entity = registry
            .entity(&changeset.entity)
            .ok_or_else(|| SyncError::UnknownEntity {
                entity: changeset.entity.clone(),
            })?;
        let Some(id) = &changeset.id else {
            return Err(SyncError::NullIdentifier {
                entity: changeset.entity.clone(),
            });
        };
        let record = self.resolver.object(&changeset.entity, id)?.clone();

        for (name, value) in &changeset.attributes {
            if entity.attribute(name).is_none() {
                return Err(self.unexpected(entity, name, "not an attribute of this entity".into()));
            }
            let current = self.scalar_field(entity, &record, name)?;
            if current.as_ref() == value.as_ref() {
                self.stats.unchanged += 1;
                continue;
            }
            let new_value = match value {
                Some(v) => FieldValue::Value(v.clone()),
                None => FieldValue::Null,
            };
            self.write(&record, entity, name, new_value)?;
        }

        for (name, change) in &changeset.relationships {
            self.apply_relationship(entity, &record, name, change)?;
        }

        self.stats.resources += 1;
        Ok(record)
    }

    fn apply_relationship(
        &mut self,
        entity: &EntityDescriptor,
        record: &S::Record,
        name: &str,
        change: &RelationshipChange,
    ) -> Result<(), SyncError> {
        if entity.relationship(name).is_none() {
            return Err(self.unexpected(entity, name, "not a relationship of this entity".into()));
        }
        let registry = self.registry;
        let target = registry
            .entity(&change.target)
            .ok_or_else(|| SyncError::UnknownEntity {
                entity: change.target.clone(),
            })?;
        let id_field = target.identifier().name();
        let current = self.store.get_field(record, name)?;

        let new_value = match &change.value {
            RelationshipTarget::None => {
                if matches!(current, FieldValue::Null) {
                    self.stats.unchanged += 1;
                    return Ok(());
                }
                FieldValue::Null
            }
            RelationshipTarget::One(id) => {
                if let FieldValue::One(related) = &current {
                    if self.related_id(related, &change.target, id_field)? == *id {
                        self.stats.unchanged += 1;
                        return Ok(());
                    }
                }
                FieldValue::One(self.resolver.object(&change.target, id)?.clone())
            }
            RelationshipTarget::Many(ids) => {
                let current_ids = match &current {
                    FieldValue::Null => Vec::new(),
                    FieldValue::Many(related) => related
                        .iter()
                        .map(|r| self.related_id(r, &change.target, id_field))
                        .collect::<Result<Vec<_>, _>>()?,
                    other => {
                        return Err(self.unexpected(entity, name, format!(
                            "expected related records, got {:?}",
                            other
                        )))
                    }
                };
                if ids.matches(&current_ids) {
                    self.stats.unchanged += 1;
                    return Ok(());
                }
                FieldValue::Many(self.related_records(&change.target, ids)?)
            }
        };

        self.write(record, entity, name, new_value)
    }

    fn scalar_field(
        &self,
        entity: &EntityDescriptor,
        record: &S::Record,
        name: &str,
    ) -> Result<Option<NativeValue>, SyncError> {
        match self.store.get_field(record, name)? {
            FieldValue::Null => Ok(None),
            FieldValue::Value(v) => Ok(Some(v)),
            other => Err(self.unexpected(
                entity,
                name,
                format!("expected a scalar value, got {:?}", other),
            )),
        }
    }

    fn related_id(
        &self,
        related: &S::Record,
        target: &str,
        id_field: &str,
    ) -> Result<NativeValue, SyncError> {
        match self.store.get_field(related, id_field)? {
            FieldValue::Value(id) => Ok(id),
            other => Err(SyncError::UnexpectedField {
                path: format!("{}.{}", target, id_field),
                message: format!("expected an identifier value, got {:?}", other),
            }),
        }
    }

    fn related_records(&self, target: &str, ids: &IdCollection) -> Result<Vec<S::Record>, SyncError> {
        self.resolver.objects(target, ids.iter())
    }

    fn write(
        &mut self,
        record: &S::Record,
        entity: &EntityDescriptor,
        name: &str,
        value: FieldValue<S::Record>,
    ) -> Result<(), SyncError> {
        trace!(entity = entity.name(), field = name, "write");
        self.store.set_field(record, name, value)?;
        self.stats.writes += 1;
        Ok(())
    }

    fn unexpected(&self, entity: &EntityDescriptor, name: &str, message: String) -> SyncError {
        SyncError::UnexpectedField {
            path: format!("{}.{}", entity.name(), name),
            message,
        }
    }
}
