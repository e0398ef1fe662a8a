//! Persistent store collaborator.
//!
//! The crate never owns records. It reads and writes them through [`Store`],
//! which a persistence layer implements. [`MemoryStore`] is a reference
//! implementation used by the command line tool and the tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::StoreError;
use crate::model::ModelDescription;
use crate::types::NativeValue;

/// Value of one record field as exchanged with the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<R> {
    Null,
    /// Scalar attribute value.
    Value(NativeValue),
    /// Related record of a to-one relationship.
    One(R),
    /// Related records of a to-many relationship.
    Many(Vec<R>),
}

/// Operations the sync engine needs from a persistent store.
///
/// Calls are synchronous. Transactions are the caller's concern: wrap a whole
/// update in one if all-or-nothing semantics are required.
pub trait Store {
    /// Handle to one record.
    type Record: Clone + fmt::Debug;

    /// Every record of `entity` whose `id_field` equals one of `ids`.
    fn fetch_by_ids(
        &mut self,
        entity: &str,
        id_field: &str,
        ids: &[NativeValue],
    ) -> Result<Vec<Self::Record>, StoreError>;

    /// Insert a new, empty record of `entity`.
    fn create_record(&mut self, entity: &str) -> Result<Self::Record, StoreError>;

    fn get_field(
        &self,
        record: &Self::Record,
        field: &str,
    ) -> Result<FieldValue<Self::Record>, StoreError>;

    fn set_field(
        &mut self,
        record: &Self::Record,
        field: &str,
        value: FieldValue<Self::Record>,
    ) -> Result<(), StoreError>;

    /// Local entity name of a record.
    fn entity_name(&self, record: &Self::Record) -> Result<String, StoreError>;
}

/// Handle to a record in a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordRef(usize);

/// Operation counters of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// `fetch_by_ids` calls per entity.
    pub fetches: BTreeMap<String, usize>,
    pub created: usize,
    /// `set_field` calls.
    pub writes: usize,
}

impl StoreStats {
    pub fn total_fetches(&self) -> usize {
        self.fetches.values().sum()
    }
}

#[derive(Debug, Clone)]
struct StoredRecord {
    entity: String,
    fields: BTreeMap<String, FieldValue<RecordRef>>,
}

/// In-memory [`Store`].
///
/// Built with [`MemoryStore::for_model`], it rejects entities and fields the
/// model does not declare.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<StoredRecord>,
    schema: Option<BTreeMap<String, BTreeSet<String>>>,
    stats: StoreStats,
}

impl MemoryStore {
    /// A store that accepts any entity and field name.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store restricted to the entities and fields of `model`.
    pub fn for_model(model: &ModelDescription) -> Self {
        let schema = model
            .entities
            .iter()
            .map(|entity| {
                let fields = entity
                    .attributes
                    .iter()
                    .map(|a| a.name.clone())
                    .chain(entity.relationships.iter().map(|r| r.name.clone()))
                    .collect();
                (entity.name.clone(), fields)
            })
            .collect();
        Self {
            schema: Some(schema),
            ..Self::default()
        }
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = StoreStats::default();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of `entity` in creation order.
    pub fn records(&self, entity: &str) -> Vec<RecordRef> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.entity == entity)
            .map(|(i, _)| RecordRef(i))
            .collect()
    }

    /// Every record in creation order.
    pub fn all_records(&self) -> Vec<RecordRef> {
        (0..self.records.len()).map(RecordRef).collect()
    }

    fn check_field(&self, entity: &str, field: &str) -> Result<(), StoreError> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        match schema.get(entity) {
            None => Err(StoreError::UnknownEntity {
                entity: entity.to_string(),
            }),
            Some(fields) if !fields.contains(field) => Err(StoreError::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn record(&self, record: &RecordRef) -> Result<&StoredRecord, StoreError> {
        self.records
            .get(record.0)
            .ok_or_else(|| StoreError::InvalidRecord {
                record: format!("{:?}", record),
            })
    }
}

impl Store for MemoryStore {
    type Record = RecordRef;

    fn fetch_by_ids(
        &mut self,
        entity: &str,
        id_field: &str,
        ids: &[NativeValue],
    ) -> Result<Vec<RecordRef>, StoreError> {
        self.check_field(entity, id_field)?;
        *self.stats.fetches.entry(entity.to_string()).or_default() += 1;

        let wanted: HashSet<&NativeValue> = ids.iter().collect();
        Ok(self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.entity == entity)
            .filter(|(_, r)| {
                matches!(r.fields.get(id_field), Some(FieldValue::Value(id)) if wanted.contains(id))
            })
            .map(|(i, _)| RecordRef(i))
            .collect())
    }

    fn create_record(&mut self, entity: &str) -> Result<RecordRef, StoreError> {
        if let Some(schema) = &self.schema {
            if !schema.contains_key(entity) {
                return Err(StoreError::UnknownEntity {
                    entity: entity.to_string(),
                });
            }
        }
        self.records.push(StoredRecord {
            entity: entity.to_string(),
            fields: BTreeMap::new(),
        });
        self.stats.created += 1;
        Ok(RecordRef(self.records.len() - 1))
    }

    fn get_field(
        &self,
        record: &RecordRef,
        field: &str,
    ) -> Result<FieldValue<RecordRef>, StoreError> {
        let stored = self.record(record)?;
        self.check_field(&stored.entity, field)?;
        Ok(stored.fields.get(field).cloned().unwrap_or(FieldValue::Null))
    }

    fn set_field(
        &mut self,
        record: &RecordRef,
        field: &str,
        value: FieldValue<RecordRef>,
    ) -> Result<(), StoreError> {
        let entity = self.record(record)?.entity.clone();
        self.check_field(&entity, field)?;
        let references_valid = match &value {
            FieldValue::One(related) => related.0 < self.records.len(),
            FieldValue::Many(related) => related.iter().all(|r| r.0 < self.records.len()),
            _ => true,
        };
        if !references_valid {
            return Err(StoreError::InvalidRecord {
                record: format!("{:?}", value),
            });
        }

        let stored = &mut self.records[record.0];
        stored.fields.insert(field.to_string(), value);
        self.stats.writes += 1;
        Ok(())
    }

    fn entity_name(&self, record: &RecordRef) -> Result<String, StoreError> {
        Ok(self.record(record)?.entity.clone())
    }
}
