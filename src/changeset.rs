//! Validated, schema-typed form of one resource.

use std::collections::{BTreeMap, HashSet};

use crate::types::NativeValue;

/// Result of deserializing one resource against its entity descriptor.
///
/// Attributes and relationships absent from the wire payload are absent from
/// the maps. An attribute present as `null` maps to `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Local entity name.
    pub entity: String,
    pub id: Option<NativeValue>,
    pub attributes: BTreeMap<String, Option<NativeValue>>,
    pub relationships: BTreeMap<String, RelationshipChange>,
}

impl ChangeSet {
    pub fn new(entity: impl Into<String>, id: Option<NativeValue>) -> Self {
        Self {
            entity: entity.into(),
            id,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }
}

/// Validated relationship payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipChange {
    /// Local name of the target entity.
    pub target: String,
    pub value: RelationshipTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipTarget {
    /// No related record (to-one only).
    None,
    One(NativeValue),
    Many(IdCollection),
}

impl RelationshipTarget {
    /// Every identifier referenced by this value.
    pub fn ids(&self) -> Vec<&NativeValue> {
        match self {
            RelationshipTarget::None => Vec::new(),
            RelationshipTarget::One(id) => vec![id],
            RelationshipTarget::Many(ids) => ids.iter().collect(),
        }
    }
}

/// Identifiers of a to-many relationship.
///
/// Both variants hold unique identifiers in wire order. Unordered collections
/// compare as sets.
#[derive(Debug, Clone, Eq)]
pub enum IdCollection {
    Ordered(Vec<NativeValue>),
    Unordered(Vec<NativeValue>),
}

impl IdCollection {
    /// Ordered collection; duplicates removed, first occurrence wins.
    pub fn ordered(ids: impl IntoIterator<Item = NativeValue>) -> Self {
        IdCollection::Ordered(unique(ids))
    }

    pub fn unordered(ids: impl IntoIterator<Item = NativeValue>) -> Self {
        IdCollection::Unordered(unique(ids))
    }

    pub fn as_slice(&self) -> &[NativeValue] {
        match self {
            IdCollection::Ordered(ids) | IdCollection::Unordered(ids) => ids,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NativeValue> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Whether `current` holds the same identifiers, in order if this
    /// collection is ordered.
    pub fn matches(&self, current: &[NativeValue]) -> bool {
        match self {
            IdCollection::Ordered(ids) => ids.as_slice() == current,
            IdCollection::Unordered(ids) => {
                let current: HashSet<&NativeValue> = current.iter().collect();
                current.len() == ids.len() && ids.iter().all(|id| current.contains(id))
            }
        }
    }
}

impl PartialEq for IdCollection {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IdCollection::Ordered(a), IdCollection::Ordered(b)) => a == b,
            (IdCollection::Unordered(_), IdCollection::Unordered(b)) => self.matches(b),
            _ => false,
        }
    }
}

fn unique(ids: impl IntoIterator<Item = NativeValue>) -> Vec<NativeValue> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<NativeValue> {
        values.iter().map(|v| NativeValue::from(*v)).collect()
    }

    #[test]
    fn ordered_drops_duplicates() {
        let collection = IdCollection::ordered(ids(&["b", "a", "b", "c"]));
        assert_eq!(collection, IdCollection::Ordered(ids(&["b", "a", "c"])));
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn ordered_match_is_sequence_equality() {
        let collection = IdCollection::ordered(ids(&["a", "b"]));
        assert!(collection.matches(&ids(&["a", "b"])));
        assert!(!collection.matches(&ids(&["b", "a"])));
        assert!(!collection.matches(&ids(&["a"])));
    }

    #[test]
    fn unordered_match_is_set_equality() {
        let collection = IdCollection::unordered(ids(&["a", "b"]));
        assert!(collection.matches(&ids(&["b", "a"])));
        assert!(!collection.matches(&ids(&["a", "b", "c"])));
        assert!(!collection.matches(&ids(&["a", "a"])));
        assert_eq!(collection, IdCollection::unordered(ids(&["b", "a", "a"])));
    }

    #[test]
    fn target_ids() {
        assert!(RelationshipTarget::None.ids().is_empty());
        let many = RelationshipTarget::Many(IdCollection::ordered(ids(&["x", "y"])));
        assert_eq!(many.ids().len(), 2);
    }
}
