//! Schema binding for one graph edge.

use crate::changeset::{IdCollection, RelationshipChange, RelationshipTarget};
use crate::document::{Linkage, RelationshipRef};
use crate::entity::EntityDescriptor;
use crate::error::SyncError;
use crate::registry::SchemaRegistry;

/// One relationship of an entity.
///
/// Both the owning entity and the target entity are held by name and looked
/// up through the [`SchemaRegistry`] when needed.
#[derive(Debug, Clone)]
pub struct RelationshipDescriptor {
    entity: String,
    name: String,
    remote_name: String,
    target: String,
    to_many: bool,
    ordered: bool,
    optional: bool,
}

impl RelationshipDescriptor {
    pub(crate) fn new(
        entity: impl Into<String>,
        name: impl Into<String>,
        remote_name: impl Into<String>,
        target: impl Into<String>,
        to_many: bool,
        ordered: bool,
        optional: bool,
    ) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
            remote_name: remote_name.into(),
            target: target.into(),
            to_many,
            ordered: to_many && ordered,
            optional,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Local name of the target entity.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_to_many(&self) -> bool {
        self.to_many
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn path(&self) -> String {
        format!("{}.{}", self.entity, self.name)
    }

    /// Resolve the target entity descriptor.
    ///
    /// # Errors
    ///
    /// `SyncError::UnknownEntity` if the registry has no such entity.
    pub fn target_entity<'r>(
        &self,
        registry: &'r SchemaRegistry,
    ) -> Result<&'r EntityDescriptor, SyncError> {
        registry
            .entity(&self.target)
            .ok_or_else(|| SyncError::UnknownEntity {
                entity: self.target.clone(),
            })
    }

    /// Convert wire linkage into a validated relationship change.
    ///
    /// `null` linkage on a to-many relationship yields an empty collection,
    /// on a to-one relationship it yields [`RelationshipTarget::None`].
    ///
    /// # Errors
    ///
    /// `SyncError::WrongEntityInRelationship` for a foreign target type or a
    /// cardinality mismatch, `SyncError::NullInNonOptional` for `null` on a
    /// required relationship, and identifier codec failures.
    pub fn deserialize(
        &self,
        registry: &SchemaRegistry,
        reference: &RelationshipRef,
    ) -> Result<RelationshipChange, SyncError> {
        let target = self.target_entity(registry)?;

        if let Some(found) = &reference.resource_type {
            if found != target.remote_name() {
                return Err(self.wrong_entity(format!(
                    "expected type '{}', found '{}'",
                    target.remote_name(),
                    found
                )));
            }
        }

        let identifier = target.identifier();
        let value = match (&reference.linkage, self.to_many) {
            (Linkage::Null, _) if !self.optional => {
                return Err(SyncError::NullInNonOptional {
                    path: self.path(),
                    kind: "relationship".to_string(),
                })
            }
            (Linkage::Null, true) => RelationshipTarget::Many(self.collection(Vec::new())),
            (Linkage::Null, false) => RelationshipTarget::None,
            (Linkage::ToOne(id), false) => {
                RelationshipTarget::One(identifier.deserialize_identifier(id)?)
            }
            (Linkage::ToMany(ids), true) => {
                let ids = ids
                    .iter()
                    .map(|id| identifier.deserialize_identifier(id))
                    .collect::<Result<Vec<_>, _>>()?;
                RelationshipTarget::Many(self.collection(ids))
            }
            (Linkage::ToOne(_), true) => {
                return Err(self.wrong_entity("expected to-many linkage, found to-one"))
            }
            (Linkage::ToMany(_), false) => {
                return Err(self.wrong_entity("expected to-one linkage, found to-many"))
            }
        };

        Ok(RelationshipChange {
            target: self.target.clone(),
            value,
        })
    }

    /// Convert a relationship change back into wire linkage.
    ///
    /// # Errors
    ///
    /// `SyncError::WrongEntityInRelationship` when the value shape does not
    /// match this relationship's cardinality, and identifier codec failures.
    pub fn serialize(
        &self,
        registry: &SchemaRegistry,
        change: &RelationshipChange,
    ) -> Result<RelationshipRef, SyncError> {
        let target = self.target_entity(registry)?;
        let identifier = target.identifier();

        let linkage = match (&change.value, self.to_many) {
            (RelationshipTarget::None, _) => {
                return Ok(RelationshipRef {
                    resource_type: None,
                    linkage: Linkage::Null,
                })
            }
            (RelationshipTarget::One(id), false) => {
                Linkage::ToOne(identifier.serialize_identifier(id)?)
            }
            (RelationshipTarget::Many(ids), true) => Linkage::ToMany(
                ids.iter()
                    .map(|id| identifier.serialize_identifier(id))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (RelationshipTarget::One(_), true) => {
                return Err(self.wrong_entity("to-one value for a to-many relationship"))
            }
            (RelationshipTarget::Many(_), false) => {
                return Err(self.wrong_entity("to-many value for a to-one relationship"))
            }
        };

        Ok(RelationshipRef {
            resource_type: Some(target.remote_name().to_string()),
            linkage,
        })
    }

    fn collection(&self, ids: Vec<crate::types::NativeValue>) -> IdCollection {
        if self.ordered {
            IdCollection::ordered(ids)
        } else {
            IdCollection::unordered(ids)
        }
    }

    fn wrong_entity(&self, message: impl Into<String>) -> SyncError {
        SyncError::WrongEntityInRelationship {
            path: self.path(),
            message: message.into(),
        }
    }
}
