//! Declarative description of the store schema.
//!
//! A [`ModelDescription`] is what the persistent store exposes about its
//! entities. It can be built in code or loaded from a JSON model file (see
//! [`crate::loader::load_model`]).

use serde::{Deserialize, Serialize};

use crate::types::ScalarKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub entities: Vec<EntityModel>,
}

impl ModelDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: EntityModel) -> Self {
        self.entities.push(entity);
        self
    }
}

/// One entity as declared by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityModel {
    pub name: String,
    /// Remote type name. Derived from `name` by the naming convention if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_name: Option<String>,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeModel>,
    #[serde(default)]
    pub relationships: Vec<RelationshipModel>,
}

impl EntityModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_name: None,
            ignore: false,
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = Some(remote_name.into());
        self
    }

    pub fn attribute(mut self, attribute: AttributeModel) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn relationship(mut self, relationship: RelationshipModel) -> Self {
        self.relationships.push(relationship);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeModel {
    pub name: String,
    pub kind: ScalarKind,
    #[serde(default = "default_true")]
    pub optional: bool,
    /// Marks the identifier attribute explicitly.
    #[serde(default)]
    pub remote_id: bool,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_name: Option<String>,
    /// Name of a codec in the registry's codec table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

impl AttributeModel {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: true,
            remote_id: false,
            ignore: false,
            remote_name: None,
            codec: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn remote_id(mut self) -> Self {
        self.remote_id = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = Some(remote_name.into());
        self
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipModel {
    pub name: String,
    /// Local name of the target entity.
    pub target: String,
    #[serde(default)]
    pub to_many: bool,
    #[serde(default)]
    pub ordered: bool,
    #[serde(default = "default_true")]
    pub optional: bool,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_name: Option<String>,
}

impl RelationshipModel {
    pub fn to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            to_many: false,
            ordered: false,
            optional: true,
            ignore: false,
            remote_name: None,
        }
    }

    pub fn to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            to_many: true,
            ..Self::to_one(name, target)
        }
    }

    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = Some(remote_name.into());
        self
    }
}

fn default_true() -> bool {
    true
}
