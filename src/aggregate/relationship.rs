//! Binary relationships and the rules governing them

use crate::value_objects::{ClassKind, ThingId};
use serde::{Deserialize, Serialize};

/// A directed link between two things
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRelationship {
    /// Unique identifier of the relationship
    pub id: ThingId,
    /// Thing the relationship starts from
    pub source: ThingId,
    /// Thing the relationship points to
    pub target: ThingId,
    /// Categories of the relationship; the relationship category of a rule ties it to that rule
    #[serde(default)]
    pub categories: Vec<ThingId>,
    /// Owning domain of expertise
    #[serde(default)]
    pub owner: Option<ThingId>,
    /// Revision number, bumped on every update
    #[serde(default)]
    pub revision: u32,
}

impl BinaryRelationship {
    /// Create a new relationship with a fresh identifier
    pub fn new(source: ThingId, target: ThingId, category: ThingId) -> Self {
        Self {
            id: ThingId::new(),
            source,
            target,
            categories: vec![category],
            owner: None,
            revision: 0,
        }
    }

    pub fn with_owner(mut self, owner: Option<ThingId>) -> Self {
        self.owner = owner;
        self
    }

    /// Whether the relationship is tagged with the given category
    pub fn is_in_category(&self, category: &ThingId) -> bool {
        self.categories.contains(category)
    }

    /// Whether the relationship links `a` and `b`, in either direction
    pub fn connects(&self, a: &ThingId, b: &ThingId) -> bool {
        (self.source == *a && self.target == *b) || (self.source == *b && self.target == *a)
    }

    /// Whether the given thing is one of the two endpoints
    pub fn touches(&self, id: &ThingId) -> bool {
        self.source == *id || self.target == *id
    }
}

/// Declares which kinds of things may be linked by relationships of a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRelationshipRule {
    /// Unique identifier of the rule
    pub id: ThingId,
    /// Human-readable name, used as the matrix title
    pub name: String,
    /// Short-name
    pub short_name: String,
    /// Category tagging the relationships governed by this rule
    pub relationship_category: ThingId,
    /// Kinds permitted as relationship source
    #[serde(default)]
    pub source_kinds: Vec<ClassKind>,
    /// Kinds permitted as relationship target
    #[serde(default)]
    pub target_kinds: Vec<ClassKind>,
    /// Label of the forward direction, e.g. "satisfies"
    pub forward_relationship_name: String,
    /// Label of the inverse direction, e.g. "is satisfied by"
    #[serde(default)]
    pub inverse_relationship_name: String,
    /// Whether the rule is flagged deprecated
    #[serde(default)]
    pub is_deprecated: bool,
}

impl BinaryRelationshipRule {
    /// Create a new rule with a fresh identifier
    pub fn new(
        name: impl Into<String>,
        relationship_category: ThingId,
        source_kinds: impl IntoIterator<Item = ClassKind>,
        target_kinds: impl IntoIterator<Item = ClassKind>,
        forward_relationship_name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: ThingId::new(),
            short_name: name.clone(),
            name,
            relationship_category,
            source_kinds: source_kinds.into_iter().collect(),
            target_kinds: target_kinds.into_iter().collect(),
            forward_relationship_name: forward_relationship_name.into(),
            inverse_relationship_name: String::new(),
            is_deprecated: false,
        }
    }

    pub fn with_inverse_name(mut self, inverse: impl Into<String>) -> Self {
        self.inverse_relationship_name = inverse.into();
        self
    }

    /// Whether both kinds are covered by the union of the permitted source and target kinds.
    ///
    /// Which axis plays source and which plays target is irrelevant.
    pub fn is_applicable_to(&self, a: ClassKind, b: ClassKind) -> bool {
        let permits = |kind: ClassKind| self.source_kinds.contains(&kind) || self.target_kinds.contains(&kind);
        permits(a) && permits(b)
    }
}
