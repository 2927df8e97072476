//! The iteration aggregate
//!
//! An [`Iteration`] is the live, in-memory cache of one versioned working data set: its
//! things, binary relationships, reference data (categories, rules) and the domains of
//! expertise of the model. Things are held behind `Arc` so that read models can keep
//! cheap references to them while the cache is swapped copy-on-write.

use super::{BinaryRelationship, BinaryRelationshipRule, Category, CategoryLibrary, Thing};
use crate::commands::{TransactionError, TransactionResult};
use crate::value_objects::{ClassKind, IterationId, ThingId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An organizational unit owning things
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOfExpertise {
    /// Unique identifier of the domain
    pub id: ThingId,
    /// Human-readable name
    pub name: String,
    /// Short-name
    pub short_name: String,
    /// Whether the domain is flagged deprecated
    #[serde(default)]
    pub is_deprecated: bool,
}

impl DomainOfExpertise {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            id: ThingId::new(),
            name: name.into(),
            short_name: short_name.into(),
            is_deprecated: false,
        }
    }
}

/// Serialized form of an iteration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IterationData {
    #[serde(default)]
    pub id: Option<IterationId>,
    #[serde(default)]
    pub things: Vec<Thing>,
    #[serde(default)]
    pub relationships: Vec<BinaryRelationship>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub rules: Vec<BinaryRelationshipRule>,
    #[serde(default)]
    pub domains: Vec<DomainOfExpertise>,
    /// Domain the current user is working as
    #[serde(default)]
    pub active_domain: Option<ThingId>,
}

/// The live cache of one iteration
#[derive(Debug, Clone)]
pub struct Iteration {
    id: IterationId,
    things: IndexMap<ThingId, Arc<Thing>>,
    relationships: IndexMap<ThingId, Arc<BinaryRelationship>>,
    categories: Arc<CategoryLibrary>,
    rules: IndexMap<ThingId, Arc<BinaryRelationshipRule>>,
    domains: IndexMap<ThingId, DomainOfExpertise>,
    active_domain: Option<ThingId>,
}

impl Iteration {
    /// Create a new empty iteration
    pub fn new(id: IterationId) -> Self {
        Self {
            id,
            things: IndexMap::new(),
            relationships: IndexMap::new(),
            categories: Arc::new(CategoryLibrary::default()),
            rules: IndexMap::new(),
            domains: IndexMap::new(),
            active_domain: None,
        }
    }

    /// Build an iteration from its serialized form
    pub fn from_data(data: IterationData) -> Self {
        let mut iteration = Self::new(data.id.unwrap_or_default());
        iteration.things = data.things.into_iter().map(|t| (t.id, Arc::new(t))).collect();
        iteration.relationships = data
            .relationships
            .into_iter()
            .map(|r| (r.id, Arc::new(r)))
            .collect();
        iteration.categories = Arc::new(CategoryLibrary::new(data.categories));
        iteration.rules = data.rules.into_iter().map(|r| (r.id, Arc::new(r))).collect();
        iteration.domains = data.domains.into_iter().map(|d| (d.id, d)).collect();
        iteration.active_domain = data.active_domain;
        iteration
    }

    pub fn id(&self) -> IterationId {
        self.id
    }

    // Things

    pub fn thing(&self, id: &ThingId) -> Option<Arc<Thing>> {
        self.things.get(id).cloned()
    }

    /// All things whose class kind is one of `kinds`, in insertion order
    pub fn things_of_kinds(&self, kinds: &[ClassKind]) -> Vec<Arc<Thing>> {
        self.things
            .values()
            .filter(|t| kinds.contains(&t.class_kind))
            .cloned()
            .collect()
    }

    pub fn add_thing(&mut self, thing: Thing) -> TransactionResult<()> {
        if self.things.contains_key(&thing.id) {
            return Err(TransactionError::AlreadyExists(thing.id));
        }
        self.things.insert(thing.id, Arc::new(thing));
        Ok(())
    }

    /// Replace a thing; the stored revision must match the incoming one
    pub fn update_thing(&mut self, mut thing: Thing) -> TransactionResult<()> {
        let current = self
            .things
            .get(&thing.id)
            .ok_or(TransactionError::NotFound(thing.id))?;

        if current.revision != thing.revision {
            return Err(TransactionError::ConflictingModification {
                id: thing.id,
                expected: thing.revision,
                found: current.revision,
            });
        }

        thing.revision += 1;
        self.things.insert(thing.id, Arc::new(thing));
        Ok(())
    }

    pub fn remove_thing(&mut self, id: &ThingId) -> TransactionResult<Arc<Thing>> {
        self.things
            .shift_remove(id)
            .ok_or(TransactionError::NotFound(*id))
    }

    // Relationships

    pub fn relationship(&self, id: &ThingId) -> Option<Arc<BinaryRelationship>> {
        self.relationships.get(id).cloned()
    }

    /// All relationships tagged with `category`, in insertion order
    pub fn relationships_in_category(&self, category: &ThingId) -> Vec<Arc<BinaryRelationship>> {
        self.relationships
            .values()
            .filter(|r| r.is_in_category(category))
            .cloned()
            .collect()
    }

    pub fn add_relationship(&mut self, relationship: BinaryRelationship) -> TransactionResult<()> {
        if self.relationships.contains_key(&relationship.id) {
            return Err(TransactionError::AlreadyExists(relationship.id));
        }
        if relationship.source == relationship.target {
            return Err(TransactionError::Invalid(format!(
                "relationship {} links {} to itself",
                relationship.id, relationship.source
            )));
        }
        for endpoint in [relationship.source, relationship.target] {
            if !self.things.contains_key(&endpoint) {
                return Err(TransactionError::NotFound(endpoint));
            }
        }
        self.relationships.insert(relationship.id, Arc::new(relationship));
        Ok(())
    }

    /// Replace a relationship; the stored revision must match the incoming one
    pub fn update_relationship(&mut self, mut relationship: BinaryRelationship) -> TransactionResult<()> {
        let current = self
            .relationships
            .get(&relationship.id)
            .ok_or(TransactionError::NotFound(relationship.id))?;

        if current.revision != relationship.revision {
            return Err(TransactionError::ConflictingModification {
                id: relationship.id,
                expected: relationship.revision,
                found: current.revision,
            });
        }

        relationship.revision += 1;
        self.relationships.insert(relationship.id, Arc::new(relationship));
        Ok(())
    }

    pub fn remove_relationship(&mut self, id: &ThingId) -> TransactionResult<Arc<BinaryRelationship>> {
        self.relationships
            .shift_remove(id)
            .ok_or(TransactionError::NotFound(*id))
    }

    // Reference data

    pub fn categories(&self) -> Arc<CategoryLibrary> {
        Arc::clone(&self.categories)
    }

    /// Add or replace a category, rebuilding the hierarchy
    pub fn upsert_category(&mut self, category: Category) {
        let mut categories: IndexMap<ThingId, Category> =
            self.categories.iter().map(|c| (c.id, c.clone())).collect();
        categories.insert(category.id, category);
        self.categories = Arc::new(CategoryLibrary::new(categories.into_values()));
    }

    pub fn rules(&self) -> Vec<Arc<BinaryRelationshipRule>> {
        self.rules.values().cloned().collect()
    }

    pub fn upsert_rule(&mut self, rule: BinaryRelationshipRule) {
        self.rules.insert(rule.id, Arc::new(rule));
    }

    pub fn remove_rule(&mut self, id: &ThingId) -> TransactionResult<Arc<BinaryRelationshipRule>> {
        self.rules.shift_remove(id).ok_or(TransactionError::NotFound(*id))
    }

    // Domains of expertise

    pub fn domains(&self) -> Vec<DomainOfExpertise> {
        self.domains.values().cloned().collect()
    }

    pub fn add_domain(&mut self, domain: DomainOfExpertise) {
        self.domains.insert(domain.id, domain);
    }

    pub fn active_domain(&self) -> Option<ThingId> {
        self.active_domain
    }

    pub fn set_active_domain(&mut self, domain: Option<ThingId>) {
        self.active_domain = domain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str) -> Thing {
        Thing::new(ClassKind::ElementDefinition, name, name)
    }

    #[test]
    fn test_things_of_kinds_keeps_insertion_order() {
        let mut iteration = Iteration::new(IterationId::new());
        let a = element("a");
        let b = element("b");
        let r = Thing::new(ClassKind::Requirement, "r", "r");
        let (a_id, b_id) = (a.id, b.id);

        iteration.add_thing(a).unwrap();
        iteration.add_thing(r).unwrap();
        iteration.add_thing(b).unwrap();

        let ids: Vec<ThingId> = iteration
            .things_of_kinds(&[ClassKind::ElementDefinition])
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![a_id, b_id]);
    }

    #[test]
    fn test_duplicate_thing_is_rejected() {
        let mut iteration = Iteration::new(IterationId::new());
        let a = element("a");
        iteration.add_thing(a.clone()).unwrap();

        assert_eq!(iteration.add_thing(a.clone()), Err(TransactionError::AlreadyExists(a.id)));
    }

    #[test]
    fn test_relationship_endpoints_must_exist() {
        let mut iteration = Iteration::new(IterationId::new());
        let a = element("a");
        let missing = ThingId::new();
        let a_id = a.id;
        iteration.add_thing(a).unwrap();

        let relationship = BinaryRelationship::new(a_id, missing, ThingId::new());
        assert_eq!(
            iteration.add_relationship(relationship),
            Err(TransactionError::NotFound(missing))
        );
    }

    #[test]
    fn test_update_detects_stale_revision() {
        let mut iteration = Iteration::new(IterationId::new());
        let a = element("a");
        iteration.add_thing(a.clone()).unwrap();

        let mut renamed = a.clone();
        renamed.name = "renamed".to_string();
        iteration.update_thing(renamed).unwrap();
        assert_eq!(iteration.thing(&a.id).unwrap().revision, 1);

        let result = iteration.update_thing(a.clone());
        assert!(matches!(
            result,
            Err(TransactionError::ConflictingModification { expected: 0, found: 1, .. })
        ));
    }

    #[test]
    fn test_relationships_in_category() {
        let mut iteration = Iteration::new(IterationId::new());
        let a = element("a");
        let b = element("b");
        let (a_id, b_id) = (a.id, b.id);
        iteration.add_thing(a).unwrap();
        iteration.add_thing(b).unwrap();

        let category = ThingId::new();
        iteration
            .add_relationship(BinaryRelationship::new(a_id, b_id, category))
            .unwrap();
        iteration
            .add_relationship(BinaryRelationship::new(b_id, a_id, ThingId::new()))
            .unwrap();

        assert_eq!(iteration.relationships_in_category(&category).len(), 1);
    }

    #[test]
    fn test_upsert_category_rebuilds_hierarchy() {
        let mut iteration = Iteration::new(IterationId::new());
        let parent = Category::new("parent", "p");
        let child = Category::new("child", "c").with_super_categories([parent.id]);
        let parent_id = parent.id;

        iteration.upsert_category(parent);
        assert!(iteration.categories().all_derived(&parent_id).is_empty());

        iteration.upsert_category(child);
        assert_eq!(iteration.categories().all_derived(&parent_id).len(), 1);
    }
}
