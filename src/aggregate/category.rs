//! Categories and the category hierarchy
//!
//! Categories form a directed acyclic hierarchy through their super-categories. The
//! [`CategoryLibrary`] keeps that hierarchy as a petgraph graph so that the derived
//! (sub-)categories of any category can be expanded when filtering an axis.

use crate::value_objects::{ClassKind, ThingId};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A classification tag attachable to things
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier of the category
    pub id: ThingId,
    /// Human-readable name
    pub name: String,
    /// Short-name
    pub short_name: String,
    /// Direct super-categories
    #[serde(default)]
    pub super_categories: Vec<ThingId>,
    /// Class kinds the category may be applied to
    #[serde(default)]
    pub permissible_classes: Vec<ClassKind>,
    /// Whether the category is flagged deprecated
    #[serde(default)]
    pub is_deprecated: bool,
}

impl Category {
    /// Create a new category with a fresh identifier
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            id: ThingId::new(),
            name: name.into(),
            short_name: short_name.into(),
            super_categories: Vec::new(),
            permissible_classes: Vec::new(),
            is_deprecated: false,
        }
    }

    pub fn with_super_categories(mut self, supers: impl IntoIterator<Item = ThingId>) -> Self {
        self.super_categories = supers.into_iter().collect();
        self
    }

    pub fn with_permissible_classes(mut self, kinds: impl IntoIterator<Item = ClassKind>) -> Self {
        self.permissible_classes = kinds.into_iter().collect();
        self
    }

    /// Whether the category may be applied to things of the given kind
    pub fn permits(&self, kind: ClassKind) -> bool {
        self.permissible_classes.contains(&kind)
    }
}

/// The set of categories available in an iteration, with their hierarchy
#[derive(Debug, Clone, Default)]
pub struct CategoryLibrary {
    categories: IndexMap<ThingId, Category>,
    /// Edges point from a super-category to its sub-categories
    hierarchy: DiGraph<ThingId, ()>,
    nodes: HashMap<ThingId, NodeIndex>,
}

impl CategoryLibrary {
    /// Build a library from a set of categories
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let categories: IndexMap<ThingId, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();

        let mut hierarchy = DiGraph::new();
        let mut nodes = HashMap::new();

        for id in categories.keys() {
            nodes.insert(*id, hierarchy.add_node(*id));
        }

        for category in categories.values() {
            let sub = nodes[&category.id];
            for super_id in &category.super_categories {
                // super-categories defined in another library are not expandable here
                if let Some(&sup) = nodes.get(super_id) {
                    hierarchy.add_edge(sup, sub, ());
                }
            }
        }

        Self {
            categories,
            hierarchy,
            nodes,
        }
    }

    /// Get a category by ID
    pub fn get(&self, id: &ThingId) -> Option<&Category> {
        self.categories.get(id)
    }

    /// All categories, in definition order
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// All categories derived from the given one, transitively, excluding itself
    pub fn all_derived(&self, id: &ThingId) -> Vec<&Category> {
        let Some(&start) = self.nodes.get(id) else {
            return Vec::new();
        };

        let mut derived = Vec::new();
        let mut dfs = Dfs::new(&self.hierarchy, start);
        while let Some(node) = dfs.next(&self.hierarchy) {
            if node == start {
                continue;
            }
            if let Some(category) = self.categories.get(&self.hierarchy[node]) {
                derived.push(category);
            }
        }

        derived.sort_by(|a, b| a.name.cmp(&b.name));
        derived
    }

    /// The category itself, plus its derived categories when `include_subcategories` is set
    pub fn expand(&self, id: &ThingId, include_subcategories: bool) -> HashSet<ThingId> {
        let mut expanded = HashSet::from([*id]);
        if include_subcategories {
            expanded.extend(self.all_derived(id).into_iter().map(|c| c.id));
        }
        expanded
    }

    /// Categories applicable to the given kind, sorted by name
    pub fn applicable_to(&self, kind: ClassKind) -> Vec<&Category> {
        let mut applicable: Vec<&Category> =
            self.categories.values().filter(|c| c.permits(kind)).collect();
        applicable.sort_by(|a, b| a.name.cmp(&b.name));
        applicable
    }

    /// Categories applicable to at least one of the given kinds, sorted by name
    pub fn applicable_to_any(&self, kinds: &[ClassKind]) -> Vec<&Category> {
        let mut applicable: Vec<&Category> = self
            .categories
            .values()
            .filter(|c| kinds.iter().any(|k| c.permits(*k)))
            .collect();
        applicable.sort_by(|a, b| a.name.cmp(&b.name));
        applicable
    }
}
