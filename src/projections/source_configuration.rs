//! Source axis configuration
//!
//! Turns a class kind plus a category and owner selection into the ordered list of things
//! displayed along one axis of the matrix.

use super::{MatrixError, MatrixResult};
use crate::aggregate::{Category, CategoryLibrary, DomainOfExpertise, Thing};
use crate::settings::SourceConfigurationRecord;
use crate::value_objects::{Axis, CategoryBooleanOperatorKind, ClassKind, DisplayKind, SortOrder, ThingId};
use std::collections::HashSet;
use std::sync::Arc;

/// Category predicate derived from a selection.
///
/// Each selected category contributes one group: the category itself, plus its derived
/// categories when sub-categories are included. OR mode matches a thing intersecting any
/// group, AND mode requires an intersection with every group. No group passes everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    groups: Vec<HashSet<ThingId>>,
    operator: CategoryBooleanOperatorKind,
}

impl CategoryFilter {
    pub fn new(
        selected: &[ThingId],
        operator: CategoryBooleanOperatorKind,
        include_subcategories: bool,
        library: &CategoryLibrary,
    ) -> Self {
        let groups = selected
            .iter()
            .map(|id| library.expand(id, include_subcategories))
            .collect();
        Self { groups, operator }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every category id any group refers to
    pub fn all_categories(&self) -> HashSet<ThingId> {
        self.groups.iter().flatten().copied().collect()
    }

    pub fn matches(&self, memberships: &HashSet<ThingId>) -> bool {
        if self.groups.is_empty() {
            return true;
        }

        match self.operator {
            CategoryBooleanOperatorKind::Or => self.groups.iter().any(|g| !g.is_disjoint(memberships)),
            CategoryBooleanOperatorKind::And => self.groups.iter().all(|g| !g.is_disjoint(memberships)),
        }
    }
}

/// Categories a thing is a member of, including those of its definition for usages
pub fn memberships(thing: &Thing, definition_of: &dyn Fn(&ThingId) -> Option<Arc<Thing>>) -> HashSet<ThingId> {
    let mut categories: HashSet<ThingId> = thing.categories.iter().copied().collect();
    if thing.class_kind.is_usage() {
        if let Some(definition) = thing.definition.as_ref().and_then(definition_of) {
            categories.extend(definition.categories.iter().copied());
        }
    }
    categories
}

/// Keep the things whose memberships satisfy `filter`, in their original order
pub fn filter_by_category(
    things: Vec<Arc<Thing>>,
    filter: &CategoryFilter,
    definition_of: &dyn Fn(&ThingId) -> Option<Arc<Thing>>,
) -> Vec<Arc<Thing>> {
    if filter.is_empty() {
        return things;
    }

    things
        .into_iter()
        .filter(|thing| filter.matches(&memberships(thing, definition_of)))
        .collect()
}

/// Configuration of one matrix axis
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfiguration {
    pub possible_class_kinds: Vec<ClassKind>,
    pub selected_class_kind: Option<ClassKind>,
    pub possible_categories: Vec<Category>,
    pub selected_categories: Vec<ThingId>,
    pub boolean_operator: CategoryBooleanOperatorKind,
    pub include_subcategories: bool,
    pub possible_owners: Vec<DomainOfExpertise>,
    pub selected_owners: Vec<ThingId>,
    pub display_kind: DisplayKind,
    pub sort_kind: DisplayKind,
    pub sort_order: SortOrder,
}

impl SourceConfiguration {
    pub fn new(possible_class_kinds: impl IntoIterator<Item = ClassKind>) -> Self {
        Self {
            possible_class_kinds: possible_class_kinds.into_iter().collect(),
            selected_class_kind: None,
            possible_categories: Vec::new(),
            selected_categories: Vec::new(),
            boolean_operator: CategoryBooleanOperatorKind::default(),
            include_subcategories: true,
            possible_owners: Vec::new(),
            selected_owners: Vec::new(),
            display_kind: DisplayKind::default(),
            sort_kind: DisplayKind::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// Select a class kind and repopulate the categories offered for it
    pub fn select_class_kind(&mut self, kind: Option<ClassKind>, library: &CategoryLibrary) {
        self.selected_class_kind = kind;
        self.populate_possible_categories(library);
    }

    /// Offer the categories permitted for the selected kind, or for any possible kind when
    /// none is selected. Selected categories no longer offered are dropped.
    pub fn populate_possible_categories(&mut self, library: &CategoryLibrary) {
        let possible = match self.selected_class_kind {
            Some(kind) => library.applicable_to(kind),
            None => library.applicable_to_any(&self.possible_class_kinds),
        };
        self.possible_categories = possible.into_iter().cloned().collect();

        let offered: HashSet<ThingId> = self.possible_categories.iter().map(|c| c.id).collect();
        self.selected_categories.retain(|id| offered.contains(id));
    }

    /// Offer the active domains of expertise, sorted by name
    pub fn populate_possible_owners(&mut self, domains: Vec<DomainOfExpertise>) {
        let mut domains = domains;
        domains.sort_by(|a, b| a.name.cmp(&b.name));
        self.possible_owners = domains;

        let offered: HashSet<ThingId> = self.possible_owners.iter().map(|d| d.id).collect();
        self.selected_owners.retain(|id| offered.contains(id));
    }

    pub fn has_category_filter(&self) -> bool {
        !self.selected_categories.is_empty()
    }

    pub fn category_filter(&self, library: &CategoryLibrary) -> CategoryFilter {
        CategoryFilter::new(
            &self.selected_categories,
            self.boolean_operator,
            self.include_subcategories,
            library,
        )
    }

    /// Filter and sort the candidate things of this axis.
    ///
    /// Fails with [`MatrixError::UnexpectedKind`] when a candidate cannot be shown on a matrix
    /// axis, either because its kind has no name and short-name or cannot carry categories,
    /// or because it is not of the selected kind.
    pub fn filter_and_sort(
        &self,
        axis: Axis,
        candidates: Vec<Arc<Thing>>,
        library: &CategoryLibrary,
        definition_of: &dyn Fn(&ThingId) -> Option<Arc<Thing>>,
        show_deprecated: bool,
    ) -> MatrixResult<Vec<Arc<Thing>>> {
        let Some(kind) = self.selected_class_kind else {
            return Ok(Vec::new());
        };

        if !kind.is_defined() || !kind.is_categorizable() {
            return Err(MatrixError::UnexpectedKind { axis, kind });
        }
        if let Some(stray) = candidates.iter().find(|t| t.class_kind != kind) {
            return Err(MatrixError::UnexpectedKind {
                axis,
                kind: stray.class_kind,
            });
        }

        let owners: HashSet<ThingId> = self.selected_owners.iter().copied().collect();
        let visible: Vec<Arc<Thing>> = candidates
            .into_iter()
            .filter(|t| show_deprecated || !t.is_deprecated)
            .filter(|t| owners.is_empty() || t.owner.map_or(false, |o| owners.contains(&o)))
            .collect();

        let mut things = filter_by_category(visible, &self.category_filter(library), definition_of);

        let sort_kind = self.sort_kind;
        // stable in both directions: equal keys keep their model order
        match self.sort_order {
            SortOrder::Ascending => things.sort_by(|a, b| a.display(sort_kind).cmp(b.display(sort_kind))),
            SortOrder::Descending => things.sort_by(|a, b| b.display(sort_kind).cmp(a.display(sort_kind))),
        }

        Ok(things)
    }

    /// The selected category filter as text, e.g. `(cat1 OR cat3sub1) AND (cat2)`
    pub fn categories_description(&self, library: &CategoryLibrary) -> String {
        let terms: Vec<String> = self
            .selected_categories
            .iter()
            .filter_map(|id| library.get(id))
            .map(|category| {
                if !self.include_subcategories {
                    return category.name.clone();
                }
                let mut names = vec![category.name.clone()];
                names.extend(library.all_derived(&category.id).into_iter().map(|c| c.name.clone()));
                format!("({})", names.join(" OR "))
            })
            .collect();

        terms.join(&format!(" {} ", self.boolean_operator))
    }

    /// Persistable form of the configuration
    pub fn to_record(&self) -> SourceConfigurationRecord {
        SourceConfigurationRecord {
            class_kind: self.selected_class_kind,
            categories: self.selected_categories.clone(),
            owners: self.selected_owners.clone(),
            boolean_operator: self.boolean_operator,
            include_subcategories: self.include_subcategories,
            display_kind: self.display_kind,
            sort_kind: self.sort_kind,
            sort_order: self.sort_order,
        }
    }

    /// Apply a persisted configuration; categories and owners that no longer exist are dropped
    pub fn apply_record(
        &mut self,
        record: &SourceConfigurationRecord,
        library: &CategoryLibrary,
        domains: Vec<DomainOfExpertise>,
    ) {
        self.selected_class_kind = record.class_kind;
        self.selected_categories = record.categories.clone();
        self.selected_owners = record.owners.clone();
        self.boolean_operator = record.boolean_operator;
        self.include_subcategories = record.include_subcategories;
        self.display_kind = record.display_kind;
        self.sort_kind = record.sort_kind;
        self.sort_order = record.sort_order;

        self.populate_possible_categories(library);
        self.populate_possible_owners(domains);
    }
}
