//! The matrix grid and its rebuild/refresh algorithms
//!
//! A full rebuild is O(rows x columns) cell constructions. An incremental refresh recomputes
//! only the cells at the endpoints of relationships that changed since the last rebuild or
//! refresh, splicing them into the grid in place.

use super::matrix_cell::{CellKey, ColumnDefinition, MatrixCell, MatrixRow, ROW_NAME_COLUMN};
use super::source_configuration::SourceConfiguration;
use super::MatrixResult;
use crate::aggregate::{BinaryRelationship, BinaryRelationshipRule, Thing};
use crate::handlers::Session;
use crate::value_objects::{Axis, IterationId, ThingId};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Title shown while the matrix has no valid configuration
pub const PLACEHOLDER_TITLE: &str = "-";

/// Everything a rebuild depends on
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildRequest {
    pub source_y: SourceConfiguration,
    pub source_x: SourceConfiguration,
    pub rule: Option<Arc<BinaryRelationshipRule>>,
    pub show_related_only: bool,
    pub show_deprecated: bool,
}

/// Outcome of an incremental refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Relationships added, removed or moved since the previous pass
    pub changed_relationships: Vec<ThingId>,
    /// Keys of every cell recomputed, in recomputation order
    pub recomputed: Vec<CellKey>,
}

impl RefreshSummary {
    pub fn is_empty(&self) -> bool {
        self.changed_relationships.is_empty()
    }

    /// Row things whose cells were recomputed
    pub fn touched_rows(&self) -> HashSet<ThingId> {
        self.recomputed.iter().map(|key| key.row).collect()
    }
}

/// Position of a cell in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellAddress {
    row: usize,
    column: usize,
}

type PairKey = (ThingId, ThingId);

fn pair_key(a: ThingId, b: ThingId) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Relationships grouped by their unordered pair of endpoints, in query order
fn index_pairs<'a>(
    relationships: impl IntoIterator<Item = &'a Arc<BinaryRelationship>>,
) -> HashMap<PairKey, Vec<Arc<BinaryRelationship>>> {
    let mut pairs: HashMap<PairKey, Vec<Arc<BinaryRelationship>>> = HashMap::new();
    for relationship in relationships {
        pairs
            .entry(pair_key(relationship.source, relationship.target))
            .or_default()
            .push(Arc::clone(relationship));
    }
    pairs
}

/// Columns and rows of the matrix, with the lookups refresh relies on
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixGrid {
    iteration: IterationId,
    title: String,
    rule: Option<Arc<BinaryRelationshipRule>>,
    columns: Vec<ColumnDefinition>,
    rows: Vec<MatrixRow>,
    row_index: HashMap<ThingId, usize>,
    column_index: HashMap<ThingId, usize>,
    cells: HashMap<CellKey, CellAddress>,
    relationships: IndexMap<ThingId, Arc<BinaryRelationship>>,
}

impl MatrixGrid {
    /// An empty grid showing `title`
    pub fn empty(iteration: IterationId, title: impl Into<String>) -> Self {
        Self {
            iteration,
            title: title.into(),
            rule: None,
            columns: Vec::new(),
            rows: Vec::new(),
            row_index: HashMap::new(),
            column_index: HashMap::new(),
            cells: HashMap::new(),
            relationships: IndexMap::new(),
        }
    }

    /// Build the grid from scratch.
    ///
    /// Configuration problems never fail the build: they are logged and leave an empty grid.
    pub fn build(session: &dyn Session, iteration: IterationId, request: &RebuildRequest) -> Self {
        let (Some(kind_y), Some(kind_x), Some(rule)) = (
            request.source_y.selected_class_kind,
            request.source_x.selected_class_kind,
            request.rule.as_ref(),
        ) else {
            return Self::empty(iteration, PLACEHOLDER_TITLE);
        };

        let mut grid = Self::empty(iteration, rule.name.clone());

        match Self::select_axes(session, iteration, request) {
            Ok(Some((rows, columns))) => {
                grid.rule = Some(Arc::clone(rule));
                grid.populate(session, request, rows, columns);
                debug!(
                    title = %grid.title,
                    rows = grid.rows.len(),
                    columns = grid.columns.len(),
                    relationships = grid.relationships.len(),
                    "Matrix rebuilt"
                );
            }
            Ok(None) => {
                debug!(%kind_y, %kind_x, "No things to display");
            }
            Err(error) => {
                warn!(%error, "Matrix cleared");
            }
        }

        grid
    }

    /// Candidate things of both axes, filtered and sorted, or `None` when either side is empty
    #[allow(clippy::type_complexity)]
    fn select_axes(
        session: &dyn Session,
        iteration: IterationId,
        request: &RebuildRequest,
    ) -> MatrixResult<Option<(Vec<Arc<Thing>>, Vec<Arc<Thing>>)>> {
        let (Some(kind_y), Some(kind_x)) = (
            request.source_y.selected_class_kind,
            request.source_x.selected_class_kind,
        ) else {
            return Ok(None);
        };

        let things = session.things(iteration, &[kind_y, kind_x]);
        let candidates_y: Vec<Arc<Thing>> = things.iter().filter(|t| t.class_kind == kind_y).cloned().collect();
        let candidates_x: Vec<Arc<Thing>> = things.iter().filter(|t| t.class_kind == kind_x).cloned().collect();

        if candidates_y.is_empty() || candidates_x.is_empty() {
            return Ok(None);
        }

        let library = session.categories(iteration);
        let definition_of = |id: &ThingId| session.thing(iteration, id);

        let rows = request.source_y.filter_and_sort(
            Axis::Y,
            candidates_y,
            &library,
            &definition_of,
            request.show_deprecated,
        )?;
        let columns = request.source_x.filter_and_sort(
            Axis::X,
            candidates_x,
            &library,
            &definition_of,
            request.show_deprecated,
        )?;

        if rows.is_empty() || columns.is_empty() {
            return Ok(None);
        }
        Ok(Some((rows, columns)))
    }

    fn populate(
        &mut self,
        session: &dyn Session,
        request: &RebuildRequest,
        row_things: Vec<Arc<Thing>>,
        column_things: Vec<Arc<Thing>>,
    ) {
        let Some(rule) = self.rule.clone() else {
            return;
        };

        self.relationships = session
            .relationships(self.iteration, &rule.relationship_category)
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let pairs = index_pairs(self.relationships.values());

        let related: HashSet<ThingId> = if request.show_related_only {
            self.relationships
                .values()
                .flat_map(|r| [r.source, r.target])
                .collect()
        } else {
            HashSet::new()
        };
        let shown = |thing: &Thing| !request.show_related_only || related.contains(&thing.id);

        let mut columns = vec![ColumnDefinition::row_label()];
        // the label column's field name is taken before any thing can claim it
        let mut field_names = HashSet::from([ROW_NAME_COLUMN.to_string()]);
        for thing in column_things.into_iter().filter(|t| shown(t.as_ref())) {
            // first thing with a given short-name wins the column
            if field_names.insert(thing.short_name.clone()) {
                columns.push(ColumnDefinition::for_thing(thing, request.source_x.display_kind));
            }
        }

        let mut rows = Vec::new();
        for thing in row_things.into_iter().filter(|t| shown(t.as_ref())) {
            let mut row = MatrixRow::new(Arc::clone(&thing), request.source_y.display_kind);
            for column in columns.iter_mut().skip(1) {
                let Some(column_thing) = column.thing.clone() else {
                    continue;
                };
                let found = pairs
                    .get(&pair_key(thing.id, column_thing.id))
                    .cloned()
                    .unwrap_or_default();
                let cell = MatrixCell::new(Arc::clone(&thing), column_thing, found, &rule);
                if cell.direction.is_related() {
                    column.relationship_count += 1;
                    row.relationship_count += 1;
                }
                row.cells.insert(column.field_name.clone(), cell);
            }
            rows.push(row);
        }

        if request.show_related_only {
            let dropped: Vec<String> = columns
                .iter()
                .filter(|c| c.is_unrelated())
                .map(|c| c.field_name.clone())
                .collect();
            columns.retain(|c| !c.is_unrelated());
            rows.retain(|r| !r.is_unrelated());
            for row in &mut rows {
                for field in &dropped {
                    row.cells.shift_remove(field);
                }
            }
        }

        if columns.len() <= 1 || rows.is_empty() {
            return;
        }

        self.columns = columns;
        self.rows = rows;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.row_index = self.rows.iter().enumerate().map(|(i, r)| (r.thing.id, i)).collect();
        self.column_index = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.thing_id().map(|id| (id, i)))
            .collect();
        self.cells = self
            .rows
            .iter()
            .enumerate()
            .flat_map(|(row, r)| {
                r.cells
                    .values()
                    .enumerate()
                    .filter_map(move |(column, cell)| cell.key().map(|key| (key, CellAddress { row, column })))
            })
            .collect();
    }

    /// Bring the grid up to date with the current relationships of the rule.
    ///
    /// Only cells whose row and column things are endpoints of a changed relationship are
    /// recomputed. Changes involving things without a row or column are ignored.
    pub fn refresh(&mut self, session: &dyn Session) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        let Some(rule) = self.rule.clone() else {
            return summary;
        };

        let current: IndexMap<ThingId, Arc<BinaryRelationship>> = session
            .relationships(self.iteration, &rule.relationship_category)
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let mut endpoints: IndexSet<(ThingId, ThingId)> = IndexSet::new();
        for (id, previous) in &self.relationships {
            match current.get(id) {
                None => {
                    summary.changed_relationships.push(*id);
                    endpoints.insert((previous.source, previous.target));
                }
                Some(now) if now.source != previous.source || now.target != previous.target => {
                    summary.changed_relationships.push(*id);
                    endpoints.insert((previous.source, previous.target));
                    endpoints.insert((now.source, now.target));
                }
                Some(_) => {}
            }
        }
        for (id, added) in &current {
            if !self.relationships.contains_key(id) {
                summary.changed_relationships.push(*id);
                endpoints.insert((added.source, added.target));
            }
        }

        if summary.changed_relationships.is_empty() {
            self.relationships = current;
            return summary;
        }

        let pairs = index_pairs(current.values());
        let mut recomputed: IndexSet<CellKey> = IndexSet::new();
        for (source, target) in endpoints {
            for key in [CellKey::new(source, target), CellKey::new(target, source)] {
                if recomputed.contains(&key) {
                    continue;
                }
                if self.recompute_cell(key, &pairs, &rule) {
                    recomputed.insert(key);
                }
            }
        }

        self.relationships = current;
        summary.recomputed = recomputed.into_iter().collect();
        debug!(
            changed = summary.changed_relationships.len(),
            recomputed = summary.recomputed.len(),
            "Matrix refreshed"
        );
        summary
    }

    /// Recompute one cell in place; returns false when the grid has no such cell
    fn recompute_cell(
        &mut self,
        key: CellKey,
        pairs: &HashMap<PairKey, Vec<Arc<BinaryRelationship>>>,
        rule: &BinaryRelationshipRule,
    ) -> bool {
        let (Some(&row), Some(&column)) = (self.row_index.get(&key.row), self.column_index.get(&key.column)) else {
            return false;
        };
        let Some(column_thing) = self.columns[column].thing.clone() else {
            return false;
        };

        let found = pairs
            .get(&pair_key(key.row, key.column))
            .cloned()
            .unwrap_or_default();
        let field_name = self.columns[column].field_name.clone();
        let row_record = &mut self.rows[row];
        let cell = MatrixCell::new(Arc::clone(&row_record.thing), column_thing, found, rule);

        let was_related = row_record
            .cells
            .get(&field_name)
            .map_or(false, |c| c.direction.is_related());
        let is_related = cell.direction.is_related();

        row_record.cells.insert(field_name, cell);
        match (was_related, is_related) {
            (false, true) => {
                row_record.relationship_count += 1;
                self.columns[column].relationship_count += 1;
            }
            (true, false) => {
                row_record.relationship_count = row_record.relationship_count.saturating_sub(1);
                self.columns[column].relationship_count = self.columns[column].relationship_count.saturating_sub(1);
            }
            _ => {}
        }
        self.cells.insert(key, CellAddress { row, column });
        true
    }

    pub fn iteration(&self) -> IterationId {
        self.iteration
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rule(&self) -> Option<&Arc<BinaryRelationshipRule>> {
        self.rule.as_ref()
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, thing: &ThingId) -> Option<&MatrixRow> {
        self.row_index.get(thing).map(|&i| &self.rows[i])
    }

    pub fn column(&self, thing: &ThingId) -> Option<&ColumnDefinition> {
        self.column_index.get(thing).map(|&i| &self.columns[i])
    }

    /// The cell at the intersection of a row thing and a column thing
    pub fn cell(&self, key: &CellKey) -> Option<&MatrixCell> {
        let address = self.cells.get(key)?;
        self.rows[address.row]
            .cells
            .get_index(address.column)
            .map(|(_, cell)| cell)
    }

    /// The cell under a column field name in the row of `row`
    pub fn cell_by_field(&self, row: &ThingId, field_name: &str) -> Option<&MatrixCell> {
        self.row(row)?.cell(field_name)
    }

    /// Number of cells known to the lookup
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Relationships of the rule as of the last rebuild or refresh
    pub fn relationships(&self) -> impl Iterator<Item = &Arc<BinaryRelationship>> {
        self.relationships.values()
    }

    pub fn contains_thing(&self, thing: &ThingId) -> bool {
        self.row_index.contains_key(thing) || self.column_index.contains_key(thing)
    }
}
