//! Cells, columns and rows of the matrix grid

use crate::aggregate::{BinaryRelationship, BinaryRelationshipRule, Thing};
use crate::value_objects::{DisplayKind, RelationshipDirectionKind, ThingId};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Field name of the synthetic column holding the row labels
pub const ROW_NAME_COLUMN: &str = "THING_NAME";

/// Arrow introducing a row to column relationship in cell details
pub const ROW_TO_COLUMN_ARROW: &str = "------------->>>";

/// Arrow introducing a column to row relationship in cell details
pub const COLUMN_TO_ROW_ARROW: &str = "<<<-------------";

/// Directional key of a cell: the row thing, then the column thing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellKey {
    pub row: ThingId,
    pub column: ThingId,
}

impl CellKey {
    pub fn new(row: ThingId, column: ThingId) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.row, self.column)
    }
}

/// One cell of the grid.
///
/// A cell without a column thing is the row label cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixCell {
    pub row_thing: Arc<Thing>,
    pub column_thing: Option<Arc<Thing>>,
    pub relationships: Vec<Arc<BinaryRelationship>>,
    pub direction: RelationshipDirectionKind,
    pub is_deprecated: bool,
    pub label: String,
    pub tooltip: String,
}

impl MatrixCell {
    /// The label cell of a row
    pub fn row_label(row_thing: Arc<Thing>, display_kind: DisplayKind) -> Self {
        Self {
            label: row_thing.display(display_kind).to_string(),
            tooltip: thing_tooltip(&row_thing),
            is_deprecated: row_thing.is_deprecated,
            row_thing,
            column_thing: None,
            relationships: Vec::new(),
            direction: RelationshipDirectionKind::None,
        }
    }

    /// A relationship cell between two things
    pub fn new(
        row_thing: Arc<Thing>,
        column_thing: Arc<Thing>,
        relationships: Vec<Arc<BinaryRelationship>>,
        rule: &BinaryRelationshipRule,
    ) -> Self {
        let direction = Self::classify(&row_thing.id, &column_thing.id, &relationships);
        let tooltip = relationship_tooltip(&row_thing, &column_thing, direction, rule);

        Self {
            is_deprecated: row_thing.is_deprecated || column_thing.is_deprecated,
            label: String::new(),
            tooltip,
            row_thing,
            column_thing: Some(column_thing),
            relationships,
            direction,
        }
    }

    /// Direction of a set of relationships between a row and a column thing
    pub fn classify(
        row: &ThingId,
        column: &ThingId,
        relationships: &[Arc<BinaryRelationship>],
    ) -> RelationshipDirectionKind {
        if relationships.is_empty() {
            return RelationshipDirectionKind::None;
        }
        if relationships.iter().all(|r| r.source == *row) {
            return RelationshipDirectionKind::RowToColumn;
        }
        if relationships.iter().all(|r| r.source == *column) {
            return RelationshipDirectionKind::ColumnToRow;
        }
        RelationshipDirectionKind::BiDirectional
    }

    pub fn is_row_label(&self) -> bool {
        self.column_thing.is_none()
    }

    pub fn key(&self) -> Option<CellKey> {
        self.column_thing
            .as_ref()
            .map(|column| CellKey::new(self.row_thing.id, column.id))
    }

    /// Relationships of the cell, one per paragraph, each introduced by its direction arrow
    pub fn details(&self) -> String {
        self.relationships
            .iter()
            .map(|r| {
                let arrow = if r.source == self.row_thing.id {
                    ROW_TO_COLUMN_ARROW
                } else {
                    COLUMN_TO_ROW_ARROW
                };
                format!("{arrow}\n{}", describe_relationship(r, &self.row_thing, self.column_thing.as_deref()))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn thing_tooltip(thing: &Thing) -> String {
    let mut tooltip = format!("{}\nKind: {}", thing.user_friendly_name(), thing.class_kind);
    if thing.is_deprecated {
        tooltip.push_str("\nDeprecated");
    }
    tooltip
}

fn relationship_tooltip(
    row: &Thing,
    column: &Thing,
    direction: RelationshipDirectionKind,
    rule: &BinaryRelationshipRule,
) -> String {
    let forward = &rule.forward_relationship_name;
    let row_to_column = format!("{} {forward} {}", row.user_friendly_name(), column.user_friendly_name());
    let column_to_row = format!("{} {forward} {}", column.user_friendly_name(), row.user_friendly_name());

    match direction {
        RelationshipDirectionKind::None => format!("{} / {}", row.user_friendly_name(), column.user_friendly_name()),
        RelationshipDirectionKind::RowToColumn => row_to_column,
        RelationshipDirectionKind::ColumnToRow => column_to_row,
        RelationshipDirectionKind::BiDirectional => format!("{row_to_column}\n{column_to_row}"),
    }
}

fn describe_relationship(relationship: &BinaryRelationship, row: &Thing, column: Option<&Thing>) -> String {
    let name_of = |id: &ThingId| {
        if *id == row.id {
            row.user_friendly_name()
        } else {
            column
                .filter(|c| c.id == *id)
                .map(Thing::user_friendly_name)
                .unwrap_or_else(|| id.to_string())
        }
    };
    format!(
        "Source: {}\nTarget: {}",
        name_of(&relationship.source),
        name_of(&relationship.target)
    )
}

/// A column of the grid
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Key of the column in every row; the thing's short-name, or [`ROW_NAME_COLUMN`]
    pub field_name: String,
    pub header: String,
    pub thing: Option<Arc<Thing>>,
    pub tooltip: String,
    /// Number of related cells in the column
    pub relationship_count: usize,
}

impl ColumnDefinition {
    pub fn row_label() -> Self {
        Self {
            field_name: ROW_NAME_COLUMN.to_string(),
            header: String::new(),
            thing: None,
            tooltip: String::new(),
            relationship_count: 0,
        }
    }

    pub fn for_thing(thing: Arc<Thing>, display_kind: DisplayKind) -> Self {
        Self {
            field_name: thing.short_name.clone(),
            header: thing.display(display_kind).to_string(),
            tooltip: thing_tooltip(&thing),
            thing: Some(thing),
            relationship_count: 0,
        }
    }

    pub fn is_row_label(&self) -> bool {
        self.thing.is_none()
    }

    pub fn thing_id(&self) -> Option<ThingId> {
        self.thing.as_ref().map(|t| t.id)
    }

    /// Whether the column holds no related cell
    pub fn is_unrelated(&self) -> bool {
        !self.is_row_label() && self.relationship_count == 0
    }
}

/// A row of the grid: an ordered mapping from column field name to cell
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub thing: Arc<Thing>,
    pub cells: IndexMap<String, MatrixCell>,
    /// Number of related cells in the row
    pub relationship_count: usize,
}

impl MatrixRow {
    pub fn new(thing: Arc<Thing>, display_kind: DisplayKind) -> Self {
        let mut cells = IndexMap::new();
        cells.insert(
            ROW_NAME_COLUMN.to_string(),
            MatrixCell::row_label(Arc::clone(&thing), display_kind),
        );
        Self {
            thing,
            cells,
            relationship_count: 0,
        }
    }

    pub fn cell(&self, field_name: &str) -> Option<&MatrixCell> {
        self.cells.get(field_name)
    }

    pub fn label(&self) -> Option<&MatrixCell> {
        self.cells.get(ROW_NAME_COLUMN)
    }

    pub fn is_unrelated(&self) -> bool {
        self.relationship_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ClassKind;

    fn rule() -> BinaryRelationshipRule {
        BinaryRelationshipRule::new(
            "satisfies",
            ThingId::new(),
            [ClassKind::ElementDefinition],
            [ClassKind::Requirement],
            "satisfies",
        )
    }

    fn things() -> (Arc<Thing>, Arc<Thing>) {
        (
            Arc::new(Thing::new(ClassKind::ElementDefinition, "Battery", "bat")),
            Arc::new(Thing::new(ClassKind::Requirement, "Power", "pwr")),
        )
    }

    #[test]
    fn test_classification() {
        let (row, column) = things();
        let category = ThingId::new();
        let forward = Arc::new(BinaryRelationship::new(row.id, column.id, category));
        let backward = Arc::new(BinaryRelationship::new(column.id, row.id, category));

        assert_eq!(MatrixCell::classify(&row.id, &column.id, &[]), RelationshipDirectionKind::None);
        assert_eq!(
            MatrixCell::classify(&row.id, &column.id, &[forward.clone(), forward.clone()]),
            RelationshipDirectionKind::RowToColumn
        );
        assert_eq!(
            MatrixCell::classify(&row.id, &column.id, &[backward.clone()]),
            RelationshipDirectionKind::ColumnToRow
        );
        assert_eq!(
            MatrixCell::classify(&row.id, &column.id, &[forward, backward]),
            RelationshipDirectionKind::BiDirectional
        );
    }

    #[test]
    fn test_tooltip_uses_forward_label() {
        let (row, column) = things();
        let rule = rule();
        let backward = Arc::new(BinaryRelationship::new(column.id, row.id, rule.relationship_category));

        let cell = MatrixCell::new(row, column, vec![backward], &rule);
        assert_eq!(cell.direction, RelationshipDirectionKind::ColumnToRow);
        assert_eq!(cell.tooltip, "Power [pwr] satisfies Battery [bat]");
    }

    #[test]
    fn test_details_arrows() {
        let (row, column) = things();
        let rule = rule();
        let forward = Arc::new(BinaryRelationship::new(row.id, column.id, rule.relationship_category));
        let backward = Arc::new(BinaryRelationship::new(column.id, row.id, rule.relationship_category));

        let cell = MatrixCell::new(row, column, vec![forward, backward], &rule);
        let details = cell.details();

        assert!(details.starts_with(ROW_TO_COLUMN_ARROW));
        assert!(details.contains(&format!("\n\n{COLUMN_TO_ROW_ARROW}\n")));
        assert!(details.contains("Source: Battery [bat]\nTarget: Power [pwr]"));
    }

    #[test]
    fn test_deprecated_endpoint_marks_cell() {
        let (row, _) = things();
        let column = Arc::new(Thing::new(ClassKind::Requirement, "Old", "old").deprecated());

        let cell = MatrixCell::new(row, column, Vec::new(), &rule());
        assert!(cell.is_deprecated);
        assert_eq!(cell.direction, RelationshipDirectionKind::None);
    }

    #[test]
    fn test_cell_key_format() {
        let (row, column) = things();
        let key = CellKey::new(row.id, column.id);
        assert_eq!(key.to_string(), format!("{}_{}", row.id, column.id));
    }
}
