//! Matrix export
//!
//! A read-only, serializable snapshot of the grid for exporters such as spreadsheet writers.
//! Exporters pull a [`MatrixExport`]; nothing flows back into the matrix.

use crate::projections::MatrixGrid;
use crate::value_objects::{RelationshipDirectionKind, ThingId};
use serde::Serialize;

/// Marker of a related cell when directionality is hidden
pub const RELATED_MARKER: &str = "X";

/// One exported column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportColumn {
    pub field_name: String,
    pub header: String,
    pub thing: Option<ThingId>,
    pub relationship_count: usize,
}

/// One exported row; `cells` follow the order of [`MatrixExport::columns`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub thing: ThingId,
    pub cells: Vec<String>,
    pub relationship_count: usize,
}

/// Snapshot of the columns and rows of a grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixExport {
    pub title: String,
    pub columns: Vec<ExportColumn>,
    pub rows: Vec<ExportRow>,
    pub relationship_count: usize,
}

/// Text of a cell: an arrow per direction, or [`RELATED_MARKER`] when directions are hidden
pub fn cell_text(direction: RelationshipDirectionKind, show_directionality: bool) -> &'static str {
    match direction {
        RelationshipDirectionKind::None => "",
        _ if !show_directionality => RELATED_MARKER,
        RelationshipDirectionKind::RowToColumn => "->",
        RelationshipDirectionKind::ColumnToRow => "<-",
        RelationshipDirectionKind::BiDirectional => "<->",
    }
}

impl MatrixExport {
    pub fn from_grid(grid: &MatrixGrid, show_directionality: bool) -> Self {
        let columns: Vec<ExportColumn> = grid
            .columns()
            .iter()
            .map(|column| ExportColumn {
                field_name: column.field_name.clone(),
                header: column.header.clone(),
                thing: column.thing_id(),
                relationship_count: column.relationship_count,
            })
            .collect();

        let rows = grid
            .rows()
            .iter()
            .map(|row| ExportRow {
                thing: row.thing.id,
                cells: columns
                    .iter()
                    .map(|column| match row.cell(&column.field_name) {
                        Some(cell) if cell.is_row_label() => cell.label.clone(),
                        Some(cell) => cell_text(cell.direction, show_directionality).to_string(),
                        None => String::new(),
                    })
                    .collect(),
                relationship_count: row.relationship_count,
            })
            .collect();

        Self {
            title: grid.title().to_string(),
            columns,
            rows,
            relationship_count: grid.relationships().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Tab separated rendering, one line per row after a header line
    pub fn to_text(&self) -> String {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header.as_str()).collect();
        let mut lines = vec![self.title.clone(), headers.join("\t")];
        lines.extend(self.rows.iter().map(|row| row.cells.join("\t")));
        lines.iter().map(|line| format!("{line}\n")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{BinaryRelationship, BinaryRelationshipRule, Iteration, Thing};
    use crate::handlers::InMemorySession;
    use crate::projections::{RebuildRequest, SourceConfiguration, ROW_NAME_COLUMN};
    use crate::value_objects::{ClassKind, IterationId};
    use std::sync::Arc;

    fn grid() -> MatrixGrid {
        let mut iteration = Iteration::new(IterationId::new());
        let category = ThingId::new();
        let rule = BinaryRelationshipRule::new(
            "Trace",
            category,
            [ClassKind::ElementDefinition],
            [ClassKind::Requirement],
            "satisfies",
        );
        let engine = Thing::new(ClassKind::ElementDefinition, "Engine", "eng");
        let thrust = Thing::new(ClassKind::Requirement, "Thrust", "thr");
        let mass = Thing::new(ClassKind::Requirement, "Mass", "mss");
        let link = BinaryRelationship::new(engine.id, thrust.id, category);
        for thing in [engine, thrust, mass] {
            iteration.add_thing(thing).unwrap();
        }
        iteration.add_relationship(link).unwrap();

        let session = InMemorySession::new(iteration);
        let mut source_y = SourceConfiguration::new([ClassKind::ElementDefinition]);
        source_y.selected_class_kind = Some(ClassKind::ElementDefinition);
        let mut source_x = SourceConfiguration::new([ClassKind::Requirement]);
        source_x.selected_class_kind = Some(ClassKind::Requirement);
        let request = RebuildRequest {
            source_y,
            source_x,
            rule: Some(Arc::new(rule)),
            show_related_only: false,
            show_deprecated: false,
        };
        MatrixGrid::build(&session, session.iteration_id(), &request)
    }

    #[test]
    fn test_export_follows_grid_layout() {
        let export = MatrixExport::from_grid(&grid(), true);

        assert_eq!(export.title, "Trace");
        assert_eq!(export.columns[0].field_name, ROW_NAME_COLUMN);
        assert_eq!(export.columns.len(), 3);
        assert_eq!(export.rows[0].cells, vec!["Engine", "", "->"]);
        assert_eq!(export.relationship_count, 1);
    }

    #[test]
    fn test_hidden_directionality_marks_related_cells() {
        let export = MatrixExport::from_grid(&grid(), false);
        assert_eq!(export.rows[0].cells[2], RELATED_MARKER);

        let text = export.to_text();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("Trace\n"));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(RelationshipDirectionKind::None, true), "");
        assert_eq!(cell_text(RelationshipDirectionKind::None, false), "");
        assert_eq!(cell_text(RelationshipDirectionKind::BiDirectional, true), "<->");
        assert_eq!(cell_text(RelationshipDirectionKind::ColumnToRow, false), RELATED_MARKER);
    }
}
