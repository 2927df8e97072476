//! The matrix projection
//!
//! Owns the grid, the selected cell and the relationship commands offered on it. Edits are
//! written through the session against a copy of the iteration; the grid itself only changes
//! through [`MatrixProjection::rebuild`], [`MatrixProjection::refresh`] or
//! [`MatrixProjection::install`].

use super::grid::{MatrixGrid, RebuildRequest, RefreshSummary, PLACEHOLDER_TITLE};
use super::matrix_cell::{CellKey, MatrixCell};
use super::{MatrixError, MatrixResult};
use crate::aggregate::BinaryRelationship;
use crate::commands::{MatrixCommand, ThingTransaction};
use crate::handlers::{PermissionService, Session};
use crate::value_objects::{ClassKind, IterationId, RelationshipDirectionKind, ThingId};
use std::sync::Arc;
use tracing::{debug, info};

/// Which relationship commands are enabled for the selected cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandState {
    pub can_create_row_to_column: bool,
    pub can_create_column_to_row: bool,
    pub can_delete_row_to_column: bool,
    pub can_delete_column_to_row: bool,
    pub can_delete_all: bool,
}

impl CommandState {
    /// Enablement for a cell, given whether the user may write relationships
    pub fn for_cell(cell: Option<&MatrixCell>, can_write: bool) -> Self {
        let Some(cell) = cell else {
            return Self::default();
        };
        let Some(column) = cell.column_thing.as_ref() else {
            return Self::default();
        };
        if !can_write {
            return Self::default();
        }

        let distinct = cell.row_thing.id != column.id;
        let direction = cell.direction;
        Self {
            can_create_row_to_column: distinct
                && !matches!(
                    direction,
                    RelationshipDirectionKind::RowToColumn | RelationshipDirectionKind::BiDirectional
                ),
            can_create_column_to_row: distinct
                && !matches!(
                    direction,
                    RelationshipDirectionKind::ColumnToRow | RelationshipDirectionKind::BiDirectional
                ),
            can_delete_row_to_column: matches!(
                direction,
                RelationshipDirectionKind::RowToColumn | RelationshipDirectionKind::BiDirectional
            ),
            can_delete_column_to_row: matches!(
                direction,
                RelationshipDirectionKind::ColumnToRow | RelationshipDirectionKind::BiDirectional
            ),
            can_delete_all: direction.is_related(),
        }
    }

    pub fn is_enabled(&self, command: MatrixCommand) -> bool {
        match command {
            MatrixCommand::CreateRowToColumn => self.can_create_row_to_column,
            MatrixCommand::CreateColumnToRow => self.can_create_column_to_row,
            MatrixCommand::DeleteRowToColumn => self.can_delete_row_to_column,
            MatrixCommand::DeleteColumnToRow => self.can_delete_column_to_row,
            MatrixCommand::DeleteAll => self.can_delete_all,
        }
    }
}

/// Text shown for the current selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDetails {
    pub row: String,
    pub column: String,
    pub cell: String,
}

/// What is selected in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The label cell of a row
    RowLabel(ThingId),
    /// A relationship cell
    Cell(CellKey),
}

/// Read model of the relationship matrix
pub struct MatrixProjection {
    session: Arc<dyn Session>,
    permissions: Arc<dyn PermissionService>,
    iteration: IterationId,
    grid: MatrixGrid,
    selection: Option<Selection>,
    commands: CommandState,
}

impl MatrixProjection {
    pub fn new(session: Arc<dyn Session>, permissions: Arc<dyn PermissionService>, iteration: IterationId) -> Self {
        Self {
            session,
            permissions,
            iteration,
            grid: MatrixGrid::empty(iteration, PLACEHOLDER_TITLE),
            selection: None,
            commands: CommandState::default(),
        }
    }

    pub fn grid(&self) -> &MatrixGrid {
        &self.grid
    }

    pub fn title(&self) -> &str {
        self.grid.title()
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    pub fn iteration(&self) -> IterationId {
        self.iteration
    }

    /// Rebuild the grid from scratch
    pub fn rebuild(&mut self, request: &RebuildRequest) {
        let grid = MatrixGrid::build(self.session.as_ref(), self.iteration, request);
        self.install(grid);
    }

    /// Replace the grid with one built elsewhere, keeping the selection when it still exists
    pub fn install(&mut self, grid: MatrixGrid) {
        self.grid = grid;
        let still_there = match self.selection {
            Some(Selection::Cell(key)) => self.grid.cell(&key).is_some(),
            Some(Selection::RowLabel(row)) => self.grid.row(&row).is_some(),
            None => true,
        };
        if !still_there {
            self.selection = None;
        }
        self.compute_command_state();
    }

    /// Patch the grid with the relationship changes since the last pass
    pub fn refresh(&mut self) -> RefreshSummary {
        let summary = self.grid.refresh(self.session.as_ref());
        if !summary.is_empty() {
            self.compute_command_state();
        }
        summary
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection;
        self.compute_command_state();
    }

    /// Select the cell at the intersection of a row thing and a column thing
    pub fn select_cell(&mut self, row: ThingId, column: ThingId) {
        self.select(Some(Selection::Cell(CellKey::new(row, column))));
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selected_cell(&self) -> Option<&MatrixCell> {
        match self.selection? {
            Selection::Cell(key) => self.grid.cell(&key),
            Selection::RowLabel(row) => self.grid.row(&row)?.label(),
        }
    }

    pub fn command_state(&self) -> CommandState {
        self.commands
    }

    pub fn can_execute(&self, command: MatrixCommand) -> bool {
        self.commands.is_enabled(command)
    }

    /// Re-evaluate command enablement, including the write permission
    pub fn compute_command_state(&mut self) {
        let can_write = self
            .permissions
            .can_write_kind(ClassKind::BinaryRelationship, self.iteration);
        self.commands = CommandState::for_cell(self.selected_cell(), can_write);
    }

    /// Row, column and cell details of the selection
    pub fn selection_details(&self) -> SelectionDetails {
        let Some(cell) = self.selected_cell() else {
            return SelectionDetails::default();
        };

        let row = self
            .grid
            .row(&cell.row_thing.id)
            .and_then(|r| r.label())
            .map(|label| label.tooltip.clone())
            .unwrap_or_default();
        let column = cell
            .column_thing
            .as_ref()
            .and_then(|c| self.grid.column(&c.id))
            .map(|c| c.tooltip.clone())
            .unwrap_or_default();

        SelectionDetails {
            row,
            column,
            cell: cell.details(),
        }
    }

    /// Build the transaction carrying out `command` on the selected cell
    pub fn transaction_for(&self, command: MatrixCommand) -> MatrixResult<ThingTransaction> {
        let cell = self.selected_cell().ok_or(MatrixError::NoSelection)?;
        if !self.can_execute(command) {
            return Err(MatrixError::CommandDisabled(command));
        }
        let column = cell.column_thing.as_ref().ok_or(MatrixError::NoSelection)?;
        let rule = self.grid.rule().ok_or(MatrixError::CommandDisabled(command))?;

        let mut transaction = ThingTransaction::new(self.iteration);
        match command {
            MatrixCommand::CreateRowToColumn | MatrixCommand::CreateColumnToRow => {
                let (source, target) = if command == MatrixCommand::CreateRowToColumn {
                    (cell.row_thing.id, column.id)
                } else {
                    (column.id, cell.row_thing.id)
                };
                let owner = self.session.active_domain(self.iteration);
                transaction.create_relationship(
                    BinaryRelationship::new(source, target, rule.relationship_category).with_owner(owner),
                );
            }
            MatrixCommand::DeleteRowToColumn | MatrixCommand::DeleteColumnToRow | MatrixCommand::DeleteAll => {
                let source = match command {
                    MatrixCommand::DeleteRowToColumn => Some(cell.row_thing.id),
                    MatrixCommand::DeleteColumnToRow => Some(column.id),
                    _ => None,
                };
                for relationship in &cell.relationships {
                    if source.map_or(true, |s| relationship.source == s) {
                        transaction.delete_relationship(relationship.id);
                    }
                }
            }
        }

        Ok(transaction)
    }

    /// Carry out `command` on the selected cell.
    ///
    /// The grid is not touched; it catches up when the resulting change events are handled.
    pub async fn execute(&self, command: MatrixCommand) -> MatrixResult<()> {
        let transaction = self.transaction_for(command)?;
        debug!(%command, operations = transaction.operations().len(), "Writing relationship change");
        self.session.write(transaction).await?;
        info!(%command, "Relationship change written");
        Ok(())
    }

    /// Command a row to column toggle gesture would run on the selected cell
    pub fn toggle_row_to_column_command(&self) -> Option<MatrixCommand> {
        self.first_enabled(&[MatrixCommand::CreateRowToColumn, MatrixCommand::DeleteRowToColumn])
    }

    /// Command a column to row toggle gesture would run on the selected cell
    pub fn toggle_column_to_row_command(&self) -> Option<MatrixCommand> {
        self.first_enabled(&[MatrixCommand::CreateColumnToRow, MatrixCommand::DeleteColumnToRow])
    }

    /// Command a delete gesture would run: everything for a bidirectional cell, otherwise
    /// the single direction present
    pub fn delete_any_command(&self) -> Option<MatrixCommand> {
        let direction = self.selected_cell()?.direction;
        if direction == RelationshipDirectionKind::BiDirectional {
            return self.first_enabled(&[MatrixCommand::DeleteAll]);
        }
        self.first_enabled(&[MatrixCommand::DeleteRowToColumn, MatrixCommand::DeleteColumnToRow])
    }

    fn first_enabled(&self, commands: &[MatrixCommand]) -> Option<MatrixCommand> {
        if self.selected_cell()?.is_row_label() {
            return None;
        }
        commands.iter().copied().find(|c| self.can_execute(*c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{BinaryRelationshipRule, Thing};

    fn cell(direction_sources: &[bool]) -> MatrixCell {
        let row = Arc::new(Thing::new(ClassKind::ElementDefinition, "row", "row"));
        let column = Arc::new(Thing::new(ClassKind::Requirement, "column", "column"));
        let rule = BinaryRelationshipRule::new(
            "rule",
            ThingId::new(),
            [ClassKind::ElementDefinition],
            [ClassKind::Requirement],
            "satisfies",
        );
        let relationships = direction_sources
            .iter()
            .map(|from_row| {
                let (source, target) = if *from_row { (row.id, column.id) } else { (column.id, row.id) };
                Arc::new(BinaryRelationship::new(source, target, rule.relationship_category))
            })
            .collect();
        MatrixCell::new(row, column, relationships, &rule)
    }

    #[test]
    fn test_empty_cell_offers_both_creates() {
        let state = CommandState::for_cell(Some(&cell(&[])), true);
        assert!(state.can_create_row_to_column);
        assert!(state.can_create_column_to_row);
        assert!(!state.can_delete_row_to_column);
        assert!(!state.can_delete_column_to_row);
        assert!(!state.can_delete_all);
    }

    #[test]
    fn test_existing_direction_disables_create() {
        let state = CommandState::for_cell(Some(&cell(&[true])), true);
        assert!(!state.can_create_row_to_column);
        assert!(state.can_create_column_to_row);
        assert!(state.can_delete_row_to_column);
        assert!(!state.can_delete_column_to_row);

        let state = CommandState::for_cell(Some(&cell(&[true, false])), true);
        assert!(!state.can_create_row_to_column);
        assert!(!state.can_create_column_to_row);
        assert!(state.can_delete_all);
    }

    #[test]
    fn test_same_thing_on_both_axes() {
        let thing = Arc::new(Thing::new(ClassKind::Requirement, "r", "r"));
        let rule = BinaryRelationshipRule::new(
            "rule",
            ThingId::new(),
            [ClassKind::Requirement],
            [ClassKind::Requirement],
            "traces",
        );
        let diagonal = MatrixCell::new(thing.clone(), thing, Vec::new(), &rule);

        let state = CommandState::for_cell(Some(&diagonal), true);
        assert!(!state.can_create_row_to_column);
        assert!(!state.can_create_column_to_row);
    }

    #[test]
    fn test_no_write_permission_disables_everything() {
        let state = CommandState::for_cell(Some(&cell(&[true])), false);
        assert_eq!(state, CommandState::default());
        assert_eq!(CommandState::for_cell(None, true), CommandState::default());
    }
}
