//! Commands
//!
//! A [`ThingTransaction`] carries the creations, updates and deletions a client wants applied
//! to one iteration. Transactions are built against clones of the cached things and only ever
//! applied atomically by a session. [`MatrixCommand`] names the relationship edits offered on
//! the selected matrix cell.

use crate::aggregate::{BinaryRelationship, Iteration, Thing};
use crate::events::{ChangedThing, EventKind, ObjectChangedEvent};
use crate::value_objects::{ClassKind, IterationId, ThingId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for transactional writes
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors raised while applying a transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("unknown iteration: {0}")]
    UnknownIteration(IterationId),

    #[error("permission denied to write {0}")]
    PermissionDenied(ClassKind),

    #[error("thing already exists: {0}")]
    AlreadyExists(ThingId),

    #[error("thing not found: {0}")]
    NotFound(ThingId),

    #[error("conflicting modification of {id}: expected revision {expected}, found {found}")]
    ConflictingModification { id: ThingId, expected: u32, found: u32 },

    #[error("invalid transaction: {0}")]
    Invalid(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// One operation of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ThingOperation {
    CreateThing(Thing),
    UpdateThing(Thing),
    DeleteThing(ThingId),
    CreateRelationship(BinaryRelationship),
    UpdateRelationship(BinaryRelationship),
    DeleteRelationship(ThingId),
}

impl ThingOperation {
    /// Class kind the operation writes, used for permission checks
    pub fn class_kind(&self, iteration: &Iteration) -> Option<ClassKind> {
        match self {
            ThingOperation::CreateThing(t) | ThingOperation::UpdateThing(t) => Some(t.class_kind),
            ThingOperation::DeleteThing(id) => iteration.thing(id).map(|t| t.class_kind),
            ThingOperation::CreateRelationship(_)
            | ThingOperation::UpdateRelationship(_)
            | ThingOperation::DeleteRelationship(_) => Some(ClassKind::BinaryRelationship),
        }
    }

    /// Apply the operation to `iteration`, returning the change it produced
    pub fn apply(self, iteration: &mut Iteration) -> TransactionResult<ObjectChangedEvent> {
        let iteration_id = iteration.id();
        let (kind, changed) = match self {
            ThingOperation::CreateThing(thing) => {
                let id = thing.id;
                iteration.add_thing(thing)?;
                (EventKind::Added, ChangedThing::Thing(Self::stored_thing(iteration, id)?))
            }
            ThingOperation::UpdateThing(thing) => {
                let id = thing.id;
                iteration.update_thing(thing)?;
                (EventKind::Updated, ChangedThing::Thing(Self::stored_thing(iteration, id)?))
            }
            ThingOperation::DeleteThing(id) => {
                let removed = iteration.remove_thing(&id)?;
                (EventKind::Removed, ChangedThing::Thing(removed))
            }
            ThingOperation::CreateRelationship(relationship) => {
                let id = relationship.id;
                iteration.add_relationship(relationship)?;
                (
                    EventKind::Added,
                    ChangedThing::Relationship(Self::stored_relationship(iteration, id)?),
                )
            }
            ThingOperation::UpdateRelationship(relationship) => {
                let id = relationship.id;
                iteration.update_relationship(relationship)?;
                (
                    EventKind::Updated,
                    ChangedThing::Relationship(Self::stored_relationship(iteration, id)?),
                )
            }
            ThingOperation::DeleteRelationship(id) => {
                let removed = iteration.remove_relationship(&id)?;
                (EventKind::Removed, ChangedThing::Relationship(removed))
            }
        };

        Ok(ObjectChangedEvent::new(iteration_id, kind, changed))
    }

    fn stored_thing(iteration: &Iteration, id: ThingId) -> TransactionResult<std::sync::Arc<Thing>> {
        iteration.thing(&id).ok_or(TransactionError::NotFound(id))
    }

    fn stored_relationship(
        iteration: &Iteration,
        id: ThingId,
    ) -> TransactionResult<std::sync::Arc<BinaryRelationship>> {
        iteration.relationship(&id).ok_or(TransactionError::NotFound(id))
    }
}

/// A set of operations applied atomically to one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingTransaction {
    iteration: IterationId,
    operations: Vec<ThingOperation>,
}

impl ThingTransaction {
    pub fn new(iteration: IterationId) -> Self {
        Self {
            iteration,
            operations: Vec::new(),
        }
    }

    pub fn iteration(&self) -> IterationId {
        self.iteration
    }

    pub fn operations(&self) -> &[ThingOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<ThingOperation> {
        self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn create(&mut self, thing: Thing) -> &mut Self {
        self.operations.push(ThingOperation::CreateThing(thing));
        self
    }

    /// Queue an update; `thing` must be a modified clone of the cached thing
    pub fn update(&mut self, thing: Thing) -> &mut Self {
        self.operations.push(ThingOperation::UpdateThing(thing));
        self
    }

    pub fn delete(&mut self, id: ThingId) -> &mut Self {
        self.operations.push(ThingOperation::DeleteThing(id));
        self
    }

    pub fn create_relationship(&mut self, relationship: BinaryRelationship) -> &mut Self {
        self.operations.push(ThingOperation::CreateRelationship(relationship));
        self
    }

    pub fn update_relationship(&mut self, relationship: BinaryRelationship) -> &mut Self {
        self.operations.push(ThingOperation::UpdateRelationship(relationship));
        self
    }

    pub fn delete_relationship(&mut self, id: ThingId) -> &mut Self {
        self.operations.push(ThingOperation::DeleteRelationship(id));
        self
    }
}

/// Relationship edits offered on the selected matrix cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixCommand {
    /// Create a relationship with the row thing as source
    CreateRowToColumn,
    /// Create a relationship with the column thing as source
    CreateColumnToRow,
    /// Delete the relationship with the row thing as source
    DeleteRowToColumn,
    /// Delete the relationship with the column thing as source
    DeleteColumnToRow,
    /// Delete every relationship of the cell
    DeleteAll,
}

impl MatrixCommand {
    pub const ALL: [MatrixCommand; 5] = [
        MatrixCommand::CreateRowToColumn,
        MatrixCommand::CreateColumnToRow,
        MatrixCommand::DeleteRowToColumn,
        MatrixCommand::DeleteColumnToRow,
        MatrixCommand::DeleteAll,
    ];

    pub fn is_create(&self) -> bool {
        matches!(self, MatrixCommand::CreateRowToColumn | MatrixCommand::CreateColumnToRow)
    }
}

impl fmt::Display for MatrixCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatrixCommand::CreateRowToColumn => "create row to column relationship",
            MatrixCommand::CreateColumnToRow => "create column to row relationship",
            MatrixCommand::DeleteRowToColumn => "delete row to column relationship",
            MatrixCommand::DeleteColumnToRow => "delete column to row relationship",
            MatrixCommand::DeleteAll => "delete all relationships",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_builder() {
        let iteration = IterationId::new();
        let a = ThingId::new();
        let b = ThingId::new();
        let relationship = BinaryRelationship::new(a, b, ThingId::new());
        let relationship_id = relationship.id;

        let mut transaction = ThingTransaction::new(iteration);
        transaction
            .create_relationship(relationship)
            .delete_relationship(relationship_id);

        assert_eq!(transaction.iteration(), iteration);
        assert_eq!(transaction.operations().len(), 2);
        assert!(matches!(
            transaction.operations()[1],
            ThingOperation::DeleteRelationship(id) if id == relationship_id
        ));
    }

    #[test]
    fn test_operation_produces_event() {
        let mut iteration = Iteration::new(IterationId::new());
        let thing = Thing::new(ClassKind::Requirement, "R1", "r1");
        let id = thing.id;

        let event = ThingOperation::CreateThing(thing).apply(&mut iteration).unwrap();
        assert_eq!(event.kind, EventKind::Added);
        assert_eq!(event.changed.id(), id);

        let event = ThingOperation::DeleteThing(id).apply(&mut iteration).unwrap();
        assert_eq!(event.kind, EventKind::Removed);
        assert!(iteration.thing(&id).is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = TransactionError::PermissionDenied(ClassKind::BinaryRelationship);
        assert_eq!(err.to_string(), "permission denied to write BinaryRelationship");
    }

    #[test]
    fn test_command_serialization() {
        let serialized = serde_json::to_string(&MatrixCommand::DeleteAll).unwrap();
        let deserialized: MatrixCommand = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, MatrixCommand::DeleteAll);
        assert!(MatrixCommand::CreateColumnToRow.is_create());
    }
}
