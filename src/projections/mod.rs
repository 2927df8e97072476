//! Relationship matrix projections
//!
//! Read models kept in sync with the object graph: the two axis configurations, the rule
//! configuration, the matrix grid and the orchestrator tying them to change events.

pub mod grid;
pub mod matrix;
pub mod matrix_cell;
pub mod relationship_configuration;
pub mod relationship_matrix;
pub mod source_configuration;

pub use grid::*;
pub use matrix::*;
pub use matrix_cell::*;
pub use relationship_configuration::*;
pub use relationship_matrix::*;
pub use source_configuration::*;

use crate::commands::{MatrixCommand, TransactionError};
use crate::value_objects::{Axis, ClassKind};
use thiserror::Error;

/// Result type for matrix operations
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Errors raised by the matrix
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("{kind} things cannot be displayed on the {axis} axis")]
    UnexpectedKind { axis: Axis, kind: ClassKind },

    #[error("{0} is not available for the selected cell")]
    CommandDisabled(MatrixCommand),

    #[error("no cell is selected")]
    NoSelection,

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}
