//! Relationship matrix over an engineering model
//!
//! A two-dimensional read model showing, for a chosen relationship rule, which things on the
//! row axis are linked to which things on the column axis by binary relationships. The grid
//! is rebuilt when its configuration changes and patched cell by cell when relationships are
//! added or removed. Relationships are created and deleted from the selected cell through
//! copy-on-write transactions against the session's iteration.

pub mod aggregate;
pub mod commands;
pub mod events;
pub mod handlers;
pub mod projections;
pub mod queries;
pub mod settings;
pub mod value_objects;

// Re-export main types
pub use aggregate::*;
pub use events::*;

pub use commands::{MatrixCommand, ThingOperation, ThingTransaction, TransactionError, TransactionResult};

pub use handlers::{InMemorySession, PermissionService, Session, StaticPermissionService};

pub use projections::{
    CellKey, ColumnDefinition, EventOutcome, MatrixCell, MatrixError, MatrixGrid, MatrixProjection,
    MatrixResult, MatrixRow, RebuildRequest, RefreshSummary, RelationshipConfiguration, RelationshipMatrix,
    SourceConfiguration,
};

pub use queries::MatrixExport;

pub use settings::{PluginSettings, RuleReference, SavedConfiguration, SettingsError, SettingsResult};

pub use value_objects::{
    Axis, CategoryBooleanOperatorKind, ClassKind, DisplayKind, IterationId, RelationshipDirectionKind, SortOrder,
    ThingId,
};
