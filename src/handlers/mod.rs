//! Collaborator handlers
//!
//! The matrix never owns the object graph. It reads from and writes to a [`Session`] and asks
//! a [`PermissionService`] what the current user may do. Both are injected as trait objects;
//! in-memory implementations back the tests and the report binary.

mod permissions;
mod session;

pub use permissions::StaticPermissionService;
pub use session::InMemorySession;

use crate::aggregate::{BinaryRelationship, BinaryRelationshipRule, CategoryLibrary, DomainOfExpertise, Thing};
use crate::commands::{ThingTransaction, TransactionResult};
use crate::events::MessageBus;
use crate::value_objects::{ClassKind, IterationId, ThingId};
use async_trait::async_trait;
use std::sync::Arc;

/// Access to the live object graph of an open model
#[async_trait]
pub trait Session: Send + Sync {
    /// All live things of the given kinds in the iteration
    fn things(&self, iteration: IterationId, kinds: &[ClassKind]) -> Vec<Arc<Thing>>;

    /// A single live thing
    fn thing(&self, iteration: IterationId, id: &ThingId) -> Option<Arc<Thing>>;

    /// All relationships tagged with `category` in the iteration
    fn relationships(&self, iteration: IterationId, category: &ThingId) -> Vec<Arc<BinaryRelationship>>;

    /// The category reference data visible from the iteration
    fn categories(&self, iteration: IterationId) -> Arc<CategoryLibrary>;

    /// The relationship rules visible from the iteration
    fn rules(&self, iteration: IterationId) -> Vec<Arc<BinaryRelationshipRule>>;

    /// Domains of expertise taking part in the iteration
    fn active_domains(&self, iteration: IterationId) -> Vec<DomainOfExpertise>;

    /// Domain the current user is working as
    fn active_domain(&self, iteration: IterationId) -> Option<ThingId>;

    /// Bus on which change events are published
    fn message_bus(&self) -> &MessageBus;

    /// Apply a transaction atomically; nothing is changed when an error is returned
    async fn write(&self, transaction: ThingTransaction) -> TransactionResult<()>;
}

/// Read/write permission checks for the current user
pub trait PermissionService: Send + Sync {
    /// Whether things of `kind` may be created in the iteration
    fn can_write_kind(&self, kind: ClassKind, iteration: IterationId) -> bool;

    /// Whether the given thing may be modified
    fn can_write(&self, thing: &Thing) -> bool;

    /// Whether the given thing may be inspected
    fn can_read(&self, thing: &Thing) -> bool;
}
