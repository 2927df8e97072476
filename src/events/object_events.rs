//! Object change events
//!
//! Every write against the object graph publishes one [`ObjectChangedEvent`] per affected
//! thing. Subscribers pick the events they care about with a [`ChangeScope`].

use crate::aggregate::{BinaryRelationship, BinaryRelationshipRule, Category, Thing};
use crate::value_objects::{ClassKind, IterationId, ThingId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What happened to the changed thing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Added,
    Updated,
    Removed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Added => "added",
            EventKind::Updated => "updated",
            EventKind::Removed => "removed",
        }
    }
}

/// The thing carried by a change event
#[derive(Debug, Clone, PartialEq)]
pub enum ChangedThing {
    Thing(Arc<Thing>),
    Relationship(Arc<BinaryRelationship>),
    Category(Category),
    Rule(Arc<BinaryRelationshipRule>),
}

impl ChangedThing {
    /// Identifier of the changed thing
    pub fn id(&self) -> ThingId {
        match self {
            ChangedThing::Thing(t) => t.id,
            ChangedThing::Relationship(r) => r.id,
            ChangedThing::Category(c) => c.id,
            ChangedThing::Rule(r) => r.id,
        }
    }

    /// Class kind of the changed thing
    pub fn class_kind(&self) -> ClassKind {
        match self {
            ChangedThing::Thing(t) => t.class_kind,
            ChangedThing::Relationship(_) => ClassKind::BinaryRelationship,
            ChangedThing::Category(_) => ClassKind::Category,
            ChangedThing::Rule(_) => ClassKind::BinaryRelationshipRule,
        }
    }
}

/// A change notification from the object graph
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectChangedEvent {
    /// Iteration the change happened in
    pub iteration: IterationId,
    /// Kind of change
    pub kind: EventKind,
    /// The changed thing, in its state after the change (before it, for removals)
    pub changed: ChangedThing,
    /// When the change was published
    pub occurred_at: DateTime<Utc>,
}

impl ObjectChangedEvent {
    pub fn new(iteration: IterationId, kind: EventKind, changed: ChangedThing) -> Self {
        Self {
            iteration,
            kind,
            changed,
            occurred_at: Utc::now(),
        }
    }

    /// Subject used when logging the event
    pub fn subject(&self) -> String {
        format!(
            "things.{}.{}.v1",
            self.changed.class_kind().as_str().to_lowercase(),
            self.kind.as_str()
        )
    }
}

/// Filter selecting which change events a subscriber receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeScope {
    /// Every event
    All,
    /// Events about things of one class kind
    Kind(ClassKind),
    /// Events about one specific thing
    Instance(ThingId),
}

impl ChangeScope {
    pub fn matches(&self, event: &ObjectChangedEvent) -> bool {
        match self {
            ChangeScope::All => true,
            ChangeScope::Kind(kind) => event.changed.class_kind() == *kind,
            ChangeScope::Instance(id) => event.changed.id() == *id,
        }
    }
}
