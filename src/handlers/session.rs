//! In-memory session

use super::{PermissionService, Session};
use crate::aggregate::{
    BinaryRelationship, BinaryRelationshipRule, Category, CategoryLibrary, DomainOfExpertise, Iteration,
    IterationData, Thing,
};
use crate::commands::{ThingTransaction, TransactionError, TransactionResult};
use crate::events::{ChangedThing, EventKind, MessageBus, ObjectChangedEvent};
use crate::value_objects::{ClassKind, IterationId, ThingId};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, warn};

/// Session over a single iteration held in memory.
///
/// Writes are copy-on-write: the iteration is cloned, the transaction is applied to the clone
/// and the clone replaces the live iteration only when every operation succeeded. Events are
/// published after the swap.
pub struct InMemorySession {
    iteration: RwLock<Iteration>,
    bus: MessageBus,
    permissions: Option<Arc<dyn PermissionService>>,
    injected_failure: Mutex<Option<TransactionError>>,
}

impl InMemorySession {
    pub fn new(iteration: Iteration) -> Self {
        Self {
            iteration: RwLock::new(iteration),
            bus: MessageBus::new(),
            permissions: None,
            injected_failure: Mutex::new(None),
        }
    }

    pub fn from_data(data: IterationData) -> Self {
        Self::new(Iteration::from_data(data))
    }

    /// Check write permissions against `permissions` when applying transactions
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionService>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn iteration_id(&self) -> IterationId {
        self.iteration.read().id()
    }

    /// A copy of the current iteration
    pub fn snapshot(&self) -> Iteration {
        self.iteration.read().clone()
    }

    /// Make the next write fail with `error` without touching the iteration
    pub fn fail_next_write(&self, error: TransactionError) {
        *self.injected_failure.lock() = Some(error);
    }

    /// Add or replace a category and notify subscribers
    pub fn upsert_category(&self, category: Category) {
        let kind = {
            let mut iteration = self.iteration.write();
            let kind = if iteration.categories().get(&category.id).is_some() {
                EventKind::Updated
            } else {
                EventKind::Added
            };
            iteration.upsert_category(category.clone());
            kind
        };
        self.publish(vec![ObjectChangedEvent::new(
            self.iteration_id(),
            kind,
            ChangedThing::Category(category),
        )]);
    }

    /// Add or replace a relationship rule and notify subscribers
    pub fn upsert_rule(&self, rule: BinaryRelationshipRule) {
        let kind = {
            let mut iteration = self.iteration.write();
            let kind = if iteration.rules().iter().any(|r| r.id == rule.id) {
                EventKind::Updated
            } else {
                EventKind::Added
            };
            iteration.upsert_rule(rule.clone());
            kind
        };
        self.publish(vec![ObjectChangedEvent::new(
            self.iteration_id(),
            kind,
            ChangedThing::Rule(Arc::new(rule)),
        )]);
    }

    pub fn remove_rule(&self, id: &ThingId) -> TransactionResult<()> {
        let removed = self.iteration.write().remove_rule(id)?;
        self.publish(vec![ObjectChangedEvent::new(
            self.iteration_id(),
            EventKind::Removed,
            ChangedThing::Rule(removed),
        )]);
        Ok(())
    }

    pub fn set_active_domain(&self, domain: Option<ThingId>) {
        self.iteration.write().set_active_domain(domain);
    }

    fn check_permissions(&self, iteration: &Iteration, transaction: &ThingTransaction) -> TransactionResult<()> {
        let Some(permissions) = &self.permissions else {
            return Ok(());
        };

        for operation in transaction.operations() {
            if let Some(kind) = operation.class_kind(iteration) {
                if !permissions.can_write_kind(kind, iteration.id()) {
                    return Err(TransactionError::PermissionDenied(kind));
                }
            }
        }
        Ok(())
    }

    fn publish(&self, events: Vec<ObjectChangedEvent>) {
        for event in &events {
            debug!(subject = %event.subject(), id = %event.changed.id(), "Publishing change");
            self.bus.publish(event);
        }
    }
}

#[async_trait]
impl Session for InMemorySession {
    fn things(&self, iteration: IterationId, kinds: &[ClassKind]) -> Vec<Arc<Thing>> {
        let current = self.iteration.read();
        if current.id() != iteration {
            return Vec::new();
        }
        current.things_of_kinds(kinds)
    }

    fn thing(&self, iteration: IterationId, id: &ThingId) -> Option<Arc<Thing>> {
        let current = self.iteration.read();
        if current.id() != iteration {
            return None;
        }
        current.thing(id)
    }

    fn relationships(&self, iteration: IterationId, category: &ThingId) -> Vec<Arc<BinaryRelationship>> {
        let current = self.iteration.read();
        if current.id() != iteration {
            return Vec::new();
        }
        current.relationships_in_category(category)
    }

    fn categories(&self, _iteration: IterationId) -> Arc<CategoryLibrary> {
        self.iteration.read().categories()
    }

    fn rules(&self, _iteration: IterationId) -> Vec<Arc<BinaryRelationshipRule>> {
        self.iteration.read().rules()
    }

    fn active_domains(&self, iteration: IterationId) -> Vec<DomainOfExpertise> {
        let current = self.iteration.read();
        if current.id() != iteration {
            return Vec::new();
        }
        current.domains()
    }

    fn active_domain(&self, iteration: IterationId) -> Option<ThingId> {
        let current = self.iteration.read();
        if current.id() != iteration {
            return None;
        }
        current.active_domain()
    }

    fn message_bus(&self) -> &MessageBus {
        &self.bus
    }

    async fn write(&self, transaction: ThingTransaction) -> TransactionResult<()> {
        if let Some(error) = self.injected_failure.lock().take() {
            warn!(error = %error, "Rejecting write");
            return Err(error);
        }

        let events = {
            let mut live = self.iteration.write();
            if live.id() != transaction.iteration() {
                return Err(TransactionError::UnknownIteration(transaction.iteration()));
            }
            self.check_permissions(&live, &transaction)?;

            let mut working = live.clone();
            let mut events = Vec::with_capacity(transaction.operations().len());
            for operation in transaction.into_operations() {
                events.push(operation.apply(&mut working)?);
            }

            *live = working;
            events
        };

        debug!(operations = events.len(), "Transaction applied");
        self.publish(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeScope;
    use crate::handlers::StaticPermissionService;

    fn session_with_two_elements() -> (InMemorySession, ThingId, ThingId) {
        let mut iteration = Iteration::new(IterationId::new());
        let a = Thing::new(ClassKind::ElementDefinition, "a", "a");
        let b = Thing::new(ClassKind::ElementDefinition, "b", "b");
        let (a_id, b_id) = (a.id, b.id);
        iteration.add_thing(a).unwrap();
        iteration.add_thing(b).unwrap();
        (InMemorySession::new(iteration), a_id, b_id)
    }

    #[tokio::test]
    async fn test_write_publishes_events() {
        let (session, a, b) = session_with_two_elements();
        let subscription = session.message_bus().listen(ChangeScope::Kind(ClassKind::BinaryRelationship));
        let category = ThingId::new();

        let mut transaction = ThingTransaction::new(session.iteration_id());
        transaction.create_relationship(BinaryRelationship::new(a, b, category));
        session.write(transaction).await.unwrap();

        assert_eq!(session.relationships(session.iteration_id(), &category).len(), 1);
        let events = subscription.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Added);
    }

    #[tokio::test]
    async fn test_failed_write_is_atomic() {
        let (session, a, b) = session_with_two_elements();
        let subscription = session.message_bus().listen(ChangeScope::All);
        let category = ThingId::new();

        let mut transaction = ThingTransaction::new(session.iteration_id());
        transaction
            .create_relationship(BinaryRelationship::new(a, b, category))
            .delete_relationship(ThingId::new());

        assert!(matches!(
            session.write(transaction).await,
            Err(TransactionError::NotFound(_))
        ));
        assert!(session.relationships(session.iteration_id(), &category).is_empty());
        assert!(subscription.drain().is_empty());
    }

    #[tokio::test]
    async fn test_write_checks_permissions() {
        let permissions = Arc::new(StaticPermissionService::allow_all());
        permissions.deny_write_kind(ClassKind::BinaryRelationship);
        let (session, a, b) = session_with_two_elements();
        let session = session.with_permissions(permissions);

        let mut transaction = ThingTransaction::new(session.iteration_id());
        transaction.create_relationship(BinaryRelationship::new(a, b, ThingId::new()));

        assert_eq!(
            session.write(transaction).await,
            Err(TransactionError::PermissionDenied(ClassKind::BinaryRelationship))
        );
    }

    #[tokio::test]
    async fn test_unknown_iteration_and_injected_failure() {
        let (session, a, b) = session_with_two_elements();

        let mut transaction = ThingTransaction::new(IterationId::new());
        transaction.create_relationship(BinaryRelationship::new(a, b, ThingId::new()));
        assert!(matches!(
            session.write(transaction).await,
            Err(TransactionError::UnknownIteration(_))
        ));

        session.fail_next_write(TransactionError::Transport("connection reset".to_string()));
        let transaction = ThingTransaction::new(session.iteration_id());
        assert!(session.write(transaction.clone()).await.is_err());
        assert!(session.write(transaction).await.is_ok());
    }

    #[test]
    fn test_reads_are_scoped_to_the_iteration() {
        let (session, a, _) = session_with_two_elements();
        let other = IterationId::new();

        assert!(session.thing(session.iteration_id(), &a).is_some());
        assert!(session.thing(other, &a).is_none());
        assert!(session.things(other, &[ClassKind::ElementDefinition]).is_empty());
    }
}
