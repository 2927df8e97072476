//! Publish/subscribe bus for object change events
//!
//! Publishers may run on any thread; each subscriber owns a [`Subscription`] whose queue
//! is drained on the thread that owns the subscriber's state.

use super::{ChangeScope, ObjectChangedEvent};
use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

struct Listener {
    scope: ChangeScope,
    sender: Sender<ObjectChangedEvent>,
}

/// Bus delivering change events to scoped subscribers
#[derive(Default)]
pub struct MessageBus {
    listeners: Mutex<Vec<Listener>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events matching `scope`
    pub fn listen(&self, scope: ChangeScope) -> Subscription {
        let (sender, receiver) = unbounded();
        self.listeners.lock().push(Listener { scope, sender });
        Subscription { scope, receiver }
    }

    /// Deliver an event to every matching subscriber, dropping subscribers that went away
    pub fn publish(&self, event: &ObjectChangedEvent) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| {
            // disconnected listeners are only noticed when an event is sent to them
            !listener.scope.matches(event) || listener.sender.send(event.clone()).is_ok()
        });
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Handle on the events delivered to one subscriber
pub struct Subscription {
    scope: ChangeScope,
    receiver: Receiver<ObjectChangedEvent>,
}

impl Subscription {
    pub fn scope(&self) -> ChangeScope {
        self.scope
    }

    /// Take the next pending event, if any
    pub fn try_next(&self) -> Option<ObjectChangedEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every pending event, in publication order
    pub fn drain(&self) -> Vec<ObjectChangedEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Thing;
    use crate::events::{ChangedThing, EventKind};
    use crate::value_objects::{ClassKind, IterationId};
    use std::sync::Arc;

    fn added(kind: ClassKind) -> ObjectChangedEvent {
        ObjectChangedEvent::new(
            IterationId::new(),
            EventKind::Added,
            ChangedThing::Thing(Arc::new(Thing::new(kind, "t", "t"))),
        )
    }

    #[test]
    fn test_scoped_delivery() {
        let bus = MessageBus::new();
        let requirements = bus.listen(ChangeScope::Kind(ClassKind::Requirement));
        let everything = bus.listen(ChangeScope::All);

        bus.publish(&added(ClassKind::Requirement));
        bus.publish(&added(ClassKind::ElementDefinition));

        assert_eq!(requirements.drain().len(), 1);
        assert_eq!(everything.drain().len(), 2);
        assert!(everything.try_next().is_none());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let bus = MessageBus::new();
        let kept = bus.listen(ChangeScope::All);
        drop(bus.listen(ChangeScope::All));
        assert_eq!(bus.listener_count(), 2);

        bus.publish(&added(ClassKind::Requirement));

        assert_eq!(bus.listener_count(), 1);
        assert_eq!(kept.pending(), 1);
    }
}
