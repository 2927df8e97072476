//! Object graph events
//!
//! Change notifications published by a session after each successful write, and the
//! bus that routes them to subscribers.

mod message_bus;
mod object_events;

pub use message_bus::{MessageBus, Subscription};
pub use object_events::{ChangeScope, ChangedThing, EventKind, ObjectChangedEvent};
