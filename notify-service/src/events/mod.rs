//! Notification events and their bounded history.

pub mod model;
pub mod store;

pub use model::{Event, EventDraft, EventId, Severity};
pub use store::{DEFAULT_HISTORY_CAPACITY, EventStore, InMemoryEventStore};
