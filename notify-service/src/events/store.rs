//! Bounded in-memory event history.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::model::{Event, EventDraft};

/// Default number of events kept in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Storage for notification events.
///
/// Implementations own their history exclusively; every read returns owned
/// copies.
pub trait EventStore: Send + Sync {
    /// Assign an identity to `draft`, append it and return the stored event.
    fn add(&self, draft: EventDraft) -> Event;

    /// Most recently added event, if any.
    fn latest(&self) -> Option<Event>;

    /// Up to `n` most recent events, oldest first.
    fn recent(&self, n: usize) -> Vec<Event>;

    /// Number of events currently retained.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of events retained.
    fn capacity(&self) -> usize;

    /// Number of events ever added, including evicted ones.
    fn total_added(&self) -> u64;
}

#[derive(Debug)]
struct History {
    events: VecDeque<Event>,
    total_added: u64,
}

/// [`EventStore`] backed by a FIFO ring of fixed capacity.
///
/// The lock is only held to push/pop or to clone the requested slice.
#[derive(Debug)]
pub struct InMemoryEventStore {
    capacity: usize,
    history: Mutex<History>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a store retaining at most `capacity` events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: Mutex::new(History {
                events: VecDeque::with_capacity(capacity),
                total_added: 0,
            }),
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for InMemoryEventStore {
    fn add(&self, draft: EventDraft) -> Event {
        let event = Event::from_draft(Uuid::new_v4(), draft, Utc::now());

        let mut history = self.history.lock();
        while history.events.len() >= self.capacity {
            if let Some(evicted) = history.events.pop_front() {
                debug!(event_id = %evicted.id(), "Evicted oldest event from history");
            }
        }
        history.events.push_back(event.clone());
        history.total_added += 1;

        event
    }

    fn latest(&self) -> Option<Event> {
        self.history.lock().events.back().cloned()
    }

    fn recent(&self, n: usize) -> Vec<Event> {
        if n == 0 {
            return Vec::new();
        }

        let history = self.history.lock();
        let skip = history.events.len().saturating_sub(n);
        history.events.iter().skip(skip).cloned().collect()
    }

    fn len(&self) -> usize {
        self.history.lock().events.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn total_added(&self) -> u64 {
        self.history.lock().total_added
    }
}
