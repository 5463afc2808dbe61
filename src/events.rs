//! Store event broadcast
//!
//! `get` and `set` emit notification events carrying the affected entry so
//! external collaborators (audit, logging) can observe traffic without being
//! coupled to the store.
//!
//! ## Delivery Semantics
//!
//! Broadcast, not a queue: every subscriber sees its own copy of each event.
//! Delivery is strictly non-blocking and best-effort. A subscriber whose
//! channel is full simply misses events; it never slows down the caller that
//! performed the operation. Subscribers that dropped their receiver are
//! pruned on the next publish.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde_json::Value;

/// Default per-subscriber channel capacity
const DEFAULT_CAPACITY: usize = 64;

/// Kind of store operation an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A key was read and found
    Get,

    /// A key was written
    Set,
}

/// A notification carrying the affected entry
#[derive(Debug, Clone)]
pub struct Event {
    /// Which operation produced the event
    pub kind: EventKind,

    /// The affected key
    pub key: String,

    /// The semantic value read or written
    pub value: Value,
}

/// Fan-out of store events to registered subscribers
pub struct EventBus {
    /// Live subscriber channels; pruned when a receiver disconnects
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a subscriber and return its receiving end
    ///
    /// The channel holds a bounded number of undelivered events; beyond
    /// that, new events are dropped for this subscriber.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = bounded(DEFAULT_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Publish an event to every subscriber, never blocking
    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }

        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            // Slow subscriber: drop the event, keep the channel
            Err(TrySendError::Full(_)) => true,
            // Receiver dropped: prune
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
