//! # Events
//!
//! Typed publish/subscribe channel. Each component owns one `Events<E>` for
//! its own event enum; collaborators (UI, voice, gamification) subscribe.

use tokio::sync::broadcast;

/// Default number of events buffered per subscriber before the slowest
/// subscriber starts lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A broadcast channel for one kind of component event.
///
/// Publishing never blocks. Events published while nobody is subscribed are
/// dropped. Every subscriber observes events in publish order.
#[derive(Debug, Clone)]
pub struct Events<E: Clone> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> Events<E> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: E) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event published with no subscribers");
        }
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<E: Clone> Default for Events<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Drain every event currently buffered for `rx` without waiting.
pub fn drain<E: Clone>(rx: &mut broadcast::Receiver<E>) -> Vec<E> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event subscriber lagged");
            }
            Err(_) => break,
        }
    }
    events
}
