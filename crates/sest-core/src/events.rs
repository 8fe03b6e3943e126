use tokio::sync::broadcast;

use sest_types::events::IngestEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of ingestion events to whoever subscribed (notifiers, tests).
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IngestEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns how many subscribers received it; having
    /// none is not an error.
    pub fn publish(&self, event: IngestEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
