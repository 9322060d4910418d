//! Call event fan-out
//!
//! Domain events produced by the lifecycle manager are pushed to every
//! subscriber through a tokio broadcast channel.

use crate::domain::call::CallEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Event broadcaster
pub struct CallEventBroadcaster {
    tx: broadcast::Sender<CallEvent>,
}

impl CallEventBroadcaster {
    /// Create new event broadcaster with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event
    pub fn broadcast(&self, event: CallEvent) {
        let event_type = event.event_type();
        let call_id = *event.call_id();

        // Sending only fails when nobody is listening
        match self.tx.send(event) {
            Ok(receivers) => debug!(event_type, %call_id, receivers, "Broadcast call event"),
            Err(_) => debug!(event_type, %call_id, "No subscribers for call event"),
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CallEventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}
