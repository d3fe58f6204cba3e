//! The delivery seam between the router and the transport.

use parking_lot::Mutex;

use crate::events::ServerEvent;
use crate::ids::ConnectionId;

/// Delivers outbound events to connections.
///
/// Implementations must be fire-and-forget: `send` may not block, and a
/// failure to deliver to one recipient (returning `false`) must not affect
/// delivery to any other. The WebSocket gateway implements this with a
/// bounded per-connection queue; tests use [`RecordingSink`].
pub trait EventSink: Send + Sync {
    /// Deliver one event to one connection. Returns whether the event was
    /// accepted for delivery.
    fn send(&self, to: &ConnectionId, event: &ServerEvent) -> bool;
}

/// Test sink that records every delivery.
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(ConnectionId, ServerEvent)>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All deliveries so far, in send order.
    pub fn deliveries(&self) -> Vec<(ConnectionId, ServerEvent)> {
        self.deliveries.lock().clone()
    }

    /// Deliveries addressed to one connection, in send order.
    pub fn sent_to(&self, to: &ConnectionId) -> Vec<ServerEvent> {
        self.deliveries
            .lock()
            .iter()
            .filter(|(conn, _)| conn == to)
            .map(|(_, ev)| ev.clone())
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.deliveries.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn send(&self, to: &ConnectionId, event: &ServerEvent) -> bool {
        self.deliveries.lock().push((to.clone(), event.clone()));
        true
    }
}
