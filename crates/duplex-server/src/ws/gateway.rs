//! The peer table and the relay's outbound delivery sink.

use std::collections::HashMap;
use std::sync::Arc;

use duplex_core::{ConnectionId, EventSink, ServerEvent};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::peer::Peer;

/// Default ceiling on lifetime drops before a peer is force-closed.
pub const DEFAULT_MAX_SEND_DROPS: u64 = 100;

/// Connection table implementing [`EventSink`] for the event router.
///
/// Delivery is isolated per recipient: a full or dead queue drops that one
/// event, and a peer that keeps dropping past the threshold gets its
/// session cancelled. Nothing here ever blocks on a slow client.
pub struct PeerGateway {
    peers: RwLock<HashMap<ConnectionId, Arc<Peer>>>,
    max_drops: u64,
}

impl PeerGateway {
    /// Create a gateway with the given slow-peer drop threshold.
    #[must_use]
    pub fn new(max_drops: u64) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            max_drops,
        }
    }

    /// Track a newly connected peer.
    pub fn add(&self, peer: Arc<Peer>) {
        let _ = self.peers.write().insert(peer.id.clone(), peer);
    }

    /// Stop tracking a peer; returns it if it was known.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<Peer>> {
        self.peers.write().remove(id)
    }

    /// Look up a live peer.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Peer>> {
        self.peers.read().get(id).cloned()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Request teardown of every live session (used during shutdown).
    pub fn close_all(&self) {
        for peer in self.peers.read().values() {
            peer.close();
        }
    }
}

impl Default for PeerGateway {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEND_DROPS)
    }
}

impl EventSink for PeerGateway {
    fn send(&self, to: &ConnectionId, event: &ServerEvent) -> bool {
        let Some(peer) = self.get(to) else {
            // Normal for notifications addressed to users whose connection
            // is already gone.
            debug!(to = %to, event = event.kind(), "recipient not connected");
            return false;
        };
        let payload = match serde_json::to_string(event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(event = event.kind(), error = %e, "failed to serialize event");
                return false;
            }
        };
        if peer.send(payload) {
            return true;
        }
        let drops = peer.drop_count();
        if drops >= self.max_drops {
            warn!(to = %to, drops, "closing slow client");
            peer.close();
        } else {
            debug!(to = %to, event = event.kind(), drops, "send queue full, event dropped");
        }
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
