//! Per-client connection state for the WebSocket gateway.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use duplex_core::ConnectionId;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One connected WebSocket client.
///
/// Carries the bounded send queue to the client's write task, liveness
/// state for the heartbeat, and a cancellation token the gateway uses to
/// force-close a peer that keeps dropping messages.
pub struct Peer {
    /// Connection identity, shared with the relay core.
    pub id: ConnectionId,
    /// Queue to the connection's outbound writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last ping.
    is_alive: AtomicBool,
    /// When the last Pong (or any liveness signal) was received.
    last_pong: Mutex<Instant>,
    /// Events dropped because the queue was full or closed.
    dropped_events: AtomicU64,
    /// Cancelled to tear the session down from outside the session task.
    closer: CancellationToken,
}

impl Peer {
    /// Create a peer around its outbound queue.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_events: AtomicU64::new(0),
            closer: CancellationToken::new(),
        }
    }

    /// Enqueue a serialized event for this client.
    ///
    /// Never blocks. Returns `false` — and counts the drop — when the
    /// queue is full or the session is gone.
    pub fn send(&self, payload: Arc<String>) -> bool {
        if self.tx.try_send(payload).is_ok() {
            true
        } else {
            let _ = self.dropped_events.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total events dropped for this peer.
    pub fn drop_count(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Token cancelled when the peer should be torn down.
    pub fn close_token(&self) -> CancellationToken {
        self.closer.clone()
    }

    /// Request teardown of this peer's session.
    pub fn close(&self) {
        self.closer.cancel();
    }

    /// Record a liveness signal (pong or inbound traffic).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Check and reset the liveness flag.
    ///
    /// Returns `true` if the peer showed life since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last liveness signal.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
