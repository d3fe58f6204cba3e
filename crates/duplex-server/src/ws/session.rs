//! WebSocket session lifecycle — one connected client from upgrade
//! through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use duplex_core::{ClientEvent, ConnectionId, EventRouter};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::gateway::PeerGateway;
use super::peer::Peer;

/// Transport knobs for one session, derived from the relay config.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Interval between server-initiated Ping frames.
    pub ping_interval: Duration,
    /// How long without a Pong before the client is considered dead.
    pub pong_timeout: Duration,
    /// Outbound queue depth per connection.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(90),
            queue_capacity: 256,
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the peer with the gateway so fan-out can reach it
/// 2. Forwards queued outbound events, interleaved with Ping frames
/// 3. Parses incoming frames as [`ClientEvent`] and feeds the router;
///    malformed frames are dropped without failing the connection
/// 4. On close (client frame, transport loss, heartbeat timeout, or a
///    gateway-initiated cancel) tears down and reports the disconnect,
///    which starts the grace window
#[instrument(skip_all, fields(connection_id = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: ConnectionId,
    router: Arc<EventRouter>,
    gateway: Arc<PeerGateway>,
    config: SessionConfig,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.queue_capacity);
    let peer = Arc::new(Peer::new(connection_id.clone(), send_tx));
    let close = peer.close_token();
    gateway.add(peer.clone());
    info!("client connected");

    // Outbound forwarder with periodic Ping frames.
    let outbound_peer = peer.clone();
    let outbound_close = close.clone();
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(config.ping_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_peer.check_alive()
                        && outbound_peer.last_pong_elapsed() > config.pong_timeout
                    {
                        warn!(
                            "client unresponsive for {:?}, disconnecting",
                            config.pong_timeout
                        );
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_close.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Inbound loop. Ends on client close, transport error, or forced close.
    loop {
        let message = tokio::select! {
            next = ws_rx.next() => match next {
                Some(Ok(msg)) => msg,
                _ => break,
            },
            () = close.cancelled() => break,
        };

        let text = match message {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => Some(s.to_string()),
                Err(_) => {
                    debug!(len = data.len(), "non-UTF8 binary frame dropped");
                    None
                }
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                peer.mark_alive();
                None
            }
        };

        let Some(text) = text else { continue };

        match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => router.handle(&connection_id, event),
            Err(e) => debug!(error = %e, "malformed frame dropped"),
        }
    }

    // Clean up. The disconnect starts the registry's grace window and
    // fans out userDisconnected to everyone else.
    info!("client disconnected");
    outbound.abort();
    let _ = gateway.remove(&connection_id);
    router.connection_closed(&connection_id);
}
