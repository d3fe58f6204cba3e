//! `RelayServer` — axum HTTP + WebSocket server wiring.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use duplex_core::{ConnectionId, ConnectionRegistry, EventRouter, EventSink, MessageStore};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::health::{self, HealthResponse};
use crate::rest;
use crate::shutdown::ShutdownCoordinator;
use crate::ws::gateway::PeerGateway;
use crate::ws::session::{SessionConfig, run_ws_session};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The relay core.
    pub relay: Arc<EventRouter>,
    /// Live peer table / delivery sink.
    pub gateway: Arc<PeerGateway>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: RelayConfig,
    /// When the server started.
    pub start_time: Instant,
}

/// The relay server: core + transport, ready to listen.
pub struct RelayServer {
    config: RelayConfig,
    relay: Arc<EventRouter>,
    gateway: Arc<PeerGateway>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl RelayServer {
    /// Wire up the relay from configuration.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let gateway = Arc::new(PeerGateway::new(config.max_send_drops));
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(
            config.grace_window_secs,
        )));
        let store = MessageStore::with_capacity(config.max_history_per_room);
        let sink: Arc<dyn EventSink> = gateway.clone();
        let relay = Arc::new(EventRouter::new(registry, store, sink));
        Self {
            config,
            relay,
            gateway,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            relay: self.relay.clone(),
            gateway: self.gateway.clone(),
            shutdown: self.shutdown.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ws", get(ws_handler))
            .route("/users/online", get(rest::online_users))
            .route("/messages/{room_id}", get(rest::room_history))
            .route("/messages", post(rest::post_message))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve. Returns the bound address (useful with port `0`)
    /// and the serve task, which ends when shutdown is initiated.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
        });
        Ok((addr, handle))
    }

    /// The relay core.
    pub fn relay(&self) -> &Arc<EventRouter> {
        &self.relay
    }

    /// The peer gateway.
    pub fn gateway(&self) -> &Arc<PeerGateway> {
        &self.gateway
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let resp = health::health_check(
        state.start_time,
        state.gateway.connection_count(),
        state.relay.registry().online_users().len(),
        state.relay.rooms().room_count(),
        state.relay.store().total(),
    );
    Json(resp)
}

/// GET /ws — upgrade into a relay session.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.gateway.connection_count() >= state.config.max_connections {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let session_config = SessionConfig {
        ping_interval: Duration::from_secs(state.config.heartbeat_interval_secs),
        pong_timeout: Duration::from_secs(state.config.heartbeat_timeout_secs),
        queue_capacity: state.config.send_queue_capacity,
    };
    let relay = state.relay.clone();
    let gateway = state.gateway.clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(socket, ConnectionId::new(), relay, gateway, session_config)
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
