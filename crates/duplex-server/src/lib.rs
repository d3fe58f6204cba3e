//! # duplex-server
//!
//! Axum HTTP + `WebSocket` transport for the duplex relay.
//!
//! - `WebSocket` gateway: peer tracking, bounded per-connection send
//!   queues, heartbeat, slow-client isolation
//! - REST surface sharing one message log with the realtime path
//! - Health endpoint, configuration with env overrides, graceful shutdown

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod rest;
pub mod server;
pub mod shutdown;
pub mod ws;
