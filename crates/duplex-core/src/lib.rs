//! # duplex-core
//!
//! State machine for a two-party real-time message relay.
//!
//! - Connection registry with presence and grace-period eviction
//! - Deterministic pairwise rooms and connection membership
//! - Append-only per-room message log with process-wide message IDs
//! - Presence fan-out translation (pure)
//! - Event routing with an `Anonymous → Authenticated → Closed` session
//!   state machine; malformed or out-of-precondition events are dropped
//!
//! Transport-agnostic: outbound delivery goes through the [`EventSink`]
//! seam, implemented by the WebSocket gateway in `duplex-server`.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod presence;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod sink;
pub mod store;
pub mod user;

pub use events::{ClientEvent, ServerEvent, UserSummary};
pub use ids::{ConnectionId, RoomId};
pub use registry::ConnectionRegistry;
pub use rooms::RoomDirectory;
pub use router::{EventRouter, PostMessageError};
pub use sink::{EventSink, RecordingSink};
pub use store::{Message, MessageStore};
pub use user::{InvalidUsername, Presence, User, Username};
