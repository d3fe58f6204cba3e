//! Append-only per-room message log.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::ids::RoomId;
use crate::user::Username;

/// A stored chat message. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Process-wide monotonically increasing ID.
    pub id: u64,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Display name of the sender.
    pub sender: Username,
    /// Message body.
    pub text: String,
    /// RFC 3339 UTC timestamp assigned at append time.
    pub timestamp: String,
}

/// Holds the ordered message log of every room.
///
/// Appends are serialized per store; within a room, `history` always
/// returns messages in append order with strictly increasing IDs.
pub struct MessageStore {
    inner: RwLock<Inner>,
    /// Per-room retention cap; `0` disables trimming.
    max_per_room: usize,
}

struct Inner {
    rooms: HashMap<RoomId, VecDeque<Message>>,
    next_id: u64,
}

impl MessageStore {
    /// Create a store with unbounded per-room history.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a store that retains at most `max_per_room` messages per room.
    ///
    /// When the cap is reached the oldest messages are dropped on append.
    /// `0` means unbounded.
    #[must_use]
    pub fn with_capacity(max_per_room: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                rooms: HashMap::new(),
                next_id: 1,
            }),
            max_per_room,
        }
    }

    /// Append a message to a room's log and return the stored record.
    ///
    /// The ID is assigned under the same lock as the append, so IDs within
    /// a room increase in append order.
    pub fn append(&self, room_id: &RoomId, sender: &Username, text: &str) -> Message {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        let message = Message {
            id,
            room_id: room_id.clone(),
            sender: sender.clone(),
            text: text.to_owned(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let log = inner.rooms.entry(room_id.clone()).or_default();
        if self.max_per_room > 0 && log.len() == self.max_per_room {
            let _ = log.pop_front();
        }
        log.push_back(message.clone());
        message
    }

    /// Full history of a room, oldest first. Empty if the room has no
    /// messages yet (not an error).
    pub fn history(&self, room_id: &RoomId) -> Vec<Message> {
        self.inner
            .read()
            .rooms
            .get(room_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of messages currently retained for a room.
    pub fn len(&self, room_id: &RoomId) -> usize {
        self.inner
            .read()
            .rooms
            .get(room_id)
            .map_or(0, VecDeque::len)
    }

    /// Whether a room has no retained messages.
    pub fn is_empty(&self, room_id: &RoomId) -> bool {
        self.len(room_id) == 0
    }

    /// Total messages retained across all rooms.
    pub fn total(&self) -> usize {
        self.inner.read().rooms.values().map(VecDeque::len).sum()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
