//! Two-party room directory: deterministic IDs and connection membership.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::ids::{ConnectionId, RoomId};
use crate::user::Username;

struct Room {
    /// The authoritative pair, stored at creation. Notification targeting
    /// reads this instead of splitting the room-ID string.
    participants: (Username, Username),
    members: HashSet<ConnectionId>,
}

/// Tracks which connections are joined to which pairwise room.
///
/// Room identity is a pure function of the two participant usernames, not
/// of connections, so reconnecting under the same name resolves to the
/// same room.
pub struct RoomDirectory {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl RoomDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve (creating if needed) the room for a pair of users.
    pub fn open(&self, a: &Username, b: &Username) -> RoomId {
        let room_id = RoomId::for_pair(a, b);
        let mut rooms = self.rooms.write();
        let _ = rooms.entry(room_id.clone()).or_insert_with(|| Room {
            participants: if a <= b {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            },
            members: HashSet::new(),
        });
        room_id
    }

    /// Add a connection to a room's membership set. Idempotent; no-op for
    /// a room that was never opened.
    pub fn join(&self, connection_id: &ConnectionId, room_id: &RoomId) {
        let mut rooms = self.rooms.write();
        if let Some(room) = rooms.get_mut(room_id) {
            let _ = room.members.insert(connection_id.clone());
        }
    }

    /// Connections currently joined to a room.
    pub fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .read()
            .get(room_id)
            .map(|r| r.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is currently joined to a room.
    pub fn is_member(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        self.rooms
            .read()
            .get(room_id)
            .is_some_and(|r| r.members.contains(connection_id))
    }

    /// The authoritative participant pair of a room, sorted.
    pub fn participants_of(&self, room_id: &RoomId) -> Option<(Username, Username)> {
        self.rooms.read().get(room_id).map(|r| r.participants.clone())
    }

    /// Every room a connection is joined to.
    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        self.rooms
            .read()
            .iter()
            .filter(|(_, room)| room.members.contains(connection_id))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop a connection from every room it is joined to. Room records and
    /// their participant pairs are kept; only the membership goes away.
    pub fn leave_all(&self, connection_id: &ConnectionId) {
        let mut rooms = self.rooms.write();
        for room in rooms.values_mut() {
            let _ = room.members.remove(connection_id);
        }
    }

    /// Number of rooms ever opened.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
