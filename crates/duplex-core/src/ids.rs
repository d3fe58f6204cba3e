//! Branded ID newtypes for type safety.
//!
//! Connections and rooms are both keyed by strings on the wire; wrapping
//! them in distinct newtypes prevents accidentally passing a connection ID
//! where a room ID is expected.
//!
//! `ConnectionId` values are UUID v7 (time-ordered). `RoomId` values are
//! derived from the participant pair and have no random constructor.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::user::Username;

/// Separator between the two sorted usernames inside a room ID.
///
/// [`Username`] validation rejects this character, so a room ID can never
/// be ambiguous across distinct user pairs.
pub const ROOM_SEPARATOR: char = '#';

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a live connection.
    ConnectionId
}

branded_id! {
    /// Identifier for a two-party room, derived from the participant pair.
    RoomId
}

impl ConnectionId {
    /// Create a new random connection ID (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomId {
    /// Derive the room ID for a pair of users.
    ///
    /// Order-independent: the two usernames are sorted before joining, so
    /// `for_pair(a, b) == for_pair(b, a)` for any `a`, `b`.
    #[must_use]
    pub fn for_pair(a: &Username, b: &Username) -> Self {
        let (lo, hi) = if a.as_str() <= b.as_str() {
            (a, b)
        } else {
            (b, a)
        };
        Self(format!("{lo}{ROOM_SEPARATOR}{hi}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
