//! Users, presence, and validated display names.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ConnectionId;

/// Maximum accepted username length in bytes.
pub const MAX_USERNAME_LEN: usize = 64;

/// Error returned when a display name fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUsername {
    /// The name was empty.
    #[error("username must not be empty")]
    Empty,
    /// The name exceeded [`MAX_USERNAME_LEN`] bytes.
    #[error("username exceeds {MAX_USERNAME_LEN} bytes")]
    TooLong,
    /// The name contained a character outside `[A-Za-z0-9_.-]`.
    #[error("username contains forbidden character {0:?}")]
    ForbiddenChar(char),
}

/// A validated display name.
///
/// Restricted to 1–64 characters of `[A-Za-z0-9_.-]`. The room-ID
/// separator can therefore never appear inside a username, which keeps
/// derived room IDs unambiguous across distinct user pairs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and wrap a display name.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidUsername> {
        let s = s.into();
        if s.is_empty() {
            return Err(InvalidUsername::Empty);
        }
        if s.len() > MAX_USERNAME_LEN {
            return Err(InvalidUsername::TooLong);
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
        {
            return Err(InvalidUsername::ForbiddenChar(c));
        }
        Ok(Self(s))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = InvalidUsername;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Username> for String {
    fn from(u: Username) -> Self {
        u.0
    }
}

/// Online/offline status as observed by the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Reachable over a live connection.
    #[default]
    Online,
    /// Disconnected, or deliberately marked away by the user.
    Offline,
}

impl Presence {
    /// Wire-format string for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// A user bound to a live (or recently live) connection.
///
/// One `User` exists per connection; the record is owned exclusively by the
/// [`ConnectionRegistry`](crate::registry::ConnectionRegistry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The connection this user is bound to.
    pub connection_id: ConnectionId,
    /// Self-asserted display name; unique among *online* users only.
    pub username: Username,
    /// Opaque avatar reference.
    pub avatar: String,
    /// Current presence.
    pub presence: Presence,
}

impl User {
    /// Build a new online user, defaulting the avatar when none was given.
    #[must_use]
    pub fn new(connection_id: ConnectionId, username: Username, avatar: Option<String>) -> Self {
        let avatar = avatar.unwrap_or_else(|| default_avatar(&username));
        Self {
            connection_id,
            username,
            avatar,
            presence: Presence::Online,
        }
    }
}

/// Deterministic avatar URL for users who did not supply one.
///
/// The username charset is URL-safe, so it is inserted verbatim.
#[must_use]
pub fn default_avatar(username: &Username) -> String {
    format!("https://ui-avatars.com/api/?name={username}&background=random")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
