//! Translation of registry state transitions into outbound presence events.
//!
//! Pure functions: callers pass a snapshot of the other online users and
//! get back `(recipient, event)` pairs to hand to the sink. Nothing here
//! mutates state.

use crate::events::{ServerEvent, UserSummary};
use crate::ids::ConnectionId;
use crate::user::{Presence, User, Username};

/// An outbound event addressed to one connection.
pub type Outbound = (ConnectionId, ServerEvent);

fn summary(user: &User) -> UserSummary {
    UserSummary {
        username: user.username.clone(),
        avatar: user.avatar.clone(),
    }
}

/// Events for a fresh login: `userConnected` to every other online
/// connection, and the current `userList` to the new connection only.
pub fn on_login(user: &User, others: &[User]) -> Vec<Outbound> {
    let mut out: Vec<Outbound> = others
        .iter()
        .map(|other| {
            (
                other.connection_id.clone(),
                ServerEvent::UserConnected {
                    username: user.username.clone(),
                    avatar: user.avatar.clone(),
                },
            )
        })
        .collect();
    out.push((
        user.connection_id.clone(),
        ServerEvent::UserList {
            users: others.iter().map(summary).collect(),
        },
    ));
    out
}

/// Events for an explicit presence change: `userStatusChanged` to every
/// other online connection.
pub fn on_status_change(user: &User, status: Presence, others: &[User]) -> Vec<Outbound> {
    others
        .iter()
        .map(|other| {
            (
                other.connection_id.clone(),
                ServerEvent::UserStatusChanged {
                    username: user.username.clone(),
                    status,
                },
            )
        })
        .collect()
}

/// Events for a transport-level disconnect: `userDisconnected` to every
/// other online connection, emitted at disconnect time (not eviction time).
pub fn on_disconnect(username: &Username, others: &[User]) -> Vec<Outbound> {
    others
        .iter()
        .map(|other| {
            (
                other.connection_id.clone(),
                ServerEvent::UserDisconnected {
                    username: username.clone(),
                },
            )
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
