//! Live-connection registry with presence and grace-period eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ids::ConnectionId;
use crate::user::{Presence, User, Username};

/// Default grace window between disconnect and eviction.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(300);

/// Maps live connections to [`User`] records and back.
///
/// The registry owns every `User`. Alongside the primary
/// `ConnectionId → User` map it maintains an explicit `Username →
/// ConnectionId` index, updated in the same critical section, so username
/// lookups never scan the whole table.
///
/// Records of disconnected users linger for a grace window and are then
/// evicted by a cancellable background task that re-checks presence at
/// fire time, so a reconnect during the window is never clobbered.
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
    grace: Duration,
}

struct Inner {
    users: HashMap<ConnectionId, User>,
    by_username: HashMap<Username, ConnectionId>,
    pending_evictions: HashMap<ConnectionId, CancellationToken>,
}

impl ConnectionRegistry {
    /// Create a registry with the given grace window.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                users: HashMap::new(),
                by_username: HashMap::new(),
                pending_evictions: HashMap::new(),
            }),
            grace,
        }
    }

    /// Bind a user to a connection, replacing any previous binding.
    ///
    /// Always succeeds: a username already online under another connection
    /// is not rejected — the index simply points at the newest registration
    /// (last writer wins). Re-registering a username cancels its pending
    /// eviction and discards a stale *offline* record left by a previous
    /// connection, so the grace-window timer finds nothing to remove.
    pub fn register(
        &self,
        connection_id: &ConnectionId,
        username: Username,
        avatar: Option<String>,
    ) -> User {
        let mut inner = self.inner.lock();
        if let Some(token) = inner.pending_evictions.remove(connection_id) {
            token.cancel();
        }
        // A connection re-registering under a new name must not leave its
        // old name pointing at it.
        let renamed_from = inner
            .users
            .get(connection_id)
            .filter(|old| old.username != username)
            .map(|old| old.username.clone());
        if let Some(old_name) = renamed_from {
            if inner.by_username.get(&old_name) == Some(connection_id) {
                let _ = inner.by_username.remove(&old_name);
            }
        }
        if let Some(prev) = inner.by_username.get(&username).cloned() {
            if prev != *connection_id {
                if let Some(token) = inner.pending_evictions.remove(&prev) {
                    token.cancel();
                }
                if inner
                    .users
                    .get(&prev)
                    .is_some_and(|u| u.presence == Presence::Offline)
                {
                    debug!(username = %username, stale = %prev, "dropping stale offline record");
                    let _ = inner.users.remove(&prev);
                }
            }
        }
        let user = User::new(connection_id.clone(), username.clone(), avatar);
        let _ = inner.users.insert(connection_id.clone(), user.clone());
        let _ = inner.by_username.insert(username, connection_id.clone());
        user
    }

    /// The user bound to a connection, if any.
    pub fn lookup_by_connection(&self, connection_id: &ConnectionId) -> Option<User> {
        self.inner.lock().users.get(connection_id).cloned()
    }

    /// The most recently registered user with this name, preferring an
    /// online one if any exists.
    pub fn lookup_by_username(&self, username: &Username) -> Option<User> {
        let inner = self.inner.lock();
        let indexed = inner
            .by_username
            .get(username)
            .and_then(|conn| inner.users.get(conn))
            .filter(|u| u.username == *username);
        match indexed {
            Some(user) if user.presence == Presence::Online => Some(user.clone()),
            other => inner
                .users
                .values()
                .find(|u| u.username == *username && u.presence == Presence::Online)
                .or(other)
                .cloned(),
        }
    }

    /// Set a user's advertised presence; returns the updated record.
    pub fn set_presence(&self, connection_id: &ConnectionId, presence: Presence) -> Option<User> {
        let mut inner = self.inner.lock();
        let user = inner.users.get_mut(connection_id)?;
        user.presence = presence;
        Some(user.clone())
    }

    /// Flip a connection's user to offline and schedule eviction after the
    /// grace window.
    ///
    /// The eviction task holds a [`CancellationToken`] keyed by the
    /// connection; a re-registration before the window elapses cancels it.
    /// No-op when the connection has no user.
    pub fn mark_offline(self: &Arc<Self>, connection_id: &ConnectionId) {
        let token = {
            let mut inner = self.inner.lock();
            let Some(user) = inner.users.get_mut(connection_id) else {
                return;
            };
            user.presence = Presence::Offline;
            let token = CancellationToken::new();
            if let Some(old) = inner
                .pending_evictions
                .insert(connection_id.clone(), token.clone())
            {
                old.cancel();
            }
            token
        };

        let registry = Arc::clone(self);
        let connection_id = connection_id.clone();
        let grace = self.grace;
        let _ = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(connection_id = %connection_id, "eviction cancelled");
                }
                () = tokio::time::sleep(grace) => {
                    registry.evict(&connection_id);
                }
            }
        });
    }

    /// Remove a connection's record if — re-checked now, not at schedule
    /// time — it is still offline.
    pub fn evict(&self, connection_id: &ConnectionId) {
        let mut inner = self.inner.lock();
        let _ = inner.pending_evictions.remove(connection_id);
        let still_offline = inner
            .users
            .get(connection_id)
            .is_some_and(|u| u.presence == Presence::Offline);
        if !still_offline {
            return;
        }
        if let Some(user) = inner.users.remove(connection_id) {
            debug!(connection_id = %connection_id, username = %user.username, "evicted");
            if inner.by_username.get(&user.username) == Some(connection_id) {
                let _ = inner.by_username.remove(&user.username);
            }
        }
    }

    /// Snapshot of every online user.
    pub fn online_users(&self) -> Vec<User> {
        self.inner
            .lock()
            .users
            .values()
            .filter(|u| u.presence == Presence::Online)
            .cloned()
            .collect()
    }

    /// Number of user records currently held (online and lingering).
    pub fn user_count(&self) -> usize {
        self.inner.lock().users.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_WINDOW)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
