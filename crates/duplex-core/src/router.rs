//! Inbound event routing and the per-connection session state machine.
//!
//! Every inbound event enters through [`EventRouter::handle`]. Sessions
//! move `Anonymous → Authenticated` on a valid login and end with
//! [`EventRouter::connection_closed`]. Malformed or out-of-precondition
//! events are dropped without failing the connection.

use std::sync::Arc;

use tracing::{debug, info};

use crate::events::{ClientEvent, ServerEvent};
use crate::ids::{ConnectionId, RoomId};
use crate::presence;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomDirectory;
use crate::sink::EventSink;
use crate::store::{Message, MessageStore};
use crate::user::{Presence, User, Username};

/// Error for the HTTP message-posting path.
///
/// The realtime path drops bad events silently; the REST surface reports
/// them instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostMessageError {
    /// Message text was empty.
    #[error("message text must not be empty")]
    EmptyText,
}

/// The single entry point for inbound events.
///
/// Owns the room directory and message store; shares the connection
/// registry (whose eviction tasks need their own handle) and delivers all
/// outbound traffic through the [`EventSink`] seam.
pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
    rooms: RoomDirectory,
    store: MessageStore,
    sink: Arc<dyn EventSink>,
}

impl EventRouter {
    /// Wire up a router.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: MessageStore,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            rooms: RoomDirectory::new(),
            store,
            sink,
        }
    }

    /// The shared connection registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// The room directory.
    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    /// The message store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Route one inbound event from a connection.
    pub fn handle(&self, conn: &ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::Login { username, avatar } => self.login(conn, username, avatar),
            ClientEvent::StartChat { target_username } => self.start_chat(conn, &target_username),
            ClientEvent::SendMessage { room_id, text } => self.send_message(conn, &room_id, &text),
            ClientEvent::Typing { room_id, is_typing } => self.typing(conn, &room_id, is_typing),
            ClientEvent::UpdateStatus { status } => self.update_status(conn, status),
        }
    }

    /// Transport-level close: mark the user offline (starting the grace
    /// window), notify everyone else, and drop room memberships. The user
    /// record itself lingers until eviction.
    pub fn connection_closed(&self, conn: &ConnectionId) {
        if let Some(user) = self.registry.lookup_by_connection(conn) {
            self.registry.mark_offline(conn);
            let others = self.other_online(conn);
            info!(connection_id = %conn, username = %user.username, "user disconnected");
            self.deliver(presence::on_disconnect(&user.username, &others));
        }
        self.rooms.leave_all(conn);
    }

    /// Append a message on behalf of the HTTP surface and fan it out
    /// exactly like a realtime `sendMessage`, so both interfaces observe
    /// one consistent log.
    pub fn post_message(
        &self,
        room_id: &RoomId,
        sender: &Username,
        text: &str,
    ) -> Result<Message, PostMessageError> {
        if text.is_empty() {
            return Err(PostMessageError::EmptyText);
        }
        let message = self.store.append(room_id, sender, text);
        self.fan_out_message(&message);
        Ok(message)
    }

    // ── Event handlers ──────────────────────────────────────────────

    fn login(&self, conn: &ConnectionId, username: Username, avatar: Option<String>) {
        if self.registry.lookup_by_connection(conn).is_some() {
            debug!(connection_id = %conn, "login on authenticated connection dropped");
            return;
        }
        let user = self.registry.register(conn, username, avatar);
        info!(connection_id = %conn, username = %user.username, "user logged in");
        let others = self.other_online(conn);
        self.deliver(presence::on_login(&user, &others));
    }

    fn start_chat(&self, conn: &ConnectionId, target: &Username) {
        let Some(me) = self.authenticated(conn, "startChat") else {
            return;
        };
        let room_id = self.rooms.open(&me.username, target);
        self.rooms.join(conn, &room_id);

        // Attach the counterpart too when they are reachable right now;
        // otherwise the room simply waits for them to start it themselves.
        let target_online = self
            .registry
            .lookup_by_username(target)
            .filter(|u| u.presence == Presence::Online);
        if let Some(target_user) = target_online {
            self.rooms.join(&target_user.connection_id, &room_id);
            let started = ServerEvent::ChatStarted {
                room_id: room_id.clone(),
                participants: [me.username.clone(), target.clone()],
            };
            let _ = self.sink.send(conn, &started);
            if target_user.connection_id != *conn {
                let _ = self.sink.send(&target_user.connection_id, &started);
            }
        }

        let history = ServerEvent::MessageHistory {
            room_id: room_id.clone(),
            messages: self.store.history(&room_id),
        };
        let _ = self.sink.send(conn, &history);
    }

    fn send_message(&self, conn: &ConnectionId, room_id: &RoomId, text: &str) {
        let Some(me) = self.authenticated(conn, "sendMessage") else {
            return;
        };
        if text.is_empty() {
            debug!(connection_id = %conn, room_id = %room_id, "empty message dropped");
            return;
        }
        if !self.rooms.is_member(conn, room_id) {
            debug!(connection_id = %conn, room_id = %room_id, "sendMessage from non-member dropped");
            return;
        }
        let message = self.store.append(room_id, &me.username, text);
        self.fan_out_message(&message);
    }

    fn typing(&self, conn: &ConnectionId, room_id: &RoomId, is_typing: bool) {
        let Some(me) = self.authenticated(conn, "typing") else {
            return;
        };
        if !self.rooms.is_member(conn, room_id) {
            debug!(connection_id = %conn, room_id = %room_id, "typing from non-member dropped");
            return;
        }
        let event = ServerEvent::UserTyping {
            username: me.username,
            is_typing,
        };
        for member in self.rooms.members_of(room_id) {
            if member != *conn {
                let _ = self.sink.send(&member, &event);
            }
        }
    }

    fn update_status(&self, conn: &ConnectionId, status: Presence) {
        let Some(user) = self.registry.set_presence(conn, status) else {
            debug!(connection_id = %conn, "updateStatus from anonymous connection dropped");
            return;
        };
        let others = self.other_online(conn);
        self.deliver(presence::on_status_change(&user, status, &others));
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// `newMessage` to every current room member, plus a targeted
    /// `notification` to the other participant (resolved from the room's
    /// authoritative pair, never by parsing the room ID) whether or not
    /// they are currently joined.
    fn fan_out_message(&self, message: &Message) {
        let event = ServerEvent::NewMessage(message.clone());
        for member in self.rooms.members_of(&message.room_id) {
            let _ = self.sink.send(&member, &event);
        }

        let Some((a, b)) = self.rooms.participants_of(&message.room_id) else {
            return;
        };
        for participant in [a, b] {
            if participant == message.sender {
                continue;
            }
            if let Some(user) = self.registry.lookup_by_username(&participant) {
                let note = ServerEvent::Notification {
                    from: message.sender.clone(),
                    message: message.text.clone(),
                    room_id: message.room_id.clone(),
                };
                let _ = self.sink.send(&user.connection_id, &note);
            }
        }
    }

    fn authenticated(&self, conn: &ConnectionId, event: &str) -> Option<User> {
        let user = self.registry.lookup_by_connection(conn);
        if user.is_none() {
            debug!(connection_id = %conn, event, "event from anonymous connection dropped");
        }
        user
    }

    fn other_online(&self, conn: &ConnectionId) -> Vec<User> {
        self.registry
            .online_users()
            .into_iter()
            .filter(|u| u.connection_id != *conn)
            .collect()
    }

    fn deliver(&self, batch: Vec<presence::Outbound>) {
        for (to, event) in batch {
            let _ = self.sink.send(&to, &event);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DEFAULT_GRACE_WINDOW;
    use crate::sink::RecordingSink;

    struct Fixture {
        router: EventRouter,
        sink: Arc<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(RecordingSink::new());
        let registry = Arc::new(ConnectionRegistry::new(DEFAULT_GRACE_WINDOW));
        let router = EventRouter::new(registry, MessageStore::new(), sink.clone());
        Fixture { router, sink }
    }

    fn name(s: &str) -> Username {
        Username::parse(s).unwrap()
    }

    fn login(router: &EventRouter, conn: &ConnectionId, username: &str) {
        router.handle(
            conn,
            ClientEvent::Login {
                username: name(username),
                avatar: None,
            },
        );
    }

    fn start_chat(router: &EventRouter, conn: &ConnectionId, target: &str) {
        router.handle(
            conn,
            ClientEvent::StartChat {
                target_username: name(target),
            },
        );
    }

    fn send(router: &EventRouter, conn: &ConnectionId, room: &RoomId, text: &str) {
        router.handle(
            conn,
            ClientEvent::SendMessage {
                room_id: room.clone(),
                text: text.into(),
            },
        );
    }

    // ── Login ───────────────────────────────────────────────────────

    #[test]
    fn second_login_sees_first_in_user_list_but_not_self() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");

        let to_bob = f.sink.sent_to(&bob);
        let list = to_bob
            .iter()
            .find_map(|e| match e {
                ServerEvent::UserList { users } => Some(users),
                _ => None,
            })
            .expect("bob should receive a userList");
        let names: Vec<_> = list.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[test]
    fn login_notifies_existing_connections() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");

        let to_alice = f.sink.sent_to(&alice);
        assert!(to_alice.iter().any(|e| matches!(
            e,
            ServerEvent::UserConnected { username, .. } if username.as_str() == "bob"
        )));
    }

    #[test]
    fn login_on_authenticated_connection_is_dropped() {
        let f = fixture();
        let alice = ConnectionId::new();
        login(&f.router, &alice, "alice");
        f.sink.clear();
        login(&f.router, &alice, "impostor");

        assert!(f.sink.deliveries().is_empty());
        let user = f.router.registry().lookup_by_connection(&alice).unwrap();
        assert_eq!(user.username.as_str(), "alice");
    }

    // ── startChat ───────────────────────────────────────────────────

    #[test]
    fn start_chat_with_online_target_notifies_both() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        f.sink.clear();

        start_chat(&f.router, &alice, "bob");

        let expected_room = RoomId::for_pair(&name("alice"), &name("bob"));
        for conn in [&alice, &bob] {
            let started = f
                .sink
                .sent_to(conn)
                .into_iter()
                .find_map(|e| match e {
                    ServerEvent::ChatStarted {
                        room_id,
                        participants,
                    } => Some((room_id, participants)),
                    _ => None,
                })
                .expect("both sides should receive chatStarted");
            assert_eq!(started.0, expected_room);
            let names: Vec<_> = started.1.iter().map(Username::as_str).collect();
            assert!(names.contains(&"alice") && names.contains(&"bob"));
        }
        assert!(f.router.rooms().is_member(&alice, &expected_room));
        assert!(f.router.rooms().is_member(&bob, &expected_room));
    }

    #[test]
    fn start_chat_sends_history_to_initiator_only() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        f.sink.clear();

        start_chat(&f.router, &alice, "bob");

        let alice_history: Vec<_> = f
            .sink
            .sent_to(&alice)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::MessageHistory { .. }))
            .collect();
        assert_eq!(alice_history.len(), 1);
        assert!(matches!(
            &alice_history[0],
            ServerEvent::MessageHistory { messages, .. } if messages.is_empty()
        ));
        assert!(!f
            .sink
            .sent_to(&bob)
            .iter()
            .any(|e| matches!(e, ServerEvent::MessageHistory { .. })));
    }

    #[test]
    fn start_chat_with_offline_target_still_opens_room() {
        let f = fixture();
        let alice = ConnectionId::new();
        login(&f.router, &alice, "alice");
        f.sink.clear();

        start_chat(&f.router, &alice, "ghost");

        let room = RoomId::for_pair(&name("alice"), &name("ghost"));
        assert!(f.router.rooms().is_member(&alice, &room));
        // No chatStarted without a live counterpart, but history arrives.
        let to_alice = f.sink.sent_to(&alice);
        assert!(!to_alice
            .iter()
            .any(|e| matches!(e, ServerEvent::ChatStarted { .. })));
        assert!(to_alice
            .iter()
            .any(|e| matches!(e, ServerEvent::MessageHistory { .. })));
    }

    #[test]
    fn start_chat_from_anonymous_is_dropped() {
        let f = fixture();
        let anon = ConnectionId::new();
        start_chat(&f.router, &anon, "bob");
        assert!(f.sink.deliveries().is_empty());
        assert_eq!(f.router.rooms().room_count(), 0);
    }

    #[test]
    fn both_sides_starting_resolve_to_same_room() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");

        start_chat(&f.router, &alice, "bob");
        start_chat(&f.router, &bob, "alice");

        assert_eq!(f.router.rooms().room_count(), 1);
    }

    // ── sendMessage ─────────────────────────────────────────────────

    #[test]
    fn message_delivered_to_exactly_the_room_members() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        let carol = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        login(&f.router, &carol, "carol");
        start_chat(&f.router, &alice, "bob");
        f.sink.clear();

        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        send(&f.router, &alice, &room, "hello bob");

        for conn in [&alice, &bob] {
            assert!(
                f.sink.sent_to(conn).iter().any(|e| matches!(
                    e,
                    ServerEvent::NewMessage(m) if m.text == "hello bob"
                )),
                "room member should receive newMessage"
            );
        }
        assert!(!f
            .sink
            .sent_to(&carol)
            .iter()
            .any(|e| matches!(e, ServerEvent::NewMessage(_))));
    }

    #[test]
    fn message_appends_to_history_in_order() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");

        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        send(&f.router, &alice, &room, "one");
        send(&f.router, &bob, &room, "two");
        send(&f.router, &alice, &room, "three");

        let texts: Vec<_> = f
            .router
            .store()
            .history(&room)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn counterpart_gets_notification_but_sender_does_not() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");
        f.sink.clear();

        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        send(&f.router, &alice, &room, "ping");

        assert!(f.sink.sent_to(&bob).iter().any(|e| matches!(
            e,
            ServerEvent::Notification { from, .. } if from.as_str() == "alice"
        )));
        assert!(!f
            .sink
            .sent_to(&alice)
            .iter()
            .any(|e| matches!(e, ServerEvent::Notification { .. })));
    }

    #[test]
    fn notification_reaches_participant_who_left_the_room() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");
        let room = RoomId::for_pair(&name("alice"), &name("bob"));

        // Bob's membership goes away (e.g. reconnect raced the room join)
        // but his identity is still a participant.
        f.router.rooms().leave_all(&bob);
        f.sink.clear();

        send(&f.router, &alice, &room, "still there?");

        let to_bob = f.sink.sent_to(&bob);
        assert!(!to_bob.iter().any(|e| matches!(e, ServerEvent::NewMessage(_))));
        assert!(to_bob.iter().any(|e| matches!(
            e,
            ServerEvent::Notification { room_id, .. } if *room_id == room
        )));
    }

    #[test]
    fn empty_message_is_dropped_without_store_mutation() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");
        f.sink.clear();

        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        send(&f.router, &alice, &room, "");

        assert!(f.sink.deliveries().is_empty());
        assert!(f.router.store().is_empty(&room));
    }

    #[test]
    fn send_to_unjoined_room_is_dropped() {
        let f = fixture();
        let alice = ConnectionId::new();
        login(&f.router, &alice, "alice");
        f.sink.clear();

        send(&f.router, &alice, &RoomId::from("bob#carol"), "sneaky");

        assert!(f.sink.deliveries().is_empty());
        assert!(f.router.store().is_empty(&RoomId::from("bob#carol")));
    }

    #[test]
    fn send_from_anonymous_is_dropped() {
        let f = fixture();
        let anon = ConnectionId::new();
        send(&f.router, &anon, &RoomId::from("a#b"), "hi");
        assert!(f.sink.deliveries().is_empty());
    }

    // ── typing ──────────────────────────────────────────────────────

    #[test]
    fn typing_reaches_other_members_but_never_echoes() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");
        f.sink.clear();

        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        f.router.handle(
            &alice,
            ClientEvent::Typing {
                room_id: room,
                is_typing: true,
            },
        );

        assert!(f.sink.sent_to(&bob).iter().any(|e| matches!(
            e,
            ServerEvent::UserTyping { username, is_typing: true } if username.as_str() == "alice"
        )));
        assert!(f.sink.sent_to(&alice).is_empty());
    }

    #[test]
    fn typing_in_unjoined_room_is_dropped() {
        let f = fixture();
        let alice = ConnectionId::new();
        login(&f.router, &alice, "alice");
        f.sink.clear();

        f.router.handle(
            &alice,
            ClientEvent::Typing {
                room_id: RoomId::from("x#y"),
                is_typing: true,
            },
        );
        assert!(f.sink.deliveries().is_empty());
    }

    // ── updateStatus ────────────────────────────────────────────────

    #[test]
    fn status_change_fans_out_to_others() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        f.sink.clear();

        f.router.handle(
            &alice,
            ClientEvent::UpdateStatus {
                status: Presence::Offline,
            },
        );

        assert!(f.sink.sent_to(&bob).iter().any(|e| matches!(
            e,
            ServerEvent::UserStatusChanged { username, status: Presence::Offline }
                if username.as_str() == "alice"
        )));
        assert!(f.sink.sent_to(&alice).is_empty());
    }

    #[test]
    fn status_change_from_anonymous_is_dropped() {
        let f = fixture();
        let anon = ConnectionId::new();
        f.router.handle(
            &anon,
            ClientEvent::UpdateStatus {
                status: Presence::Offline,
            },
        );
        assert!(f.sink.deliveries().is_empty());
    }

    // ── disconnect ──────────────────────────────────────────────────

    #[tokio::test]
    async fn disconnect_notifies_others_once() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");
        f.sink.clear();

        f.router.connection_closed(&alice);

        let disconnects: Vec<_> = f
            .sink
            .sent_to(&bob)
            .into_iter()
            .filter(|e| matches!(
                e,
                ServerEvent::UserDisconnected { username } if username.as_str() == "alice"
            ))
            .collect();
        assert_eq!(disconnects.len(), 1);
        // Membership is cleaned up; the record lingers offline.
        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        assert!(!f.router.rooms().is_member(&alice, &room));
        let user = f.router.registry().lookup_by_connection(&alice).unwrap();
        assert_eq!(user.presence, Presence::Offline);
    }

    #[tokio::test]
    async fn disconnect_of_anonymous_connection_is_quiet() {
        let f = fixture();
        let anon = ConnectionId::new();
        f.router.connection_closed(&anon);
        assert!(f.sink.deliveries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_user_evicted_after_grace_window() {
        let f = fixture();
        let alice = ConnectionId::new();
        login(&f.router, &alice, "alice");
        f.router.connection_closed(&alice);

        tokio::time::sleep(DEFAULT_GRACE_WINDOW + std::time::Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert!(f.router.registry().lookup_by_connection(&alice).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn relogin_before_grace_window_prevents_eviction() {
        let f = fixture();
        let old = ConnectionId::new();
        login(&f.router, &old, "alice");
        f.router.connection_closed(&old);

        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        let fresh = ConnectionId::new();
        login(&f.router, &fresh, "alice");

        tokio::time::sleep(DEFAULT_GRACE_WINDOW).await;
        tokio::task::yield_now().await;

        let user = f
            .router
            .registry()
            .lookup_by_username(&name("alice"))
            .expect("alice must survive the old eviction timer");
        assert_eq!(user.connection_id, fresh);
        assert_eq!(user.presence, Presence::Online);
    }

    #[tokio::test]
    async fn reconnect_resolves_to_same_room() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");
        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        send(&f.router, &alice, &room, "before drop");

        f.router.connection_closed(&alice);
        let alice2 = ConnectionId::new();
        login(&f.router, &alice2, "alice");
        f.sink.clear();
        start_chat(&f.router, &alice2, "bob");

        let history = f
            .sink
            .sent_to(&alice2)
            .into_iter()
            .find_map(|e| match e {
                ServerEvent::MessageHistory { messages, .. } => Some(messages),
                _ => None,
            })
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "before drop");
        assert_eq!(f.router.rooms().room_count(), 1);
    }

    // ── REST path ───────────────────────────────────────────────────

    #[test]
    fn post_message_shares_the_realtime_log_and_fan_out() {
        let f = fixture();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        login(&f.router, &alice, "alice");
        login(&f.router, &bob, "bob");
        start_chat(&f.router, &alice, "bob");
        f.sink.clear();

        let room = RoomId::for_pair(&name("alice"), &name("bob"));
        let posted = f
            .router
            .post_message(&room, &name("alice"), "via http")
            .unwrap();

        // Fan-out matches the realtime path: members get newMessage.
        for conn in [&alice, &bob] {
            assert!(f.sink.sent_to(conn).iter().any(|e| matches!(
                e,
                ServerEvent::NewMessage(m) if m.id == posted.id
            )));
        }
        // And the log is shared.
        let history = f.router.store().history(&room);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], posted);
    }

    #[test]
    fn post_message_rejects_empty_text() {
        let f = fixture();
        let room = RoomId::from("a#b");
        let result = f.router.post_message(&room, &name("alice"), "");
        assert_eq!(result, Err(PostMessageError::EmptyText));
        assert!(f.router.store().is_empty(&room));
    }
}
