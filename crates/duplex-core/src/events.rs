//! Wire-format event types for the persistent-connection protocol.
//!
//! Events are internally tagged with `type` and use camelCase field names,
//! e.g. `{"type":"sendMessage","roomId":"a#b","text":"hi"}`.

use serde::{Deserialize, Serialize};

use crate::ids::RoomId;
use crate::store::Message;
use crate::user::{Presence, Username};

/// A user as shown to other clients (presence lists and connect events).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Display name.
    pub username: Username,
    /// Opaque avatar reference.
    pub avatar: String,
}

/// Inbound events, client → server.
///
/// Deserialization doubles as protocol validation: unknown `type` tags,
/// missing fields, and malformed usernames all fail to parse, and the
/// router drops such frames without failing the connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Bind a display name to this connection.
    Login {
        /// Self-asserted display name.
        username: Username,
        /// Optional avatar reference; defaulted deterministically if absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
    },
    /// Open (or re-open) the pairwise room with another user.
    StartChat {
        /// The counterpart's display name.
        target_username: Username,
    },
    /// Send a text message into a room.
    SendMessage {
        /// Target room.
        room_id: RoomId,
        /// Message body; empty text is ignored.
        text: String,
    },
    /// Signal that the sender started or stopped typing.
    Typing {
        /// Target room.
        room_id: RoomId,
        /// `true` while composing.
        is_typing: bool,
    },
    /// Change the sender's advertised presence.
    UpdateStatus {
        /// New presence value.
        status: Presence,
    },
}

/// Outbound events, server → client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Everyone else currently online; sent to a connection right after login.
    UserList {
        /// Online users, excluding the recipient.
        users: Vec<UserSummary>,
    },
    /// Another user came online.
    UserConnected {
        /// Display name.
        username: Username,
        /// Avatar reference.
        avatar: String,
    },
    /// Another user's connection closed.
    UserDisconnected {
        /// Display name.
        username: Username,
    },
    /// Another user changed their advertised presence.
    UserStatusChanged {
        /// Display name.
        username: Username,
        /// New presence.
        status: Presence,
    },
    /// A pairwise room is open with both sides attached.
    ChatStarted {
        /// The shared room.
        room_id: RoomId,
        /// Both display names, initiator first.
        participants: [Username; 2],
    },
    /// Full message history of a room, oldest first.
    MessageHistory {
        /// The room the history belongs to.
        room_id: RoomId,
        /// Stored messages in append order.
        messages: Vec<Message>,
    },
    /// A message was appended to a room the recipient is a member of.
    NewMessage(Message),
    /// Another room member started or stopped typing.
    UserTyping {
        /// Who is typing.
        username: Username,
        /// `true` while composing.
        is_typing: bool,
    },
    /// A message arrived in a room the recipient participates in,
    /// delivered even when they are not currently joined.
    Notification {
        /// Sender's display name.
        from: Username,
        /// Message body.
        message: String,
        /// The room the message landed in.
        room_id: RoomId,
    },
}

impl ServerEvent {
    /// Wire tag of this event, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserList { .. } => "userList",
            Self::UserConnected { .. } => "userConnected",
            Self::UserDisconnected { .. } => "userDisconnected",
            Self::UserStatusChanged { .. } => "userStatusChanged",
            Self::ChatStarted { .. } => "chatStarted",
            Self::MessageHistory { .. } => "messageHistory",
            Self::NewMessage(_) => "newMessage",
            Self::UserTyping { .. } => "userTyping",
            Self::Notification { .. } => "notification",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
