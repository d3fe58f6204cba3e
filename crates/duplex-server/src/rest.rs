//! REST surface — thin wrappers over the same relay core as the
//! WebSocket path.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use duplex_core::{InvalidUsername, Message, PostMessageError, RoomId, UserSummary, Username};
use serde::Deserialize;
use serde_json::json;

use crate::server::AppState;

/// Error body for the REST surface.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The `sender` field failed username validation.
    #[error(transparent)]
    InvalidSender(#[from] InvalidUsername),
    /// The message itself was rejected.
    #[error(transparent)]
    Message(#[from] PostMessageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// `GET /users/online`
pub async fn online_users(State(state): State<AppState>) -> Json<Vec<UserSummary>> {
    let users = state
        .relay
        .registry()
        .online_users()
        .into_iter()
        .map(|u| UserSummary {
            username: u.username,
            avatar: u.avatar,
        })
        .collect();
    Json(users)
}

/// `GET /messages/{room_id}`
pub async fn room_history(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Json<Vec<Message>> {
    Json(state.relay.store().history(&RoomId::from(room_id)))
}

/// `POST /messages` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    /// Target room.
    pub room_id: RoomId,
    /// Sender display name; validated like a realtime login.
    pub sender: String,
    /// Message body.
    pub text: String,
}

/// `POST /messages`
///
/// Routes through the same append + fan-out path as the realtime
/// `sendMessage` event, so both interfaces observe one consistent log.
pub async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let sender = Username::parse(req.sender)?;
    let message = state.relay.post_message(&req.room_id, &sender, &req.text)?;
    Ok((StatusCode::CREATED, Json(message)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_is_camel_case() {
        let raw = r#"{"roomId":"alice#bob","sender":"alice","text":"hi"}"#;
        let req: PostMessageRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.room_id.as_str(), "alice#bob");
        assert_eq!(req.sender, "alice");
        assert_eq!(req.text, "hi");
    }

    #[test]
    fn invalid_sender_maps_to_bad_request() {
        let err = ApiError::from(InvalidUsername::Empty);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_text_maps_to_bad_request() {
        let err = ApiError::from(PostMessageError::EmptyText);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
