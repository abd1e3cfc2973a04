//! `POST /api/chat`: the chat-function surface.
//!
//! Body is either `{"question": "..."}` (stateful, keyed by
//! `conversation_id`, default `anon`) or `{"history": [{role, content}, ...]}`
//! (client-managed transcript, nothing stored server-side). The response is
//! the backend's reply structure.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Json, Response};
use ragbridge_core::error::TransportError;
use ragbridge_core::message::{ChatMessage, ConversationId};
use ragbridge_core::turn::{TurnRequest, TurnStatus};
use serde::Deserialize;
use tracing::debug;

use crate::{ApiError, SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl ChatBody {
    /// Turn the body into a pipeline request. A non-empty `history` wins;
    /// otherwise `question` is used. With neither, the request carries no
    /// text and the pipeline rejects it.
    pub fn into_turn(self) -> TurnRequest {
        let id = ConversationId::or_anonymous(self.conversation_id.as_deref());
        match self.history.filter(|h| !h.is_empty()) {
            Some(history) => TurnRequest::from_transcript(id, history),
            None => TurnRequest::new(id, self.question.unwrap_or_default()),
        }
    }
}

fn parse_body(body: &Bytes) -> Result<ChatBody, TransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ChatBody::default());
    }
    serde_json::from_slice(body).map_err(|e| TransportError::MalformedBody(e.to_string()))
}

pub(crate) fn auth_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = parse_body(&body)?.into_turn().with_auth_header(auth_header(&headers));
    debug!(
        conversation_id = %request.conversation_id,
        stateless = request.transcript.is_some(),
        "Chat request received"
    );

    let result = state.pipeline.handle_turn(request).await;
    match (result.status, result.rag_response) {
        (TurnStatus::Ok, Some(response)) => Ok(Json(response).into_response()),
        (status, _) => Err(ApiError::from_turn(status, result.reply_text)),
    }
}
