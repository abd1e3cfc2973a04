//! Turn request/result types: the plain shape every transport adapts to.

use serde::{Deserialize, Serialize};

use crate::message::{ChatMessage, ConversationId};
use crate::rag::RagResponse;

/// One inbound turn, already lifted out of its transport.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: ConversationId,

    /// The user's text. Empty means missing.
    pub incoming_text: String,

    /// Raw `Authorization` header value, if any.
    pub auth_header: Option<String>,

    /// Client-managed transcript. When set, the history store is bypassed and
    /// this transcript (ending with the user turn) is forwarded as-is.
    pub transcript: Option<Vec<ChatMessage>>,
}

impl TurnRequest {
    pub fn new(conversation_id: ConversationId, incoming_text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            incoming_text: incoming_text.into(),
            auth_header: None,
            transcript: None,
        }
    }

    pub fn with_auth_header(mut self, header: Option<String>) -> Self {
        self.auth_header = header;
        self
    }

    /// Build a stateless request from a client-supplied transcript. The
    /// incoming text is the last message when it is a user message.
    pub fn from_transcript(conversation_id: ConversationId, transcript: Vec<ChatMessage>) -> Self {
        let incoming_text = transcript
            .last()
            .filter(|m| m.role() == crate::message::Role::User)
            .map(|m| m.content().to_string())
            .unwrap_or_default();
        Self {
            conversation_id,
            incoming_text,
            auth_header: None,
            transcript: Some(transcript),
        }
    }
}

/// Outcome category of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Ok,
    Unauthorized,
    BadRequest,
    UpstreamError,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStatus::Ok => "ok",
            TurnStatus::Unauthorized => "unauthorized",
            TurnStatus::BadRequest => "bad_request",
            TurnStatus::UpstreamError => "upstream_error",
        }
    }
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result handed back to a transport adapter.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub status: TurnStatus,

    /// Safe, user-facing text. Never contains raw error detail.
    pub reply_text: String,

    /// The full backend response on success.
    pub rag_response: Option<RagResponse>,
}

impl TurnResult {
    pub fn ok(reply_text: impl Into<String>, rag_response: RagResponse) -> Self {
        Self {
            status: TurnStatus::Ok,
            reply_text: reply_text.into(),
            rag_response: Some(rag_response),
        }
    }

    pub fn failed(status: TurnStatus, reply_text: impl Into<String>) -> Self {
        Self {
            status,
            reply_text: reply_text.into(),
            rag_response: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TurnStatus::Ok
    }
}
