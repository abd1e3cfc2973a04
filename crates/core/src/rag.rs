//! RagClient trait: the abstraction over the retrieval-augmented generation backend.
//!
//! A RagClient takes an ordered, role-tagged transcript and returns a generated
//! reply plus metadata. The reply shape mirrors chat-completions APIs: a list
//! of choices, the first of which carries the reply text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RagError;
use crate::message::ChatMessage;

/// One candidate reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagChoice {
    pub index: u32,
    pub message: RagChoiceMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The message inside a choice. `content` may be absent (e.g. content-filtered).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagChoiceMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Retrieval context (citations, intent) when the backend supplies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// Token usage information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from the RAG backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<RagChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl RagResponse {
    /// Build a single-choice response. Mostly useful for mocks.
    pub fn from_text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            model: model.into(),
            choices: vec![RagChoice {
                index: 0,
                message: RagChoiceMessage {
                    role: "assistant".into(),
                    content: Some(text.into()),
                    context: None,
                },
                finish_reason: Some("stop".into()),
            }],
            usage: None,
        }
    }

    /// The first choice's content, if it is present and non-blank.
    pub fn reply_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// The core RagClient trait.
///
/// The pipeline calls `complete()` once per turn without knowing which
/// backend answers. Implementations must not retry on their own.
#[async_trait]
pub trait RagClient: Send + Sync {
    /// A human-readable name for this client (e.g., "azure-openai").
    fn name(&self) -> &str;

    /// Send the ordered transcript and get a complete response.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<RagResponse, RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_takes_first_choice() {
        let resp = RagResponse::from_text("gpt-4o", "hi there");
        assert_eq!(resp.reply_text(), Some("hi there"));
    }

    #[test]
    fn reply_text_absent_without_choices() {
        let resp = RagResponse {
            id: None,
            model: "gpt-4o".into(),
            choices: vec![],
            usage: None,
        };
        assert_eq!(resp.reply_text(), None);
    }

    #[test]
    fn reply_text_absent_for_blank_content() {
        let mut resp = RagResponse::from_text("gpt-4o", "   ");
        assert_eq!(resp.reply_text(), None);
        resp.choices[0].message.content = None;
        assert_eq!(resp.reply_text(), None);
    }

    #[test]
    fn parses_chat_completion_with_context() {
        let data = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": {
                    "role": "assistant",
                    "content": "The policy allows 20 days [doc1].",
                    "context": {"citations": [{"title": "HR handbook"}]}
                }
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 9, "total_tokens": 21}
        }"#;
        let resp: RagResponse = serde_json::from_str(data).unwrap();
        assert_eq!(resp.reply_text(), Some("The policy allows 20 days [doc1]."));
        let ctx = resp.choices[0].message.context.as_ref().unwrap();
        assert_eq!(ctx["citations"][0]["title"], "HR handbook");
        assert_eq!(resp.usage.unwrap().total_tokens, 21);
    }
}
