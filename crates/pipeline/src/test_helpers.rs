//! Shared test doubles for pipeline tests.

use async_trait::async_trait;
use ragbridge_core::auth::TokenValidator;
use ragbridge_core::error::RagError;
use ragbridge_core::message::ChatMessage;
use ragbridge_core::rag::{RagClient, RagResponse};
use ragbridge_history::InMemoryHistoryStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::turn::TurnPipeline;

enum Behaviour {
    Reply(String),
    Echo,
    Empty,
    Fail(String),
}

/// A RAG client that records every transcript it is sent.
pub struct MockRag {
    behaviour: Behaviour,
    delay: Option<Duration>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockRag {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with(Behaviour::Reply(text.into()))
    }

    /// Replies `echo: <last message>`.
    pub fn echoing() -> Self {
        Self::with(Behaviour::Echo)
    }

    /// Succeeds with zero choices.
    pub fn empty() -> Self {
        Self::with(Behaviour::Empty)
    }

    pub fn failing(detail: &str) -> Self {
        Self::with(Behaviour::Fail(detail.into()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RagClient for MockRag {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<RagResponse, RagError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behaviour {
            Behaviour::Reply(text) => Ok(RagResponse::from_text("mock-model", text)),
            Behaviour::Echo => {
                let last = messages.last().map(|m| m.content()).unwrap_or_default();
                Ok(RagResponse::from_text("mock-model", format!("echo: {last}")))
            }
            Behaviour::Empty => Ok(RagResponse {
                id: None,
                model: "mock-model".into(),
                choices: vec![],
                usage: None,
            }),
            Behaviour::Fail(detail) => Err(RagError::Network(detail.clone())),
        }
    }
}

/// A validator with a fixed answer that remembers the headers it saw.
pub struct StaticValidator {
    allow: bool,
    seen: Mutex<Vec<Option<String>>>,
}

impl StaticValidator {
    pub fn new(allow: bool) -> Self {
        Self {
            allow,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenValidator for StaticValidator {
    async fn validate(&self, auth_header: Option<&str>) -> bool {
        self.seen.lock().unwrap().push(auth_header.map(str::to_string));
        self.allow
    }
}

/// A pipeline over an in-memory store with a fixed-answer validator.
pub fn pipeline(rag: Arc<MockRag>, allow: bool) -> TurnPipeline {
    TurnPipeline::new(
        rag,
        Arc::new(InMemoryHistoryStore::new()),
        Arc::new(StaticValidator::new(allow)),
    )
}
