//! The turn pipeline.

use dashmap::DashMap;
use ragbridge_config::BotConfig;
use ragbridge_core::auth::TokenValidator;
use ragbridge_core::history::HistoryStore;
use ragbridge_core::message::{ChatMessage, ConversationId};
use ragbridge_core::rag::{RagClient, RagResponse};
use ragbridge_core::turn::{TurnRequest, TurnResult, TurnStatus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Reply text for a turn that carried no usable input.
pub const MISSING_INPUT_TEXT: &str = "Missing 'question' or 'history'";

/// Reply text for a turn whose token was rejected.
pub const UNAUTHORIZED_TEXT: &str = "Unauthorized";

/// Runs turns against a RAG backend, keeping per-conversation history.
///
/// Turns for the same conversation id are serialized: the user message and
/// its reply are always adjacent in the stored history. Turns for different
/// ids run concurrently.
pub struct TurnPipeline {
    rag: Arc<dyn RagClient>,
    history: Arc<dyn HistoryStore>,
    validator: Arc<dyn TokenValidator>,
    bot: BotConfig,
    turn_locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl TurnPipeline {
    pub fn new(
        rag: Arc<dyn RagClient>,
        history: Arc<dyn HistoryStore>,
        validator: Arc<dyn TokenValidator>,
    ) -> Self {
        Self {
            rag,
            history,
            validator,
            bot: BotConfig::default(),
            turn_locks: DashMap::new(),
        }
    }

    /// Override the fallback, apology and welcome texts.
    pub fn with_bot_config(mut self, bot: BotConfig) -> Self {
        self.bot = bot;
        self
    }

    pub fn bot_config(&self) -> &BotConfig {
        &self.bot
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Run the token validator alone, for events that never reach the backend.
    pub async fn authorize(&self, auth_header: Option<&str>) -> bool {
        self.validator.validate(auth_header).await
    }

    /// Handle one turn. Never fails: every outcome is a [`TurnResult`] whose
    /// `reply_text` is safe to show the end user.
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnResult {
        let span = info_span!(
            "turn",
            turn_id = %Uuid::new_v4(),
            conversation_id = %request.conversation_id,
            stateless = request.transcript.is_some(),
        );
        self.run_turn(request).instrument(span).await
    }

    async fn run_turn(&self, request: TurnRequest) -> TurnResult {
        if request.incoming_text.trim().is_empty() {
            debug!("Rejecting turn without input text");
            return TurnResult::failed(TurnStatus::BadRequest, MISSING_INPUT_TEXT);
        }

        if !self.validator.validate(request.auth_header.as_deref()).await {
            info!("Turn rejected by token validator");
            return TurnResult::failed(TurnStatus::Unauthorized, UNAUTHORIZED_TEXT);
        }

        match request.transcript {
            Some(transcript) => self.run_stateless(transcript).await,
            None => {
                self.run_stateful(&request.conversation_id, request.incoming_text)
                    .await
            }
        }
    }

    /// Client-managed transcript: forwarded as-is, the store is never touched.
    async fn run_stateless(&self, transcript: Vec<ChatMessage>) -> TurnResult {
        match self.rag.complete(&transcript).await {
            Ok(response) => {
                let (reply, response) = self.select_reply(response);
                info!(history_len = transcript.len(), "Stateless turn completed");
                TurnResult::ok(reply, response)
            }
            Err(e) => self.upstream_failure(&e),
        }
    }

    async fn run_stateful(&self, id: &ConversationId, text: String) -> TurnResult {
        let lock = self.turn_lock(id);
        let _guard = lock.lock().await;

        let mut transcript = match self.history.get(id).await {
            Ok(history) => history,
            Err(e) => {
                error!(error = %e, store = self.history.name(), "Failed to load history");
                return TurnResult::failed(TurnStatus::UpstreamError, &self.bot.apology_text);
            }
        };

        let user = ChatMessage::user(text);
        if let Err(e) = self.history.append(id, user.clone()).await {
            error!(error = %e, store = self.history.name(), "Failed to record user turn");
            return TurnResult::failed(TurnStatus::UpstreamError, &self.bot.apology_text);
        }
        transcript.push(user);

        // The user turn stays recorded even if the backend fails below.
        let response = match self.rag.complete(&transcript).await {
            Ok(response) => response,
            Err(e) => return self.upstream_failure(&e),
        };

        let (reply, response) = self.select_reply(response);
        if let Err(e) = self
            .history
            .append(id, ChatMessage::assistant(reply.clone()))
            .await
        {
            warn!(error = %e, store = self.history.name(), "Failed to record assistant turn");
        }

        info!(history_len = transcript.len() + 1, "Turn completed");
        TurnResult::ok(reply, response)
    }

    /// Pick the reply text, substituting the fallback when the backend gave
    /// no usable choice. The returned response always carries the reply.
    fn select_reply(&self, response: RagResponse) -> (String, RagResponse) {
        if let Some(text) = response.reply_text().map(str::to_string) {
            return (text, response);
        }

        warn!(model = %response.model, "Backend returned no usable choice; using fallback reply");
        let fallback = self.bot.fallback_reply.clone();
        let mut patched = response;
        patched.choices = RagResponse::from_text(&patched.model, &fallback).choices;
        (fallback, patched)
    }

    fn upstream_failure(&self, e: &dyn std::error::Error) -> TurnResult {
        error!(error = %e, backend = self.rag.name(), "RAG backend call failed");
        TurnResult::failed(TurnStatus::UpstreamError, &self.bot.apology_text)
    }

    fn turn_lock(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
