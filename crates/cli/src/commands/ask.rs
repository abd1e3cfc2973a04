//! `ragbridge ask`: Run one turn from the command line.

use anyhow::bail;
use ragbridge_core::message::ConversationId;
use ragbridge_core::turn::TurnRequest;
use ragbridge_pipeline::TurnPipeline;
use ragbridge_providers::OpenAiCompatRagClient;
use ragbridge_security::TrustedCaller;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub async fn run(
    config_path: Option<&Path>,
    question: String,
    conversation: Option<String>,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    let rag = Arc::new(OpenAiCompatRagClient::from_config(&config.rag)?);
    let history = ragbridge_history::build_from_config(&config);
    let pipeline = TurnPipeline::new(rag, history, Arc::new(TrustedCaller))
        .with_bot_config(config.bot.clone());

    let id = ConversationId::or_anonymous(conversation.as_deref());
    debug!(conversation_id = %id, backend = %config.rag.api_url, "Asking");
    let result = pipeline.handle_turn(TurnRequest::new(id, question)).await;

    if !result.is_ok() {
        bail!("{} ({})", result.reply_text, result.status);
    }
    println!("{}", result.reply_text);
    Ok(())
}
