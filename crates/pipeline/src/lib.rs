//! Turn orchestration for RagBridge.
//!
//! [`TurnPipeline`] runs one inbound turn end to end: input check, token
//! validation, history bookkeeping, the single RAG call, and reply selection.
//! [`ActivityBot`] sits on top and dispatches bot-framework activities
//! (messages and member joins) onto the pipeline.

pub mod bot;
pub mod turn;

#[cfg(test)]
mod test_helpers;

pub use bot::{ActivityBot, ActivityOutcome};
pub use turn::TurnPipeline;
