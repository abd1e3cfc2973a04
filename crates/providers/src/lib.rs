//! RAG backend clients for RagBridge.
//!
//! All clients implement the `ragbridge_core::RagClient` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatRagClient;
