//! # RagBridge Core
//!
//! Domain types, traits, and error definitions for the RagBridge chat gateway.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the turn pipeline is defined as a trait here.
//! Implementations live in their respective crates:
//! - `RagClient` → `ragbridge-providers`
//! - `HistoryStore` → `ragbridge-history`
//! - `TokenValidator` → `ragbridge-security`

pub mod activity;
pub mod auth;
pub mod error;
pub mod history;
pub mod message;
pub mod rag;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use activity::{Activity, ActivityType, ChannelAccount};
pub use auth::TokenValidator;
pub use error::{Error, Result};
pub use history::HistoryStore;
pub use message::{ChatMessage, ConversationId, Role};
pub use rag::{RagChoice, RagClient, RagResponse};
pub use turn::{TurnRequest, TurnResult, TurnStatus};
