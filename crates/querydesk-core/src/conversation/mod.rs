//! Conversation domain module.
//!
//! This module contains the conversation domain models and the repository
//! interface the session core persists them through.
//!
//! # Module Structure
//!
//! - `turn`: Turn types (`Turn`, `TurnRole`, `QueryResult`)
//! - `model`: Core conversation entity (`Conversation`)
//! - `repository`: Repository trait for conversation persistence

mod model;
mod repository;
mod turn;

// Re-export public API
pub use model::{Conversation, DEFAULT_CONVERSATION_NAME};
pub use repository::ConversationRepository;
pub use turn::{QueryResult, Turn, TurnRole};
