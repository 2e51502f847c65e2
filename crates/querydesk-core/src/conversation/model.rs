//! Conversation domain model.
//!
//! This module contains the core Conversation entity that business logic
//! operates on, independent of any specific storage format.

use super::turn::Turn;
use serde::{Deserialize, Serialize};

/// Name given to conversations created without an explicit one.
pub const DEFAULT_CONVERSATION_NAME: &str = "New chat";

/// A durable, per-entity conversation log.
///
/// A conversation contains:
/// - The ordered turn log (insertion order is conversation order)
/// - The user's unsent draft input, restored after navigation
/// - The snippet blocks attached but not yet submitted
/// - Timestamps for creation and last update
///
/// Turns are append-mostly: once committed a turn is never deleted except by
/// the clear operation, and the only in-place mutation is attaching results
/// to an existing assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (UUID format)
    pub id: String,
    /// Human-readable conversation name
    pub name: String,
    /// Timestamp when the conversation was created (ISO 8601 format)
    pub created_at: String,
    /// Timestamp when the conversation was last updated (ISO 8601 format)
    pub updated_at: String,
    /// The ordered turn log.
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// Unsent input text, restored when the conversation becomes active again.
    #[serde(default)]
    pub draft_input: String,
    /// Snippet blocks attached but not yet merged into a submission.
    #[serde(default)]
    pub attached_snippets: Vec<String>,
}

impl Conversation {
    /// Creates an empty conversation with a fresh UUID.
    ///
    /// A blank name falls back to [`DEFAULT_CONVERSATION_NAME`].
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name)
    }

    /// Creates an empty conversation with the given identity.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.trim().is_empty() {
            name = DEFAULT_CONVERSATION_NAME.to_string();
        }

        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            name,
            created_at: now.clone(),
            updated_at: now,
            turns: Vec::new(),
            draft_input: String::new(),
            attached_snippets: Vec::new(),
        }
    }

    /// Refreshes `updated_at` to the current UTC time.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
