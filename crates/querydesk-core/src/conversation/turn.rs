//! Conversation turn types.
//!
//! This module contains types for representing turns in a conversation,
//! including roles and the ephemeral result attachments an assistant turn
//! can carry after the fact.

use serde::{Deserialize, Serialize};

/// Represents the author of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Turn written by the user.
    User,
    /// Turn streamed back by the AI assistant.
    Assistant,
}

/// A result block attached to an assistant turn after the fact, e.g. the
/// rows produced by running a suggested query.
///
/// Results are render-time data owned by the presentation layer. They are
/// persisted with the conversation so they survive navigation, but they are
/// never part of an outbound request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Sub-identity for turns carrying more than one result.
    pub result_id: String,
    /// Opaque result payload.
    pub data: serde_json::Value,
}

/// A single turn in a conversation.
///
/// Each turn has a role (user or assistant), content, and a timestamp
/// indicating when it was created. Assistant turns may additionally carry
/// `results` attached in place once the caller has executed a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn identifier (UUID format)
    pub id: String,
    /// The role of the turn author.
    pub role: TurnRole,
    /// Timestamp when the turn was created (ISO 8601 format).
    pub created_at: String,
    /// The content of the turn.
    pub content: String,
    /// Ephemeral result attachments; only ever populated on assistant turns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<QueryResult>,
}

impl Turn {
    /// Creates a new turn with a fresh UUID and the current UTC timestamp.
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            created_at: chrono::Utc::now().to_rfc3339(),
            content: content.into(),
            results: Vec::new(),
        }
    }

    /// Creates a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == TurnRole::Assistant
    }

    /// Attaches a result to this turn, replacing any existing result with
    /// the same `result_id` (multi-result turns keep their order otherwise).
    pub fn attach_result(&mut self, result: QueryResult) {
        if let Some(existing) = self
            .results
            .iter_mut()
            .find(|r| r.result_id == result.result_id)
        {
            *existing = result;
        } else {
            self.results.push(result);
        }
    }
}
