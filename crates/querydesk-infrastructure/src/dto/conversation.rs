//! Conversation DTOs.

use serde::{Deserialize, Serialize};

use querydesk_core::conversation::{Conversation, QueryResult, Turn, TurnRole};
use querydesk_core::error::{QueryDeskError, Result};

/// Persisted schema for a single turn.
///
/// Result payloads are stored as JSON text: TOML has no null and no
/// heterogeneous values, while the attached query output is arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnV1 {
    pub id: String,
    pub role: String,
    pub created_at: String,
    pub content: String,
    #[serde(default)]
    pub results: Vec<ResultV1>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultV1 {
    pub result_id: String,
    pub data_json: String,
}

/// Persisted schema for a conversation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationV1 {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub turns: Vec<TurnV1>,
    #[serde(default)]
    pub draft_input: String,
    #[serde(default)]
    pub attached_snippets: Vec<String>,
}

impl TurnV1 {
    pub fn into_domain(self) -> Result<Turn> {
        let role = match self.role.as_str() {
            "user" => TurnRole::User,
            "assistant" => TurnRole::Assistant,
            other => {
                return Err(QueryDeskError::data_access(format!(
                    "unknown turn role '{}' in turn '{}'",
                    other, self.id
                )));
            }
        };

        let mut results = Vec::with_capacity(self.results.len());
        for result in self.results {
            let data = serde_json::from_str(&result.data_json)?;
            results.push(QueryResult {
                result_id: result.result_id,
                data,
            });
        }

        Ok(Turn {
            id: self.id,
            role,
            created_at: self.created_at,
            content: self.content,
            results,
        })
    }
}

impl From<&Turn> for TurnV1 {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        };

        Self {
            id: turn.id.clone(),
            role: role.to_string(),
            created_at: turn.created_at.clone(),
            content: turn.content.clone(),
            results: turn
                .results
                .iter()
                .map(|result| ResultV1 {
                    result_id: result.result_id.clone(),
                    // Value serialization to a string cannot fail.
                    data_json: serde_json::to_string(&result.data)
                        .unwrap_or_else(|_| "null".to_string()),
                })
                .collect(),
        }
    }
}

impl ConversationV1 {
    pub fn into_domain(self) -> Result<Conversation> {
        let mut turns = Vec::with_capacity(self.turns.len());
        for turn in self.turns {
            turns.push(turn.into_domain()?);
        }

        Ok(Conversation {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
            turns,
            draft_input: self.draft_input,
            attached_snippets: self.attached_snippets,
        })
    }
}

impl From<&Conversation> for ConversationV1 {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            name: conversation.name.clone(),
            created_at: conversation.created_at.clone(),
            updated_at: conversation.updated_at.clone(),
            turns: conversation.turns.iter().map(TurnV1::from).collect(),
            draft_input: conversation.draft_input.clone(),
            attached_snippets: conversation.attached_snippets.clone(),
        }
    }
}
