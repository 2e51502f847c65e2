//! Outbound request payload shaping.
//!
//! [`build_request`] turns the full transcript plus caller context into the
//! bounded, sanitized body sent to the assistant backend for the next turn.

use serde::{Deserialize, Serialize};

use crate::conversation::{Turn, TurnRole};

/// Default number of trailing turns included in a request.
///
/// Kept odd on purpose: turns alternate role, so an odd window starts on a
/// user turn as often as possible instead of opening with a dangling
/// assistant turn.
pub const DEFAULT_MAX_HISTORY: usize = 5;

/// How much of their data the user has agreed to share with the assistant
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiOptInLevel {
    Disabled,
    Schema,
    SchemaAndLog,
    SchemaAndLogAndData,
}

impl Default for AiOptInLevel {
    fn default() -> Self {
        AiOptInLevel::Disabled
    }
}

/// Caller-supplied fields merged into every outbound request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub ai_opt_in_level: AiOptInLevel,
    pub project_ref: String,
    pub connection_string: String,
    pub schema: String,
    pub table: Option<String>,
    pub chat_name: Option<String>,
    pub include_schema_metadata: Option<bool>,
    pub org_slug: Option<String>,
}

/// A sanitized copy of a turn as it appears on the wire.
///
/// This type deliberately has no `results` field, so render-time attachments
/// cannot leak into a request body through any code path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTurn {
    pub id: String,
    pub role: TurnRole,
    pub created_at: String,
    pub content: String,
}

impl From<&Turn> for WireTurn {
    fn from(turn: &Turn) -> Self {
        Self {
            id: turn.id.clone(),
            role: turn.role,
            created_at: turn.created_at.clone(),
            content: turn.content.clone(),
        }
    }
}

/// The outbound turn-submission request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<WireTurn>,
    pub ai_opt_in_level: AiOptInLevel,
    pub project_ref: String,
    pub connection_string: String,
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_schema_metadata: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_slug: Option<String>,
}

/// Builds the request body for the next turn.
///
/// Takes the strict suffix of the last `max_history` turns (fewer if the
/// transcript is shorter), sanitizes each into a [`WireTurn`], and merges in
/// the caller context. Pure: the same transcript suffix and context always
/// produce the same body, and inputs are not mutated.
pub fn build_request(
    transcript: &[Turn],
    max_history: usize,
    context: &RequestContext,
) -> ChatRequest {
    let start = transcript.len().saturating_sub(max_history);
    let messages = transcript[start..].iter().map(WireTurn::from).collect();

    ChatRequest {
        messages,
        ai_opt_in_level: context.ai_opt_in_level,
        project_ref: context.project_ref.clone(),
        connection_string: context.connection_string.clone(),
        schema: context.schema.clone(),
        table: context.table.clone(),
        chat_name: context.chat_name.clone(),
        include_schema_metadata: context.include_schema_metadata,
        org_slug: context.org_slug.clone(),
    }
}
