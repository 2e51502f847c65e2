//! Application state DTO.

use serde::{Deserialize, Serialize};

/// Application state that persists across restarts (`state.toml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppStateV1 {
    /// ID of the active conversation, restored at session start.
    pub active_conversation_id: Option<String>,
}
