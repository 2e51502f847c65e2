//! State repository trait.

use async_trait::async_trait;

use crate::error::Result;

/// Repository for application-level state that persists across restarts.
///
/// Currently this tracks which conversation is active, so the panel can
/// restore it at session start.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Returns the ID of the active conversation, if one was recorded.
    async fn get_active_conversation(&self) -> Option<String>;

    /// Records the active conversation ID.
    async fn set_active_conversation(&self, conversation_id: String) -> Result<()>;

    /// Clears the recorded active conversation ID.
    async fn clear_active_conversation(&self) -> Result<()>;
}
