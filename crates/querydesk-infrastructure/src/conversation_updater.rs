//! Conversation updater helper for metadata operations.
//!
//! Abstracts the common "find, update, touch, save" cycle used by metadata
//! operations such as renaming a conversation from the sidebar.

use std::sync::Arc;

use querydesk_core::conversation::{Conversation, ConversationRepository};
use querydesk_core::error::{QueryDeskError, Result};

/// Helper for updating a stored conversation in place.
pub struct ConversationUpdater {
    repository: Arc<dyn ConversationRepository>,
}

impl ConversationUpdater {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    /// Applies `updater` to the stored conversation, refreshes `updated_at`,
    /// and saves the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation doesn't exist, the updater
    /// fails, or saving fails.
    pub async fn update<F>(&self, conversation_id: &str, updater: F) -> Result<()>
    where
        F: FnOnce(&mut Conversation) -> Result<()>,
    {
        let mut conversation = self
            .repository
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| QueryDeskError::not_found("Conversation", conversation_id))?;

        updater(&mut conversation)?;
        conversation.touch();

        tracing::debug!(conversation_id, "saving updated conversation");
        self.repository.save(&conversation).await
    }

    /// Renames a conversation.
    pub async fn rename(&self, conversation_id: &str, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        self.update(conversation_id, move |conversation| {
            conversation.name = new_name;
            Ok(())
        })
        .await
    }
}
