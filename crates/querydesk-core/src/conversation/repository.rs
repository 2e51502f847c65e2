//! Conversation repository trait.
//!
//! Defines the interface for conversation persistence operations.

use super::model::Conversation;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for managing conversation persistence.
///
/// This trait defines the contract for persisting and retrieving
/// conversations, decoupling the session core from the specific storage
/// mechanism (e.g., TOML files, database, remote API).
///
/// The turn log inside a saved conversation is prefix-consistent: callers
/// append turns and save the whole entity, and a reader never observes a
/// partially-written pair.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Finds a conversation by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Conversation))`: Conversation found
    /// - `Ok(None)`: Conversation not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Saves a conversation to storage, replacing any previous value.
    async fn save(&self, conversation: &Conversation) -> Result<()>;

    /// Deletes a conversation from storage.
    ///
    /// Deleting a conversation that does not exist is not an error.
    async fn delete(&self, conversation_id: &str) -> Result<()>;

    /// Lists all stored conversations, most recently updated first.
    async fn list_all(&self) -> Result<Vec<Conversation>>;
}
