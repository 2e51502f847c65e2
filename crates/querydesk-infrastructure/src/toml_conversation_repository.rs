//! TOML-based ConversationRepository implementation.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use querydesk_core::conversation::{Conversation, ConversationRepository};
use querydesk_core::error::Result;

use crate::dto::ConversationV1;
use crate::storage::AtomicTomlFile;

/// Stores each conversation as an individual TOML file.
///
/// ```text
/// base_dir/
/// └── conversations/
///     ├── <conversation-id-1>.toml
///     └── <conversation-id-2>.toml
/// ```
///
/// Persistence goes through DTOs ([`ConversationV1`]) so the storage format
/// can evolve independently of the domain model, and every write is atomic
/// (temp file + rename).
pub struct TomlConversationRepository {
    base_dir: PathBuf,
}

impl TomlConversationRepository {
    /// Creates a repository rooted at `base_dir`, creating the directory
    /// structure if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversations directory cannot be created.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("conversations"))?;
        Ok(Self { base_dir })
    }

    /// Creates a repository at the default location (see [`crate::paths`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// directory structure cannot be created.
    pub fn default_location() -> Result<Self> {
        Self::new(crate::paths::default_base_dir()?)
    }

    fn conversation_file(&self, conversation_id: &str) -> AtomicTomlFile<ConversationV1> {
        AtomicTomlFile::new(
            self.base_dir
                .join("conversations")
                .join(format!("{}.toml", conversation_id)),
        )
    }

    fn load_from_path(path: &Path) -> Result<Option<Conversation>> {
        let file = AtomicTomlFile::<ConversationV1>::new(path.to_path_buf());
        match file.load()? {
            Some(dto) => Ok(Some(dto.into_domain()?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ConversationRepository for TomlConversationRepository {
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Self::load_from_path(self.conversation_file(conversation_id).path())
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        let dto = ConversationV1::from(conversation);
        self.conversation_file(&conversation.id).save(&dto)
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let path = self
            .base_dir
            .join("conversations")
            .join(format!("{}.toml", conversation_id));
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Conversation>> {
        let conversations_dir = self.base_dir.join("conversations");
        let mut conversations = Vec::new();

        for entry in fs::read_dir(&conversations_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            match Self::load_from_path(&path) {
                Ok(Some(conversation)) => conversations.push(conversation),
                Ok(None) => {}
                Err(error) => {
                    // One corrupt file should not take the whole list down.
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable conversation file");
                }
            }
        }

        conversations.sort_by(sort_by_recent_desc);
        Ok(conversations)
    }
}

fn sort_by_recent_desc(left: &Conversation, right: &Conversation) -> Ordering {
    right
        .updated_at
        .cmp(&left.updated_at)
        .then_with(|| right.id.cmp(&left.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use querydesk_core::conversation::Turn;
    use tempfile::TempDir;

    fn conversation_named(name: &str) -> Conversation {
        let mut conversation = Conversation::new(name);
        conversation.turns.push(Turn::user("Hello"));
        conversation.turns.push(Turn::assistant("Hi there!"));
        conversation
    }

    #[tokio::test]
    async fn test_save_and_find_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlConversationRepository::new(temp_dir.path()).unwrap();

        let mut conversation = conversation_named("Slow queries");
        conversation.draft_input = "what about".to_string();
        conversation.attached_snippets = vec!["SELECT 1".to_string()];
        repository.save(&conversation).await.unwrap();

        let loaded = repository.find_by_id(&conversation.id).await.unwrap().unwrap();
        assert_eq!(loaded, conversation);
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlConversationRepository::new(temp_dir.path()).unwrap();

        assert!(repository.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_sorted_most_recent_first() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlConversationRepository::new(temp_dir.path()).unwrap();

        let mut first = conversation_named("first");
        first.updated_at = "2026-01-01T00:00:00Z".to_string();
        let mut second = conversation_named("second");
        second.updated_at = "2026-02-01T00:00:00Z".to_string();
        repository.save(&first).await.unwrap();
        repository.save(&second).await.unwrap();

        let all = repository.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "second");
        assert_eq!(all[1].name, "first");
    }

    #[tokio::test]
    async fn test_list_all_skips_unparsable_files() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlConversationRepository::new(temp_dir.path()).unwrap();

        repository.save(&conversation_named("good")).await.unwrap();
        fs::write(
            temp_dir.path().join("conversations").join("broken.toml"),
            "not = [valid",
        )
        .unwrap();

        let all = repository.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "good");
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlConversationRepository::new(temp_dir.path()).unwrap();

        let conversation = conversation_named("doomed");
        repository.save(&conversation).await.unwrap();
        assert!(repository.find_by_id(&conversation.id).await.unwrap().is_some());

        repository.delete(&conversation.id).await.unwrap();
        assert!(repository.find_by_id(&conversation.id).await.unwrap().is_none());

        // Deleting again is not an error.
        repository.delete(&conversation.id).await.unwrap();
    }
}
