//! TOML-based StateRepository implementation.

use async_trait::async_trait;
use std::path::Path;

use querydesk_core::error::Result;
use querydesk_core::state::StateRepository;

use crate::dto::AppStateV1;
use crate::storage::AtomicTomlFile;

/// Persists application state to `<base>/state.toml`.
pub struct TomlStateRepository {
    file: AtomicTomlFile<AppStateV1>,
}

impl TomlStateRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            file: AtomicTomlFile::new(base_dir.as_ref().join("state.toml")),
        }
    }

    /// Creates a repository at the default location (see [`crate::paths`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(crate::paths::default_base_dir()?))
    }
}

#[async_trait]
impl StateRepository for TomlStateRepository {
    async fn get_active_conversation(&self) -> Option<String> {
        match self.file.load() {
            Ok(state) => state.and_then(|s| s.active_conversation_id),
            Err(error) => {
                tracing::warn!(%error, "failed to read app state");
                None
            }
        }
    }

    async fn set_active_conversation(&self, conversation_id: String) -> Result<()> {
        self.file.update(AppStateV1::default(), |state| {
            state.active_conversation_id = Some(conversation_id);
            Ok(())
        })
    }

    async fn clear_active_conversation(&self) -> Result<()> {
        self.file.update(AppStateV1::default(), |state| {
            state.active_conversation_id = None;
            Ok(())
        })
    }
}
