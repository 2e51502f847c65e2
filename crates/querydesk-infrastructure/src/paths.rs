//! Path resolution for QueryDesk assistant data.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.querydesk/
//! ├── state.toml               # Application state (active conversation)
//! └── conversations/           # One TOML file per conversation
//!     └── <conversation-id>.toml
//! ```

use std::path::PathBuf;

use querydesk_core::error::{QueryDeskError, Result};

/// Returns the default base directory (`~/.querydesk`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| QueryDeskError::io("cannot determine home directory"))?;
    Ok(home.join(".querydesk"))
}
