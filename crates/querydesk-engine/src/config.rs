//! Backend endpoint configuration.
//!
//! Configuration priority: explicit constructor > environment variables
//! (`QUERYDESK_ASSISTANT_URL`, `QUERYDESK_API_KEY`).

use querydesk_core::error::{QueryDeskError, Result};

/// Environment variable naming the assistant backend endpoint.
pub const ENDPOINT_ENV_VAR: &str = "QUERYDESK_ASSISTANT_URL";
/// Environment variable holding the bearer token, if the deployment uses one.
pub const API_KEY_ENV_VAR: &str = "QUERYDESK_API_KEY";

/// Connection settings for the streaming assistant backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// URL the turn-submission request is POSTed to.
    pub endpoint: String,
    /// Optional bearer token sent with every request.
    pub api_key: Option<String>,
}

impl EngineConfig {
    /// Creates a config for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    /// Adds a bearer token sent with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Loads the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the endpoint variable is not set.
    pub fn try_from_env() -> Result<Self> {
        let endpoint = std::env::var(ENDPOINT_ENV_VAR).map_err(|_| {
            QueryDeskError::config(format!("{} not set in environment", ENDPOINT_ENV_VAR))
        })?;

        Ok(Self {
            endpoint,
            api_key: std::env::var(API_KEY_ENV_VAR).ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = EngineConfig::new("https://assistant.example/api/chat")
            .with_api_key("secret-token");

        assert_eq!(config.endpoint, "https://assistant.example/api/chat");
        assert_eq!(config.api_key.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_api_key_is_optional() {
        let config = EngineConfig::new("https://assistant.example/api/chat");
        assert!(config.api_key.is_none());
    }
}
