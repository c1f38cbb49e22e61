//! Feature toggles owned by process startup.
//!
//! The host process loads this once at startup and hands it to the
//! components whose behavior it gates. Nothing here is ambient or mutable at
//! runtime; a toggle change requires a restart.

use serde::{Deserialize, Serialize};

/// Toggles for the streaming workflow-run path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Enables accepting streamed document batches for workflow runs.
    /// Disabled nodes reject such requests at the RPC layer.
    pub streaming_enabled: bool,
}

impl StreamingConfig {
    /// Loads the configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("ARGUS_STREAMING_ENABLED") {
            self.streaming_enabled = value == "1" || value.to_lowercase() == "true";
        }
    }
}
