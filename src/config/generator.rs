//! Generation backend configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Configuration for the Gemini generation backend.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// API key for the model backend
    pub api_key: Option<Secret<String>>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum wall-clock seconds allowed for one generation call.
    /// Keeps slow requests from clogging the queue under load.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Routing/dispatch instructions for the orchestrator model
    pub orchestrator_instructions: Option<String>,

    /// Domain instructions for the procurement handler
    pub procurement_instructions: Option<String>,
}

impl GeneratorConfig {
    /// Get the run deadline as a Duration
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Validate generator configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_none() {
            return Err(ValidationError::MissingRequired(
                "AGENT_GATEWAY__GENERATOR__API_KEY",
            ));
        }
        if self.run_timeout_secs == 0 || self.run_timeout_secs > 600 {
            return Err(ValidationError::InvalidRunTimeout);
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            run_timeout_secs: default_run_timeout(),
            orchestrator_instructions: None,
            procurement_instructions: None,
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_run_timeout() -> u64 {
    60
}
