//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values use the `AGENT_GATEWAY` prefix
//! with `__` separating nested sections, e.g.
//! `AGENT_GATEWAY__SERVER__PORT=8080`.

mod error;
mod generator;
mod logs;
mod mail;
mod server;

pub use error::{ConfigError, ValidationError};
pub use generator::GeneratorConfig;
pub use logs::LogsConfig;
pub use mail::MailConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation backend configuration (model, key, run deadline)
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Mail identity used by the dispatch directive
    #[serde(default)]
    pub mail: MailConfig,

    /// Conversation log configuration
    #[serde(default)]
    pub logs: LogsConfig,
}

impl AppConfig {
    /// Loads configuration from environment variables (and `.env` in
    /// development).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("AGENT_GATEWAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validates all configuration sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.generator.validate()?;
        Ok(())
    }

    /// Check if running in production environment.
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("AGENT_GATEWAY__GENERATOR__API_KEY", "test-key");
    }

    fn clear_env() {
        env::remove_var("AGENT_GATEWAY__GENERATOR__API_KEY");
        env::remove_var("AGENT_GATEWAY__SERVER__PORT");
        env::remove_var("AGENT_GATEWAY__GENERATOR__RUN_TIMEOUT_SECS");
    }

    #[test]
    fn loads_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.generator.model, "gemini-2.5-flash");
        assert_eq!(config.generator.run_timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("AGENT_GATEWAY__SERVER__PORT", "3000");
        env::set_var("AGENT_GATEWAY__GENERATOR__RUN_TIMEOUT_SECS", "30");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.generator.run_timeout_secs, 30);
    }

    #[test]
    fn missing_api_key_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();
        assert!(config.validate().is_err());
    }
}
