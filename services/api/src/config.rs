//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Environment-provisioned Gemini key. Overridden by an interactively
    /// supplied key when one has been stored.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Path of the persisted application snapshot. The interactive API key
    /// lives in a sibling file next to it.
    pub state_path: PathBuf,
    /// Whether POST /generate defaults to web-grounded generation when the
    /// request does not say.
    pub grounded_planning: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // Keys that still carry the setup placeholder count as absent, so a
        // copied-over .env template never reaches the network.
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty() && !key.contains("your_gemini"));

        let gemini_model = std::env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| "gemini-3-flash-preview".to_string());

        let state_path = std::env::var("STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_path());

        let grounded_planning = match std::env::var("GROUNDED_PLANNING") {
            Ok(value) => value.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(
                    "GROUNDED_PLANNING".to_string(),
                    format!("'{}' is not a boolean", value),
                )
            })?,
            Err(_) => false,
        };

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            gemini_model,
            state_path,
            grounded_planning,
        })
    }
}

/// Default snapshot location inside the platform data directory, with a
/// working-directory fallback for containers without one.
fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("globehopper").join("state.json"))
        .unwrap_or_else(|| PathBuf::from("./globehopper_state.json"))
}
