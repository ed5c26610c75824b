//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, plus the
//! mapping from port errors to HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use globehopper_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps a port error to the HTTP status and user-visible message the
/// handlers return.
///
/// Every generation failure is surfaced as a notification and leaves the
/// existing trip state untouched; nothing here is fatal to the application.
pub fn port_error_response(error: &PortError) -> (StatusCode, String) {
    match error {
        PortError::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        PortError::CredentialMissing => (
            StatusCode::UNAUTHORIZED,
            "No API key is configured. Supply one via POST /credential or GEMINI_API_KEY."
                .to_string(),
        ),
        PortError::CredentialRejected(_) => (
            StatusCode::UNAUTHORIZED,
            "The API key was rejected. It has been cleared; please enter a new one.".to_string(),
        ),
        PortError::RateLimited { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            format!(
                "Quota exceeded. Please wait {} seconds and try again.",
                retry_after.as_secs()
            ),
        ),
        PortError::MalformedOutput(_) => (
            StatusCode::BAD_GATEWAY,
            "The model response could not be understood. Please try again.".to_string(),
        ),
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
        PortError::Unexpected(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
    }
}
