//! crates/globehopper_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the Gemini API
//! or the on-disk snapshot format.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Source, TripState};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// The generation-related variants mirror the conditions the UI has to
/// distinguish: a missing key prompts for entry, a rejected key clears the
/// stored one, a rate limit shows a wait hint, and malformed model output
/// is a "try again".
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),
    #[error("API credential is missing")]
    CredentialMissing,
    #[error("API credential was rejected: {0}")]
    CredentialRejected(String),
    #[error("Rate limited; retry in {} seconds", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    #[error("Model output could not be parsed: {0}")]
    MalformedOutput(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Generation Types
//=========================================================================================

/// How the model is asked to answer.
///
/// Strict schema and web grounding are mutually exclusive capabilities of
/// the underlying model, so the mode is a single enum rather than two flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Force the response MIME type to JSON; no external tools.
    StrictSchema,
    /// Allow live web search, accepting looser JSON framing in return.
    Grounded,
}

/// The raw outcome of one model call, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawGeneration {
    pub text: String,
    /// Citation records extracted from grounding metadata. Always empty in
    /// `StrictSchema` mode.
    pub citations: Vec<Source>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The external generative-model boundary.
#[async_trait]
pub trait ItineraryModelService: Send + Sync {
    /// Issues exactly one request to the model and returns its raw text.
    /// No internal retries; re-triggering is the caller's decision.
    async fn generate(
        &self,
        prompt: &str,
        mode: GenerationMode,
        credential: &str,
    ) -> PortResult<RawGeneration>;
}

/// The persisted-state boundary: one opaque record holding the whole
/// application state, plus the separately-stored interactive API key.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Restores the last snapshot, or `None` on first launch.
    async fn load_state(&self) -> PortResult<Option<TripState>>;

    /// Writes the full snapshot. Last write wins.
    async fn save_state(&self, state: &TripState) -> PortResult<()>;

    async fn load_credential(&self) -> PortResult<Option<String>>;

    async fn save_credential(&self, credential: &str) -> PortResult<()>;

    async fn clear_credential(&self) -> PortResult<()>;
}

/// External currency-rate lookup. The generation pipeline does not depend
/// on this; it exists for the ledger's home-currency display.
#[async_trait]
pub trait CurrencyRateService: Send + Sync {
    /// Returns the conversion rate from one ISO currency code to another.
    async fn rate(&self, from: &str, to: &str) -> PortResult<f64>;
}
