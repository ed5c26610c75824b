//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini generative-model API.
//! It implements the `ItineraryModelService` port from the `core` crate.

use async_trait::async_trait;
use globehopper_core::domain::Source;
use globehopper_core::ports::{
    GenerationMode, ItineraryModelService, PortError, PortResult, RawGeneration,
};
use globehopper_core::prompt::SYSTEM_INSTRUCTIONS;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The service answers 429 without a usable Retry-After; its observed quota
/// window is about a minute.
const RATE_LIMIT_RETRY: Duration = Duration::from_secs(60);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ItineraryModelService` against the Gemini
/// `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiPlanAdapter {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiPlanAdapter {
    /// Creates a new `GeminiPlanAdapter` for the given model id.
    pub fn new(model: String) -> Self {
        Self::with_base_url(model, DEFAULT_BASE_URL.to_string())
    }

    /// Creates an adapter pointed at a non-default endpoint (tests, proxies).
    pub fn with_base_url(model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            model,
        }
    }

    fn request_body<'a>(&self, prompt: &'a str, mode: GenerationMode) -> GenerateContentRequest<'a> {
        // Strict JSON output and the search tool are mutually exclusive
        // capabilities; the mode decides which one is requested.
        let (generation_config, tools) = match mode {
            GenerationMode::StrictSchema => (
                GenerationConfig {
                    response_mime_type: Some("application/json"),
                    temperature: 0.7,
                },
                None,
            ),
            GenerationMode::Grounded => (
                GenerationConfig {
                    response_mime_type: None,
                    temperature: 0.7,
                },
                Some(vec![ToolConfig {
                    google_search: EmptyObject {},
                }]),
            ),
        };

        GenerateContentRequest {
            system_instruction: ContentPayload {
                parts: vec![TextPart {
                    text: SYSTEM_INSTRUCTIONS,
                }],
            },
            contents: vec![ContentPayload {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config,
            tools,
        }
    }
}

//=========================================================================================
// Wire Format Structs
//=========================================================================================

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: ContentPayload<'a>,
    contents: Vec<ContentPayload<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolConfig>>,
}

#[derive(Serialize)]
struct ContentPayload<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    temperature: f64,
}

#[derive(Serialize)]
struct ToolConfig {
    google_search: EmptyObject,
}

#[derive(Serialize)]
struct EmptyObject {}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    title: Option<String>,
    uri: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    message: String,
}

//=========================================================================================
// Response and Failure Mapping
//=========================================================================================

/// Collects the candidate's text parts and grounding citations.
fn extract_raw(response: GenerateContentResponse) -> PortResult<RawGeneration> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| PortError::Unexpected("Gemini returned no candidates".to_string()))?;

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let citations = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    web.uri.map(|uri| Source {
                        title: web.title.unwrap_or_default(),
                        uri,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(RawGeneration { text, citations })
}

/// Maps a non-success HTTP reply onto the port's failure taxonomy so the
/// caller can react (re-prompt for a key, show a wait hint, and so on).
fn map_http_failure(status: StatusCode, body: &str) -> PortError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return PortError::RateLimited {
            retry_after: RATE_LIMIT_RETRY,
        };
    }

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || message.contains("API_KEY_INVALID")
        || message.contains("API key not valid")
    {
        return PortError::CredentialRejected(message);
    }

    PortError::Unexpected(format!(
        "Gemini request failed with status {}: {}",
        status, message
    ))
}

//=========================================================================================
// `ItineraryModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ItineraryModelService for GeminiPlanAdapter {
    /// Issues exactly one `generateContent` call. No retries, no backoff;
    /// the transport's default timeouts apply.
    async fn generate(
        &self,
        prompt: &str,
        mode: GenerationMode,
        credential: &str,
    ) -> PortResult<RawGeneration> {
        // Fail fast on an unusable key, before any network I/O.
        if credential.trim().is_empty() || credential.contains("your_gemini") {
            return Err(PortError::CredentialMissing);
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, ?mode, "issuing generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential)
            .json(&self.request_body(prompt, mode))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_failure(status, &body));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        extract_raw(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_credential_fails_fast_without_a_network_call() {
        // The base URL is unroutable; reaching it would fail differently.
        let adapter = GeminiPlanAdapter::with_base_url(
            "gemini-3-flash-preview".to_string(),
            "http://127.0.0.1:1".to_string(),
        );

        let err = adapter
            .generate("prompt", GenerationMode::StrictSchema, "")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::CredentialMissing));

        let err = adapter
            .generate("prompt", GenerationMode::StrictSchema, "your_gemini_key_here")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::CredentialMissing));
    }

    #[test]
    fn strict_mode_forces_json_and_grounded_mode_enables_search() {
        let adapter = GeminiPlanAdapter::new("gemini-3-flash-preview".to_string());

        let strict =
            serde_json::to_value(adapter.request_body("p", GenerationMode::StrictSchema)).unwrap();
        assert_eq!(
            strict["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(strict.get("tools").is_none());

        let grounded =
            serde_json::to_value(adapter.request_body("p", GenerationMode::Grounded)).unwrap();
        assert!(grounded["generationConfig"].get("responseMimeType").is_none());
        assert!(grounded["tools"][0].get("google_search").is_some());
    }

    #[test]
    fn extracts_text_parts_and_grounding_citations() {
        let payload: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"parts": [{"text": "{\"markdown\":"}, {"text": "\"G\"}"}]},
                    "groundingMetadata": {
                        "groundingChunks": [
                            {"web": {"title": "Visit Copenhagen", "uri": "https://visitcopenhagen.dk"}},
                            {"web": {"uri": "https://untitled.example"}},
                            {}
                        ]
                    }
                }]
            }"#,
        )
        .unwrap();

        let raw = extract_raw(payload).unwrap();
        assert_eq!(raw.text, "{\"markdown\":\"G\"}");
        assert_eq!(raw.citations.len(), 2);
        assert_eq!(raw.citations[0].title, "Visit Copenhagen");
        assert_eq!(raw.citations[1].title, "");
    }

    #[test]
    fn no_candidates_is_an_unexpected_condition() {
        let payload: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_raw(payload),
            Err(PortError::Unexpected(_))
        ));
    }

    #[test]
    fn http_failures_map_onto_the_port_taxonomy() {
        let err = map_http_failure(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(
            err,
            PortError::RateLimited { retry_after } if retry_after.as_secs() == 60
        ));

        let err = map_http_failure(StatusCode::FORBIDDEN, r#"{"error":{"message":"denied"}}"#);
        assert!(matches!(err, PortError::CredentialRejected(m) if m == "denied"));

        // Gemini reports a bad key as 400 with a machine-readable marker.
        let err = map_http_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#,
        );
        assert!(matches!(err, PortError::CredentialRejected(_)));

        let err = map_http_failure(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");
        assert!(matches!(err, PortError::Unexpected(m) if m.contains("upstream exploded")));
    }
}
