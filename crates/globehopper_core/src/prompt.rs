//! crates/globehopper_core/src/prompt.rs
//!
//! Builds the natural-language request sent to the generative model.
//! Pure construction: no validation, no I/O.

use crate::domain::TripDetails;
use crate::ports::GenerationMode;

/// The system instruction accompanying every generation request.
pub const SYSTEM_INSTRUCTIONS: &str = "You are an expert travel planner. You provide high-quality, practical itineraries. Output ONLY valid JSON.";

const PROMPT_TEMPLATE: &str = r#"Generate a detailed travel itinerary for {destinations} starting from {start_date} and ending on {end_date}.
Origin: {origin}.
Preferences: "{notes}".

You MUST return the response as a JSON object with this exact structure:
{
  "markdown": "A beautiful, long-form travel guide in Markdown with headers, bullet points, and tips.",
  "events": [
    {
      "date": "YYYY-MM-DD",
      "time": "HH:MM",
      "activity": "Name of the activity",
      "location": "Specific location/address",
      "lat": 0.0,
      "lon": 0.0,
      "mapLink": "Google Maps URL"
    }
  ]
}
Every event date must fall between {start_date} and {end_date} inclusive."#;

/// A fully-built generation request: the prompt text plus the operating
/// mode the client should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub prompt: String,
    pub mode: GenerationMode,
}

/// Combines trip parameters and free-text preferences into one prompt and
/// selects the operating mode.
///
/// This is a pure function of its inputs. Degenerate inputs (no
/// destinations, empty notes) still yield a well-formed prompt; rejecting
/// them is the caller's responsibility.
pub fn build_request(details: &TripDetails, notes: &str, use_grounding: bool) -> PlanRequest {
    let destinations = details.destination_names().join(", ");

    let prompt = PROMPT_TEMPLATE
        .replace("{destinations}", &destinations)
        .replace("{start_date}", &details.start_date.to_string())
        .replace("{end_date}", &details.end_date.to_string())
        .replace("{origin}", &details.origin)
        .replace("{notes}", notes);

    let mode = if use_grounding {
        GenerationMode::Grounded
    } else {
        GenerationMode::StrictSchema
    };

    PlanRequest { prompt, mode }
}
