//! crates/globehopper_core/src/pipeline.rs
//!
//! The generation pipeline: prompt construction, one model call, and
//! normalization of the response. Pure composition over the model port;
//! merging the result into application state stays with the caller.

use crate::domain::{GenerationResult, TripDetails};
use crate::normalize;
use crate::ports::{ItineraryModelService, PortError, PortResult};
use crate::prompt;

/// Runs one user-initiated generation: build the prompt, issue exactly one
/// model call, normalize the raw text.
///
/// A response that parses but carries neither guide text nor events is
/// reported as malformed output: the user asked for a plan and got nothing
/// usable, which is the same "try again" condition as unparseable JSON.
pub async fn generate_plan(
    model: &dyn ItineraryModelService,
    credential: &str,
    details: &TripDetails,
    notes: &str,
    use_grounding: bool,
) -> PortResult<GenerationResult> {
    let request = prompt::build_request(details, notes, use_grounding);
    let raw = model.generate(&request.prompt, request.mode, credential).await?;
    let result = normalize::normalize(&raw)?;

    if result.markdown.is_empty() && result.events.is_empty() {
        return Err(PortError::MalformedOutput(
            "the model generated an empty itinerary".to_string(),
        ));
    }

    Ok(result)
}
