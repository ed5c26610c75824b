//! services/api/src/web/generation.rs
//!
//! The orchestration of one user-initiated "generate" action: validation,
//! credential resolution, the pipeline call, and the wholesale merge of a
//! successful result into the trip state.

use crate::web::state::AppState;
use globehopper_core::domain::{GenerationResult, TripDetails};
use globehopper_core::pipeline;
use globehopper_core::ports::{PortError, PortResult};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Holds the generation busy flag for the duration of one request.
///
/// Overlapping generations have no defined semantics, so a second request
/// while one is outstanding is rejected instead of interleaved.
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Pre-request validation: required trip fields must be filled in before
/// any network call is made.
fn validate_details(details: &TripDetails) -> PortResult<()> {
    if details.destination_names().is_empty() {
        return Err(PortError::InvalidInput(
            "fill in at least one destination".to_string(),
        ));
    }
    if details.end_date < details.start_date {
        return Err(PortError::InvalidInput(
            "the trip end date precedes its start date".to_string(),
        ));
    }
    Ok(())
}

/// Runs one generation end to end and merges the result.
///
/// On any failure the previous itinerary state is left intact; the store is
/// only mutated after full success. A rejected credential is additionally
/// cleared so the user is re-prompted with a fresh key.
pub async fn run_generation(app: &AppState, use_grounding: bool) -> PortResult<GenerationResult> {
    let (details, notes) = {
        let trip = app.trip.read().await;
        (trip.details.clone(), trip.notes.clone())
    };
    validate_details(&details)?;

    let credential = app
        .active_credential()
        .await
        .ok_or(PortError::CredentialMissing)?;

    let result = pipeline::generate_plan(
        app.model.as_ref(),
        &credential,
        &details,
        &notes,
        use_grounding,
    )
    .await;

    match result {
        Ok(generated) => {
            info!(
                events = generated.events.len(),
                sources = generated.sources.len(),
                "generation succeeded"
            );
            app.mutate(|trip| trip.apply_generation(generated.clone()))
                .await;
            Ok(generated)
        }
        Err(PortError::CredentialRejected(message)) => {
            // Discard the stored key so the next attempt prompts for entry.
            *app.credential.write().await = None;
            if let Err(e) = app.store.clear_credential().await {
                warn!(error = %e, "failed to clear the stored credential");
            }
            Err(PortError::CredentialRejected(message))
        }
        Err(e) => Err(e),
    }
}
