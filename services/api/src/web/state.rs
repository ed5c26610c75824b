//! services/api/src/web/state.rs
//!
//! Defines the application's shared state: the single controller-owned
//! `TripState` aggregate, the resolved credential, and the port adapters.

use crate::config::Config;
use globehopper_core::domain::TripState;
use globehopper_core::ports::{CurrencyRateService, ItineraryModelService, StateStore};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// The shared application state, created once at startup and passed to all
/// handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub model: Arc<dyn ItineraryModelService>,
    pub store: Arc<dyn StateStore>,
    pub rates: Arc<dyn CurrencyRateService>,
    /// The whole trip state behind one lock. Mutations go through
    /// [`AppState::mutate`] so every change is snapshotted.
    pub trip: RwLock<TripState>,
    /// The active API key: an interactively supplied one if stored,
    /// otherwise the environment-provisioned one.
    pub credential: RwLock<Option<String>>,
    /// Busy flag: re-entrant generation requests are rejected rather than
    /// interleaved.
    pub generating: AtomicBool,
}

impl AppState {
    /// Applies one mutation to the trip state and snapshots the result.
    ///
    /// A failed snapshot write is logged and does not fail the mutation:
    /// the in-memory state is already updated and the next successful save
    /// wins.
    pub async fn mutate<F>(&self, apply: F) -> TripState
    where
        F: FnOnce(&mut TripState),
    {
        let snapshot = {
            let mut trip = self.trip.write().await;
            apply(&mut trip);
            trip.clone()
        };
        if let Err(e) = self.store.save_state(&snapshot).await {
            warn!(error = %e, "failed to persist trip snapshot");
        }
        snapshot
    }

    pub async fn active_credential(&self) -> Option<String> {
        self.credential.read().await.clone()
    }
}
