//! End-to-end tests of the generation pipeline against a scripted model
//! port: a successful generation replaces the itinerary wholesale, every
//! failure leaves the previous state untouched.

use api_lib::adapters::{FrankfurterRateAdapter, JsonFileStore};
use api_lib::config::Config;
use api_lib::web::generation::{run_generation, BusyGuard};
use api_lib::web::state::AppState;
use async_trait::async_trait;
use globehopper_core::domain::{Destination, ItineraryItem, TripState};
use globehopper_core::ports::{
    GenerationMode, ItineraryModelService, PortError, PortResult, RawGeneration, StateStore,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::Level;

/// A model port whose reply is scripted by the test.
struct ScriptedModel {
    reply: Box<dyn Fn() -> PortResult<RawGeneration> + Send + Sync>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn replying<F>(reply: F) -> Arc<Self>
    where
        F: Fn() -> PortResult<RawGeneration> + Send + Sync + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItineraryModelService for ScriptedModel {
    async fn generate(
        &self,
        _prompt: &str,
        _mode: GenerationMode,
        _credential: &str,
    ) -> PortResult<RawGeneration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)()
    }
}

fn old_event() -> ItineraryItem {
    ItineraryItem {
        date: "2024-06-01".to_string(),
        time: "10:00".to_string(),
        activity: "Stale activity".to_string(),
        location: "Previous destination".to_string(),
        lat: 1.0,
        lon: 1.0,
        map_link: None,
    }
}

fn app_with(
    model: Arc<ScriptedModel>,
    dir: &tempfile::TempDir,
    credential: Option<&str>,
) -> Arc<AppState> {
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: Level::INFO,
        gemini_api_key: None,
        gemini_model: "gemini-3-flash-preview".to_string(),
        state_path: dir.path().join("state.json"),
        grounded_planning: false,
    });

    let mut trip = TripState::seed();
    trip.details.destinations = vec![Destination {
        name: "Copenhagen".to_string(),
    }];
    trip.details.start_date = "2024-06-01".parse().unwrap();
    trip.details.end_date = "2024-06-03".parse().unwrap();
    trip.itinerary.replace_all(vec![old_event()]);
    trip.markdown = "# Old guide".to_string();

    Arc::new(AppState {
        config: config.clone(),
        model,
        store: Arc::new(JsonFileStore::new(config.state_path.clone())),
        rates: Arc::new(FrankfurterRateAdapter::new()),
        trip: RwLock::new(trip),
        credential: RwLock::new(credential.map(str::to_string)),
        generating: AtomicBool::new(false),
    })
}

const GOOD_REPLY: &str = r##"```json
{"markdown":"# New guide","events":[{"date":"2024-06-02","time":"09:30","activity":"Harbor swim","location":"Islands Brygge","lat":"55.66","lon":12.57}]}
```"##;

#[tokio::test]
async fn successful_generation_replaces_the_itinerary_wholesale() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::replying(|| {
        Ok(RawGeneration {
            text: GOOD_REPLY.to_string(),
            citations: Vec::new(),
        })
    });
    let app = app_with(model.clone(), &dir, Some("key"));

    let result = run_generation(&app, false).await.unwrap();
    assert_eq!(result.markdown, "# New guide");
    assert_eq!(model.call_count(), 1);

    let trip = app.trip.read().await;
    assert_eq!(trip.markdown, "# New guide");
    // No stale events from the previous destination set linger.
    assert!(trip
        .itinerary
        .events_for_day("2024-06-01".parse().unwrap())
        .is_empty());
    let new_day = trip.itinerary.events_for_day("2024-06-02".parse().unwrap());
    assert_eq!(new_day.len(), 1);
    assert_eq!(new_day[0].activity, "Harbor swim");
    assert_eq!(new_day[0].lat, 55.66);
    drop(trip);

    // The snapshot on disk reflects the merge.
    let restored = app.store.load_state().await.unwrap().unwrap();
    assert_eq!(restored.markdown, "# New guide");
    assert_eq!(restored.itinerary.events().len(), 1);
}

#[tokio::test]
async fn failed_generation_leaves_the_previous_state_intact() {
    let dir = tempfile::tempdir().unwrap();
    let model =
        ScriptedModel::replying(|| Err(PortError::Unexpected("upstream unavailable".to_string())));
    let app = app_with(model, &dir, Some("key"));

    let err = run_generation(&app, false).await.unwrap_err();
    assert!(matches!(err, PortError::Unexpected(_)));

    let trip = app.trip.read().await;
    assert_eq!(trip.markdown, "# Old guide");
    assert_eq!(trip.itinerary.events(), &[old_event()]);
}

#[tokio::test]
async fn malformed_model_output_is_a_retryable_condition() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::replying(|| {
        Ok(RawGeneration {
            text: "Sorry, I cannot help with that.".to_string(),
            citations: Vec::new(),
        })
    });
    let app = app_with(model, &dir, Some("key"));

    let err = run_generation(&app, false).await.unwrap_err();
    assert!(matches!(err, PortError::MalformedOutput(_)));

    let trip = app.trip.read().await;
    assert_eq!(trip.markdown, "# Old guide");
}

#[tokio::test]
async fn missing_credential_fails_before_the_model_is_called() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::replying(|| Ok(RawGeneration::default()));
    let app = app_with(model.clone(), &dir, None);

    let err = run_generation(&app, false).await.unwrap_err();
    assert!(matches!(err, PortError::CredentialMissing));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn empty_destinations_fail_validation_before_the_model_is_called() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::replying(|| Ok(RawGeneration::default()));
    let app = app_with(model.clone(), &dir, Some("key"));
    app.trip.write().await.details.destinations = vec![Destination {
        name: "   ".to_string(),
    }];

    let err = run_generation(&app, false).await.unwrap_err();
    assert!(matches!(err, PortError::InvalidInput(_)));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn rejected_credential_is_discarded_for_re_entry() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::replying(|| {
        Err(PortError::CredentialRejected("API key not valid".to_string()))
    });
    let app = app_with(model, &dir, Some("bad-key"));
    app.store.save_credential("bad-key").await.unwrap();

    let err = run_generation(&app, false).await.unwrap_err();
    assert!(matches!(err, PortError::CredentialRejected(_)));

    // Both the active and the stored credential are gone.
    assert!(app.active_credential().await.is_none());
    assert!(app.store.load_credential().await.unwrap().is_none());
    // The previous itinerary survives.
    assert_eq!(app.trip.read().await.markdown, "# Old guide");
}

#[tokio::test]
async fn the_busy_flag_rejects_re_entrant_generation() {
    let flag = AtomicBool::new(false);

    let guard = BusyGuard::acquire(&flag).expect("first acquisition succeeds");
    assert!(BusyGuard::acquire(&flag).is_none());

    drop(guard);
    assert!(BusyGuard::acquire(&flag).is_some());
}
