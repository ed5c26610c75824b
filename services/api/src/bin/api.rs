//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FrankfurterRateAdapter, GeminiPlanAdapter, JsonFileStore},
    config::Config,
    error::ApiError,
    web::{
        rest::{
            add_ledger_entry_handler, add_shopping_item_handler, clear_credential_handler,
            day_plan_handler, generate_handler, get_state_handler, list_days_handler,
            rate_handler, set_accommodation_handler, set_credential_handler,
            toggle_shopping_item_handler, update_notes_handler, update_trip_handler, ApiDoc,
        },
        state::AppState,
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use globehopper_core::domain::TripState;
use globehopper_core::ports::StateStore;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let store = Arc::new(JsonFileStore::new(config.state_path.clone()));
    let model = Arc::new(GeminiPlanAdapter::new(config.gemini_model.clone()));
    let rates = Arc::new(FrankfurterRateAdapter::new());

    // --- 3. Restore the Persisted Snapshot ---
    let trip = match store.load_state().await {
        Ok(Some(state)) => {
            info!(path = %config.state_path.display(), "trip snapshot restored");
            state
        }
        Ok(None) => {
            info!("no snapshot found; starting with the seed trip");
            TripState::seed()
        }
        Err(e) => {
            warn!(error = %e, "snapshot could not be read; starting with the seed trip");
            TripState::seed()
        }
    };

    // An interactively stored key takes precedence over the environment one.
    let credential = match store.load_credential().await {
        Ok(Some(key)) => Some(key),
        Ok(None) => config.gemini_api_key.clone(),
        Err(e) => {
            warn!(error = %e, "stored credential could not be read");
            config.gemini_api_key.clone()
        }
    };
    if credential.is_none() {
        info!("no API key configured yet; POST /credential to supply one");
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        model,
        store,
        rates,
        trip: RwLock::new(trip),
        credential: RwLock::new(credential),
        generating: AtomicBool::new(false),
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/state", get(get_state_handler))
        .route("/trip", put(update_trip_handler))
        .route("/notes", put(update_notes_handler))
        .route("/generate", post(generate_handler))
        .route("/itinerary/days", get(list_days_handler))
        .route("/itinerary/days/{date}", get(day_plan_handler))
        .route(
            "/itinerary/days/{date}/accommodation",
            put(set_accommodation_handler),
        )
        .route("/ledger", post(add_ledger_entry_handler))
        .route("/shopping", post(add_shopping_item_handler))
        .route("/shopping/{id}/toggle", post(toggle_shopping_item_handler))
        .route(
            "/credential",
            post(set_credential_handler).delete(clear_credential_handler),
        )
        .route("/rates/{from}/{to}", get(rate_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
