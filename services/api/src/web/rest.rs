//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::port_error_response;
use crate::web::generation::{run_generation, BusyGuard};
use crate::web::protocol::{
    AccommodationDto, AddLedgerEntryRequest, AddShoppingItemRequest, CredentialRequest,
    DayListResponse, DayPlanResponse, DestinationDto, ExpenseCategoryDto, GenerateRequest,
    GenerateResponse, ItineraryItemDto, LedgerEntryDto, RateResponse, ShoppingItemDto, SourceDto,
    TripDetailsDto, TripStateResponse, UpdateNotesRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use globehopper_core::domain::{LedgerEntry, ShoppingItem};
use globehopper_core::itinerary::{effective_selection, trip_days};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_state_handler,
        update_trip_handler,
        update_notes_handler,
        generate_handler,
        list_days_handler,
        day_plan_handler,
        set_accommodation_handler,
        add_ledger_entry_handler,
        add_shopping_item_handler,
        toggle_shopping_item_handler,
        set_credential_handler,
        clear_credential_handler,
        rate_handler,
    ),
    components(
        schemas(
            TripStateResponse,
            TripDetailsDto,
            DestinationDto,
            ItineraryItemDto,
            AccommodationDto,
            LedgerEntryDto,
            ExpenseCategoryDto,
            ShoppingItemDto,
            SourceDto,
            DayListResponse,
            DayPlanResponse,
            GenerateRequest,
            GenerateResponse,
            UpdateNotesRequest,
            AddLedgerEntryRequest,
            AddShoppingItemRequest,
            CredentialRequest,
            RateResponse,
        )
    ),
    tags(
        (name = "GlobeHopper API", description = "API endpoints for the trip-planning engine.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Query and Path Payloads
//=========================================================================================

#[derive(Deserialize)]
pub struct DaysQuery {
    /// A previously selected day, validated against the current range.
    pub selected: Option<NaiveDate>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, (StatusCode, String)> {
    raw.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not an ISO calendar date", raw),
        )
    })
}

//=========================================================================================
// State and Trip Configuration Handlers
//=========================================================================================

/// Fetch the full application state.
#[utoipa::path(
    get,
    path = "/state",
    responses((status = 200, description = "The whole trip state", body = TripStateResponse))
)]
pub async fn get_state_handler(State(app): State<Arc<AppState>>) -> Json<TripStateResponse> {
    let credential_set = app.active_credential().await.is_some();
    let trip = app.trip.read().await;
    Json(TripStateResponse::from_domain(&trip, credential_set))
}

/// Replace the trip configuration.
#[utoipa::path(
    put,
    path = "/trip",
    request_body = TripDetailsDto,
    responses(
        (status = 200, description = "Updated state", body = TripStateResponse),
        (status = 422, description = "Destination list empty or longer than five entries")
    )
)]
pub async fn update_trip_handler(
    State(app): State<Arc<AppState>>,
    Json(payload): Json<TripDetailsDto>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.destinations.is_empty() || payload.destinations.len() > 5 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "a trip has between one and five destinations".to_string(),
        ));
    }

    let credential_set = app.active_credential().await.is_some();
    let state = app
        .mutate(|trip| trip.details = payload.into_domain())
        .await;
    Ok(Json(TripStateResponse::from_domain(&state, credential_set)))
}

/// Replace the free-text preference notes.
#[utoipa::path(
    put,
    path = "/notes",
    request_body = UpdateNotesRequest,
    responses((status = 200, description = "Updated state", body = TripStateResponse))
)]
pub async fn update_notes_handler(
    State(app): State<Arc<AppState>>,
    Json(payload): Json<UpdateNotesRequest>,
) -> Json<TripStateResponse> {
    let credential_set = app.active_credential().await.is_some();
    let state = app.mutate(|trip| trip.notes = payload.notes).await;
    Json(TripStateResponse::from_domain(&state, credential_set))
}

//=========================================================================================
// Generation Handler
//=========================================================================================

/// Generate a fresh itinerary from the current trip configuration.
///
/// One generation at a time: a request arriving while another is in flight
/// is answered with 409 instead of being interleaved.
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "The normalized generation result", body = GenerateResponse),
        (status = 401, description = "API credential missing or rejected"),
        (status = 409, description = "A generation is already in progress"),
        (status = 422, description = "Trip configuration incomplete"),
        (status = 429, description = "Rate limited by the model service"),
        (status = 502, description = "Model output could not be parsed")
    )
)]
pub async fn generate_handler(
    State(app): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let Some(_busy) = BusyGuard::acquire(&app.generating) else {
        return Err((
            StatusCode::CONFLICT,
            "A plan is already being generated. Please wait for it to finish.".to_string(),
        ));
    };

    let use_grounding = payload.grounded.unwrap_or(app.config.grounded_planning);
    info!(grounded = use_grounding, "generation requested");

    match run_generation(&app, use_grounding).await {
        Ok(result) => Ok(Json(GenerateResponse {
            ai_markdown: result.markdown.clone(),
            events: result.events.iter().map(ItineraryItemDto::from_domain).collect(),
            sources: result.sources.iter().map(SourceDto::from_domain).collect(),
        })),
        Err(e) => {
            error!(error = %e, "generation failed");
            Err(port_error_response(&e))
        }
    }
}

//=========================================================================================
// Itinerary Day-View Handlers
//=========================================================================================

/// List the trip's calendar days and resolve the day selection.
#[utoipa::path(
    get,
    path = "/itinerary/days",
    params(("selected" = Option<NaiveDate>, Query, description = "Previously selected day")),
    responses((status = 200, description = "Inclusive day sequence", body = DayListResponse))
)]
pub async fn list_days_handler(
    State(app): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Json<DayListResponse> {
    let trip = app.trip.read().await;
    let days = trip_days(trip.details.start_date, trip.details.end_date);
    let selected = effective_selection(&days, query.selected);
    Json(DayListResponse { days, selected })
}

/// The plan for one day: its events in chronological order plus the
/// accommodation record, joined on the same date key.
#[utoipa::path(
    get,
    path = "/itinerary/days/{date}",
    params(("date" = String, Path, description = "ISO calendar date")),
    responses(
        (status = 200, description = "Events and accommodation for the day", body = DayPlanResponse),
        (status = 400, description = "Malformed date")
    )
)]
pub async fn day_plan_handler(
    State(app): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let day = parse_date(&date)?;
    let trip = app.trip.read().await;
    Ok(Json(DayPlanResponse {
        date: day,
        events: trip
            .itinerary
            .events_for_day(day)
            .iter()
            .map(ItineraryItemDto::from_domain)
            .collect(),
        accommodation: trip
            .itinerary
            .accommodation_for_day(day)
            .map(AccommodationDto::from_domain),
    }))
}

/// Set the accommodation for one day.
#[utoipa::path(
    put,
    path = "/itinerary/days/{date}/accommodation",
    params(("date" = String, Path, description = "ISO calendar date")),
    request_body = AccommodationDto,
    responses(
        (status = 200, description = "Updated state", body = TripStateResponse),
        (status = 400, description = "Malformed date")
    )
)]
pub async fn set_accommodation_handler(
    State(app): State<Arc<AppState>>,
    Path(date): Path<String>,
    Json(payload): Json<AccommodationDto>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let day = parse_date(&date)?;
    let credential_set = app.active_credential().await.is_some();
    let state = app
        .mutate(|trip| trip.itinerary.set_accommodation(day, payload.into_domain()))
        .await;
    Ok(Json(TripStateResponse::from_domain(&state, credential_set)))
}

//=========================================================================================
// Ledger and Shopping Handlers
//=========================================================================================

/// Add an expense to the ledger. Newest entries come first.
#[utoipa::path(
    post,
    path = "/ledger",
    request_body = AddLedgerEntryRequest,
    responses(
        (status = 201, description = "Updated state", body = TripStateResponse),
        (status = 422, description = "Empty note or non-positive amount")
    )
)]
pub async fn add_ledger_entry_handler(
    State(app): State<Arc<AppState>>,
    Json(payload): Json<AddLedgerEntryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.note.trim().is_empty() || !payload.amount.is_finite() || payload.amount <= 0.0 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "an expense needs a note and a positive amount".to_string(),
        ));
    }

    let entry = LedgerEntry {
        id: Uuid::new_v4(),
        note: payload.note,
        amount: payload.amount,
        category: payload
            .category
            .unwrap_or(ExpenseCategoryDto::Misc)
            .into_domain(),
    };

    let credential_set = app.active_credential().await.is_some();
    let state = app.mutate(|trip| trip.ledger.insert(0, entry)).await;
    Ok((
        StatusCode::CREATED,
        Json(TripStateResponse::from_domain(&state, credential_set)),
    ))
}

/// Add an item to the shopping / packing checklist.
#[utoipa::path(
    post,
    path = "/shopping",
    request_body = AddShoppingItemRequest,
    responses(
        (status = 201, description = "Updated state", body = TripStateResponse),
        (status = 422, description = "Empty item name")
    )
)]
pub async fn add_shopping_item_handler(
    State(app): State<Arc<AppState>>,
    Json(payload): Json<AddShoppingItemRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "a checklist item needs a name".to_string(),
        ));
    }

    let item = ShoppingItem {
        id: Uuid::new_v4(),
        name: payload.name,
        done: false,
    };

    let credential_set = app.active_credential().await.is_some();
    let state = app.mutate(|trip| trip.shopping.push(item)).await;
    Ok((
        StatusCode::CREATED,
        Json(TripStateResponse::from_domain(&state, credential_set)),
    ))
}

/// Toggle a checklist item's done flag.
#[utoipa::path(
    post,
    path = "/shopping/{id}/toggle",
    params(("id" = Uuid, Path, description = "Checklist item id")),
    responses(
        (status = 200, description = "Updated state", body = TripStateResponse),
        (status = 404, description = "No such checklist item")
    )
)]
pub async fn toggle_shopping_item_handler(
    State(app): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut found = false;
    let credential_set = app.active_credential().await.is_some();
    let state = app
        .mutate(|trip| {
            if let Some(item) = trip.shopping.iter_mut().find(|item| item.id == id) {
                item.done = !item.done;
                found = true;
            }
        })
        .await;

    if !found {
        return Err((
            StatusCode::NOT_FOUND,
            format!("no checklist item with id {}", id),
        ));
    }
    Ok(Json(TripStateResponse::from_domain(&state, credential_set)))
}

//=========================================================================================
// Credential Handlers
//=========================================================================================

/// Store an interactively supplied API key. It takes precedence over the
/// environment-provisioned one.
#[utoipa::path(
    post,
    path = "/credential",
    request_body = CredentialRequest,
    responses(
        (status = 204, description = "Key stored"),
        (status = 422, description = "Empty key")
    )
)]
pub async fn set_credential_handler(
    State(app): State<Arc<AppState>>,
    Json(payload): Json<CredentialRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let key = payload.api_key.trim().to_string();
    if key.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "the API key must not be empty".to_string(),
        ));
    }

    if let Err(e) = app.store.save_credential(&key).await {
        error!(error = %e, "failed to persist the credential");
        return Err(port_error_response(&e));
    }
    *app.credential.write().await = Some(key);
    Ok(StatusCode::NO_CONTENT)
}

/// Forget the stored API key and fall back to the environment one, if any.
#[utoipa::path(
    delete,
    path = "/credential",
    responses((status = 204, description = "Key cleared"))
)]
pub async fn clear_credential_handler(
    State(app): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Err(e) = app.store.clear_credential().await {
        error!(error = %e, "failed to clear the stored credential");
        return Err(port_error_response(&e));
    }
    *app.credential.write().await = app.config.gemini_api_key.clone();
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Currency-Rate Handler
//=========================================================================================

/// Conversion rate between two ISO currency codes. Equal codes are an
/// identity rate.
#[utoipa::path(
    get,
    path = "/rates/{from}/{to}",
    params(
        ("from" = String, Path, description = "Source ISO currency code"),
        ("to" = String, Path, description = "Target ISO currency code")
    ),
    responses(
        (status = 200, description = "Conversion rate", body = RateResponse),
        (status = 404, description = "Unknown currency code")
    )
)]
pub async fn rate_handler(
    State(app): State<Arc<AppState>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    match app.rates.rate(&from, &to).await {
        Ok(rate) => Ok(Json(RateResponse { from, to, rate })),
        Err(e) => Err(port_error_response(&e)),
    }
}
