//! services/api/src/web/protocol.rs
//!
//! Request and response payloads for the REST API, with their mappings to
//! and from the core domain types. The JSON field naming matches the
//! original application's persisted record (camelCase).

use chrono::NaiveDate;
use globehopper_core::domain::{
    Accommodation, Destination, ExpenseCategory, ItineraryItem, LedgerEntry, ShoppingItem, Source,
    TripDetails, TripState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Shared Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripDetailsDto {
    pub origin: String,
    /// Ordered list of 1-5 destinations.
    pub destinations: Vec<DestinationDto>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dest_currency: String,
    pub home_currency: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DestinationDto {
    pub name: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItemDto {
    /// ISO date. Kept verbatim from the model, even outside the trip range.
    pub date: String,
    /// Zero-padded 24-hour HH:MM.
    pub time: String,
    pub activity: String,
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AccommodationDto {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SourceDto {
    pub title: String,
    pub uri: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, ToSchema)]
pub enum ExpenseCategoryDto {
    Food,
    Transport,
    Stay,
    Activities,
    Misc,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryDto {
    pub id: Uuid,
    pub note: String,
    pub amount: f64,
    pub category: ExpenseCategoryDto,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ShoppingItemDto {
    pub id: Uuid,
    pub name: String,
    pub done: bool,
}

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Permit live web search; defaults to the server's configuration.
    pub grounded: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateNotesRequest {
    pub notes: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AddLedgerEntryRequest {
    pub note: String,
    pub amount: f64,
    /// Defaults to Misc, like the original quick-add form.
    pub category: Option<ExpenseCategoryDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct AddShoppingItemRequest {
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub api_key: String,
}

//=========================================================================================
// Response Payloads
//=========================================================================================

/// The full application state, as served to the (out-of-scope) view layer.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripStateResponse {
    pub trip_details: TripDetailsDto,
    pub user_notes: String,
    pub itinerary: Vec<ItineraryItemDto>,
    pub accommodations: BTreeMap<String, AccommodationDto>,
    pub ledger: Vec<LedgerEntryDto>,
    pub shopping_list: Vec<ShoppingItemDto>,
    pub ai_markdown: String,
    pub sources: Vec<SourceDto>,
    /// Whether a usable API key is currently active (never the key itself).
    pub credential_set: bool,
}

#[derive(Serialize, ToSchema)]
pub struct DayListResponse {
    pub days: Vec<NaiveDate>,
    /// The effective selection: the requested day if still in range,
    /// otherwise the first day of the trip.
    pub selected: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct DayPlanResponse {
    pub date: NaiveDate,
    pub events: Vec<ItineraryItemDto>,
    pub accommodation: Option<AccommodationDto>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub ai_markdown: String,
    pub events: Vec<ItineraryItemDto>,
    pub sources: Vec<SourceDto>,
}

#[derive(Serialize, ToSchema)]
pub struct RateResponse {
    pub from: String,
    pub to: String,
    pub rate: f64,
}

//=========================================================================================
// Domain Mapping
//=========================================================================================

impl TripDetailsDto {
    pub fn from_domain(details: &TripDetails) -> Self {
        Self {
            origin: details.origin.clone(),
            destinations: details
                .destinations
                .iter()
                .map(|d| DestinationDto {
                    name: d.name.clone(),
                })
                .collect(),
            start_date: details.start_date,
            end_date: details.end_date,
            dest_currency: details.dest_currency.clone(),
            home_currency: details.home_currency.clone(),
        }
    }

    pub fn into_domain(self) -> TripDetails {
        TripDetails {
            origin: self.origin,
            destinations: self
                .destinations
                .into_iter()
                .map(|d| Destination { name: d.name })
                .collect(),
            start_date: self.start_date,
            end_date: self.end_date,
            dest_currency: self.dest_currency,
            home_currency: self.home_currency,
        }
    }
}

impl ItineraryItemDto {
    pub fn from_domain(item: &ItineraryItem) -> Self {
        Self {
            date: item.date.clone(),
            time: item.time.clone(),
            activity: item.activity.clone(),
            location: item.location.clone(),
            lat: item.lat,
            lon: item.lon,
            map_link: item.map_link.clone(),
        }
    }
}

impl AccommodationDto {
    pub fn from_domain(accommodation: &Accommodation) -> Self {
        Self {
            name: accommodation.name.clone(),
            lat: accommodation.lat,
            lon: accommodation.lon,
        }
    }

    pub fn into_domain(self) -> Accommodation {
        Accommodation {
            name: self.name,
            lat: self.lat,
            lon: self.lon,
        }
    }
}

impl SourceDto {
    pub fn from_domain(source: &Source) -> Self {
        Self {
            title: source.title.clone(),
            uri: source.uri.clone(),
        }
    }
}

impl ExpenseCategoryDto {
    pub fn into_domain(self) -> ExpenseCategory {
        match self {
            Self::Food => ExpenseCategory::Food,
            Self::Transport => ExpenseCategory::Transport,
            Self::Stay => ExpenseCategory::Stay,
            Self::Activities => ExpenseCategory::Activities,
            Self::Misc => ExpenseCategory::Misc,
        }
    }

    pub fn from_domain(category: ExpenseCategory) -> Self {
        match category {
            ExpenseCategory::Food => Self::Food,
            ExpenseCategory::Transport => Self::Transport,
            ExpenseCategory::Stay => Self::Stay,
            ExpenseCategory::Activities => Self::Activities,
            ExpenseCategory::Misc => Self::Misc,
        }
    }
}

impl LedgerEntryDto {
    pub fn from_domain(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id,
            note: entry.note.clone(),
            amount: entry.amount,
            category: ExpenseCategoryDto::from_domain(entry.category),
        }
    }
}

impl ShoppingItemDto {
    pub fn from_domain(item: &ShoppingItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            done: item.done,
        }
    }
}

impl TripStateResponse {
    pub fn from_domain(state: &TripState, credential_set: bool) -> Self {
        Self {
            trip_details: TripDetailsDto::from_domain(&state.details),
            user_notes: state.notes.clone(),
            itinerary: state
                .itinerary
                .events()
                .iter()
                .map(ItineraryItemDto::from_domain)
                .collect(),
            accommodations: state
                .itinerary
                .accommodations()
                .iter()
                .map(|(key, acc)| (key.clone(), AccommodationDto::from_domain(acc)))
                .collect(),
            ledger: state.ledger.iter().map(LedgerEntryDto::from_domain).collect(),
            shopping_list: state
                .shopping
                .iter()
                .map(ShoppingItemDto::from_domain)
                .collect(),
            ai_markdown: state.markdown.clone(),
            sources: state.sources.iter().map(SourceDto::from_domain).collect(),
            credential_set,
        }
    }
}
