//! crates/globehopper_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::itinerary::ItineraryStore;

/// The user's trip parameters, created with defaults at application start
/// and mutated only by direct user edits.
#[derive(Debug, Clone, PartialEq)]
pub struct TripDetails {
    pub origin: String,
    /// Ordered list of 1-5 destination names. Entries may be empty strings
    /// while the user is still typing; the generation pipeline validates
    /// before building a prompt.
    pub destinations: Vec<Destination>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dest_currency: String,
    pub home_currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub name: String,
}

impl TripDetails {
    /// Destination names that are actually filled in, in user order.
    pub fn destination_names(&self) -> Vec<&str> {
        self.destinations
            .iter()
            .map(|d| d.name.trim())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

impl Default for TripDetails {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        Self {
            origin: "San Francisco".to_string(),
            destinations: vec![Destination {
                name: "Copenhagen".to_string(),
            }],
            start_date: today,
            end_date: today + Duration::days(6),
            dest_currency: "DKK".to_string(),
            home_currency: "USD".to_string(),
        }
    }
}

/// A single planned activity in the itinerary.
///
/// `date` stays an ISO `YYYY-MM-DD` string on purpose: the model is
/// instructed to keep events inside the trip range but nothing enforces it,
/// and an out-of-range (or garbage) date is kept rather than rejected. Such
/// an event simply never joins any day view. `time` is a zero-padded
/// 24-hour `HH:MM` string, so lexicographic order is chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryItem {
    pub date: String,
    pub time: String,
    pub activity: String,
    pub location: String,
    /// 0.0 when the model omitted the coordinate or it failed numeric
    /// parse. The event still appears in the timeline but cannot be placed
    /// on a map.
    pub lat: f64,
    pub lon: f64,
    pub map_link: Option<String>,
}

/// Where the traveler sleeps on a given date. User-managed, never produced
/// by the generation pipeline; it shares the ISO date key with the events.
#[derive(Debug, Clone, PartialEq)]
pub struct Accommodation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A grounding citation returned alongside a web-grounded generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// The normalized output of one generation call. Transient: superseded
/// entirely by the next successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub markdown: String,
    pub events: Vec<ItineraryItem>,
    pub sources: Vec<Source>,
}

/// Expense category for a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseCategory {
    Food,
    Transport,
    Stay,
    Activities,
    Misc,
}

/// One expense in the daily ledger, denominated in the destination currency.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub note: String,
    pub amount: f64,
    pub category: ExpenseCategory,
}

/// One line of the packing / shopping checklist.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub name: String,
    pub done: bool,
}

/// The whole application state, owned by one controller and snapshotted to
/// durable local storage after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripState {
    pub details: TripDetails,
    pub notes: String,
    pub itinerary: ItineraryStore,
    pub ledger: Vec<LedgerEntry>,
    pub shopping: Vec<ShoppingItem>,
    /// The long-form travel guide from the last successful generation.
    pub markdown: String,
    pub sources: Vec<Source>,
}

impl TripState {
    /// Seed state for a first launch, matching the defaults the original
    /// application ships with.
    pub fn seed() -> Self {
        Self {
            notes: "I love architecture, street food, and finding unique photo spots."
                .to_string(),
            ..Self::default()
        }
    }

    /// Merges one successful generation into the state: the guide text,
    /// the citation list, and the entire event collection are replaced
    /// wholesale. Accommodations, ledger, and shopping list are untouched.
    pub fn apply_generation(&mut self, result: GenerationResult) {
        self.markdown = result.markdown;
        self.sources = result.sources;
        self.itinerary.replace_all(result.events);
    }
}
