//! services/api/src/adapters/snapshot.rs
//!
//! This module contains the snapshot adapter, the concrete implementation
//! of the `StateStore` port from the `core` crate. The whole application
//! state is one JSON record on disk; the interactively-entered API key
//! lives in a sibling file so it survives independently of trip data.

use async_trait::async_trait;
use chrono::NaiveDate;
use globehopper_core::domain::{
    Accommodation, Destination, ExpenseCategory, ItineraryItem, LedgerEntry, ShoppingItem, Source,
    TripDetails, TripState,
};
use globehopper_core::itinerary::ItineraryStore;
use globehopper_core::ports::{PortError, PortResult, StateStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A snapshot adapter that implements the `StateStore` port on top of one
/// JSON file.
#[derive(Clone)]
pub struct JsonFileStore {
    state_path: PathBuf,
    credential_path: PathBuf,
}

impl JsonFileStore {
    /// Creates a new `JsonFileStore` rooted at the given snapshot path.
    pub fn new(state_path: PathBuf) -> Self {
        let credential_path = state_path.with_file_name("credential");
        Self {
            state_path,
            credential_path,
        }
    }
}

//=========================================================================================
// "Impure" Snapshot Record Structs
//=========================================================================================

/// The persisted record. Every field is optional or defaultable on load so
/// snapshots written by older versions still restore.
#[derive(Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct StateRecord {
    trip_details: Option<TripDetailsRecord>,
    user_notes: Option<String>,
    itinerary: Vec<ItineraryItemRecord>,
    accommodations: BTreeMap<String, AccommodationRecord>,
    ledger: Vec<LedgerEntryRecord>,
    shopping_list: Vec<ShoppingItemRecord>,
    ai_markdown: String,
    sources: Vec<SourceRecord>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripDetailsRecord {
    origin: String,
    destinations: Vec<DestinationRecord>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    dest_currency: String,
    home_currency: String,
}

#[derive(Serialize, Deserialize)]
struct DestinationRecord {
    name: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItineraryItemRecord {
    date: String,
    time: String,
    activity: String,
    location: String,
    lat: f64,
    lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    map_link: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AccommodationRecord {
    name: String,
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Deserialize)]
struct LedgerEntryRecord {
    id: Uuid,
    note: String,
    amount: f64,
    /// Stored as its display name; unknown values from older or edited
    /// snapshots fall back to Misc on load.
    category: String,
}

#[derive(Serialize, Deserialize)]
struct ShoppingItemRecord {
    id: Uuid,
    name: String,
    done: bool,
}

#[derive(Serialize, Deserialize)]
struct SourceRecord {
    title: String,
    uri: String,
}

//=========================================================================================
// Record <-> Domain Mapping
//=========================================================================================

impl StateRecord {
    fn from_domain(state: &TripState) -> Self {
        Self {
            trip_details: Some(TripDetailsRecord::from_domain(&state.details)),
            user_notes: Some(state.notes.clone()),
            itinerary: state
                .itinerary
                .events()
                .iter()
                .map(ItineraryItemRecord::from_domain)
                .collect(),
            accommodations: state
                .itinerary
                .accommodations()
                .iter()
                .map(|(key, acc)| {
                    (
                        key.clone(),
                        AccommodationRecord {
                            name: acc.name.clone(),
                            lat: acc.lat,
                            lon: acc.lon,
                        },
                    )
                })
                .collect(),
            ledger: state
                .ledger
                .iter()
                .map(|entry| LedgerEntryRecord {
                    id: entry.id,
                    note: entry.note.clone(),
                    amount: entry.amount,
                    category: category_name(entry.category).to_string(),
                })
                .collect(),
            shopping_list: state
                .shopping
                .iter()
                .map(|item| ShoppingItemRecord {
                    id: item.id,
                    name: item.name.clone(),
                    done: item.done,
                })
                .collect(),
            ai_markdown: state.markdown.clone(),
            sources: state
                .sources
                .iter()
                .map(|source| SourceRecord {
                    title: source.title.clone(),
                    uri: source.uri.clone(),
                })
                .collect(),
        }
    }

    /// Absent fields fall back to the seed state's values, mirroring how
    /// the original application restored older saves.
    fn to_domain(self) -> TripState {
        let mut state = TripState::seed();
        if let Some(details) = self.trip_details {
            state.details = details.to_domain();
        }
        if let Some(notes) = self.user_notes {
            state.notes = notes;
        }
        state.itinerary = ItineraryStore::restore(
            self.itinerary
                .into_iter()
                .map(ItineraryItemRecord::to_domain)
                .collect(),
            self.accommodations
                .into_iter()
                .map(|(key, record)| {
                    (
                        key,
                        Accommodation {
                            name: record.name,
                            lat: record.lat,
                            lon: record.lon,
                        },
                    )
                })
                .collect(),
        );
        state.ledger = self
            .ledger
            .into_iter()
            .map(|record| LedgerEntry {
                id: record.id,
                note: record.note,
                amount: record.amount,
                category: category_from_name(&record.category),
            })
            .collect();
        state.shopping = self
            .shopping_list
            .into_iter()
            .map(|record| ShoppingItem {
                id: record.id,
                name: record.name,
                done: record.done,
            })
            .collect();
        state.markdown = self.ai_markdown;
        state.sources = self
            .sources
            .into_iter()
            .map(|record| Source {
                title: record.title,
                uri: record.uri,
            })
            .collect();
        state
    }
}

impl TripDetailsRecord {
    fn from_domain(details: &TripDetails) -> Self {
        Self {
            origin: details.origin.clone(),
            destinations: details
                .destinations
                .iter()
                .map(|d| DestinationRecord {
                    name: d.name.clone(),
                })
                .collect(),
            start_date: details.start_date,
            end_date: details.end_date,
            dest_currency: details.dest_currency.clone(),
            home_currency: details.home_currency.clone(),
        }
    }

    fn to_domain(self) -> TripDetails {
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

impl ItineraryItemRecord {
    fn from_domain(item: &ItineraryItem) -> Self {
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

    fn to_domain(self) -> ItineraryItem {
        ItineraryItem {
            date: self.date,
            time: self.time,
            activity: self.activity,
            location: self.location,
            lat: self.lat,
            lon: self.lon,
            map_link: self.map_link,
        }
    }
}

fn category_name(category: ExpenseCategory) -> &'static str {
    match category {
        ExpenseCategory::Food => "Food",
        ExpenseCategory::Transport => "Transport",
        ExpenseCategory::Stay => "Stay",
        ExpenseCategory::Activities => "Activities",
        ExpenseCategory::Misc => "Misc",
    }
}

fn category_from_name(name: &str) -> ExpenseCategory {
    match name {
        "Food" => ExpenseCategory::Food,
        "Transport" => ExpenseCategory::Transport,
        "Stay" => ExpenseCategory::Stay,
        "Activities" => ExpenseCategory::Activities,
        _ => ExpenseCategory::Misc,
    }
}

//=========================================================================================
// `StateStore` Trait Implementation
//=========================================================================================

/// Writes via a temp file and rename so a crash mid-write cannot leave a
/// truncated snapshot behind.
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

#[async_trait]
impl StateStore for JsonFileStore {
    /// Restores the last snapshot. A missing file is a first launch; an
    /// unreadable one is logged and treated the same, so a corrupt snapshot
    /// never makes the application unusable.
    async fn load_state(&self) -> PortResult<Option<TripState>> {
        let bytes = match tokio::fs::read(&self.state_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };

        match serde_json::from_slice::<StateRecord>(&bytes) {
            Ok(record) => Ok(Some(record.to_domain())),
            Err(e) => {
                warn!(path = %self.state_path.display(), error = %e, "snapshot unreadable; starting fresh");
                Ok(None)
            }
        }
    }

    async fn save_state(&self, state: &TripState) -> PortResult<()> {
        let record = StateRecord::from_domain(state);
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        write_atomically(&self.state_path, &bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn load_credential(&self) -> PortResult<Option<String>> {
        match tokio::fs::read_to_string(&self.credential_path).await {
            Ok(key) => {
                let key = key.trim().to_string();
                Ok(if key.is_empty() { None } else { Some(key) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    async fn save_credential(&self, credential: &str) -> PortResult<()> {
        write_atomically(&self.credential_path, credential.as_bytes())
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn clear_credential(&self) -> PortResult<()> {
        match tokio::fs::remove_file(&self.credential_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globehopper_core::itinerary::trip_days;

    fn store_in(dir: &tempfile::TempDir) -> JsonFileStore {
        JsonFileStore::new(dir.path().join("state.json"))
    }

    fn populated_state() -> TripState {
        let mut state = TripState::seed();
        state.details.start_date = "2024-06-01".parse().unwrap();
        state.details.end_date = "2024-06-03".parse().unwrap();
        state.markdown = "# Guide".to_string();
        state.sources = vec![Source {
            title: "t".to_string(),
            uri: "https://example.com".to_string(),
        }];
        state.itinerary.replace_all(vec![
            ItineraryItem {
                date: "2024-06-02".to_string(),
                time: "14:00".to_string(),
                activity: "Louisiana Museum".to_string(),
                location: "Humlebæk".to_string(),
                lat: 55.96,
                lon: 12.54,
                map_link: None,
            },
            ItineraryItem {
                date: "2024-06-02".to_string(),
                time: "09:00".to_string(),
                activity: "Breakfast".to_string(),
                location: "Nørrebro".to_string(),
                lat: 0.0,
                lon: 0.0,
                map_link: Some("https://maps.example".to_string()),
            },
        ]);
        state.itinerary.set_accommodation(
            "2024-06-01".parse().unwrap(),
            Accommodation {
                name: "Hotel Sanders".to_string(),
                lat: 55.67,
                lon: 12.58,
            },
        );
        state.ledger.push(LedgerEntry {
            id: Uuid::new_v4(),
            note: "Smørrebrød".to_string(),
            amount: 145.0,
            category: ExpenseCategory::Food,
        });
        state.shopping.push(ShoppingItem {
            id: Uuid::new_v4(),
            name: "Rain jacket".to_string(),
            done: false,
        });
        state
    }

    #[tokio::test]
    async fn round_trip_preserves_every_day_view() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let state = populated_state();

        store.save_state(&state).await.unwrap();
        let restored = store.load_state().await.unwrap().unwrap();

        assert_eq!(restored, state);
        for day in trip_days(state.details.start_date, state.details.end_date) {
            assert_eq!(
                restored.itinerary.events_for_day(day),
                state.itinerary.events_for_day(day)
            );
        }
    }

    #[tokio::test]
    async fn missing_snapshot_is_a_first_launch() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn older_snapshots_with_absent_fields_still_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r##"{"userNotes":"museums only","aiMarkdown":"# Old Guide"}"##,
        )
        .unwrap();

        let restored = JsonFileStore::new(path).load_state().await.unwrap().unwrap();
        assert_eq!(restored.notes, "museums only");
        assert_eq!(restored.markdown, "# Old Guide");
        // Everything absent falls back to the seed values.
        assert_eq!(restored.details.origin, "San Francisco");
        assert!(restored.itinerary.events().is_empty());
        assert!(restored.ledger.is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_starts_fresh_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(JsonFileStore::new(path).load_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn credential_is_stored_and_cleared_separately() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.load_credential().await.unwrap().is_none());

        store.save_credential("AIzaSyExample").await.unwrap();
        assert_eq!(
            store.load_credential().await.unwrap().as_deref(),
            Some("AIzaSyExample")
        );

        store.clear_credential().await.unwrap();
        assert!(store.load_credential().await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear_credential().await.unwrap();
    }
}
