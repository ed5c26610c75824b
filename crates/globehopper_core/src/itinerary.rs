//! crates/globehopper_core/src/itinerary.rs
//!
//! The date-keyed itinerary store and the calendar helpers that drive the
//! day view.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::{Accommodation, ItineraryItem};

/// Date format shared by event records and accommodation keys.
const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Holds the normalized events of the last successful generation plus the
/// per-day accommodation records.
///
/// The event collection is only ever replaced wholesale (by a generation or
/// a restored snapshot), never merged field-by-field with prior contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItineraryStore {
    events: Vec<ItineraryItem>,
    accommodations: BTreeMap<String, Accommodation>,
}

impl ItineraryStore {
    /// Atomically replaces the entire event collection. Guarantees no stale
    /// events from a previous destination set linger after a new generation.
    pub fn replace_all(&mut self, events: Vec<ItineraryItem>) {
        self.events = events;
    }

    /// Restores both halves of the store from a persisted snapshot.
    pub fn restore(events: Vec<ItineraryItem>, accommodations: BTreeMap<String, Accommodation>) -> Self {
        Self {
            events,
            accommodations,
        }
    }

    pub fn events(&self) -> &[ItineraryItem] {
        &self.events
    }

    pub fn accommodations(&self) -> &BTreeMap<String, Accommodation> {
        &self.accommodations
    }

    /// Events scheduled on the given day, ordered by time string ascending.
    /// The sort is stable, so ties keep their original array order.
    pub fn events_for_day(&self, day: NaiveDate) -> Vec<ItineraryItem> {
        let key = day.format(DATE_KEY_FORMAT).to_string();
        let mut items: Vec<ItineraryItem> = self
            .events
            .iter()
            .filter(|item| item.date == key)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.time.cmp(&b.time));
        items
    }

    /// Exact-key lookup of the accommodation for a day.
    pub fn accommodation_for_day(&self, day: NaiveDate) -> Option<&Accommodation> {
        self.accommodations
            .get(&day.format(DATE_KEY_FORMAT).to_string())
    }

    pub fn set_accommodation(&mut self, day: NaiveDate, accommodation: Accommodation) {
        self.accommodations
            .insert(day.format(DATE_KEY_FORMAT).to_string(), accommodation);
    }

    pub fn remove_accommodation(&mut self, day: NaiveDate) -> Option<Accommodation> {
        self.accommodations
            .remove(&day.format(DATE_KEY_FORMAT).to_string())
    }
}

/// The inclusive sequence of calendar days between the trip's start and end
/// dates. Empty when end precedes start.
pub fn trip_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    days
}

/// Keeps a previously selected day if it still falls inside the trip range,
/// otherwise resets the selection to the first day.
pub fn effective_selection(days: &[NaiveDate], selected: Option<NaiveDate>) -> Option<NaiveDate> {
    match selected {
        Some(day) if days.contains(&day) => Some(day),
        _ => days.first().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(date: &str, time: &str, activity: &str) -> ItineraryItem {
        ItineraryItem {
            date: date.to_string(),
            time: time.to_string(),
            activity: activity.to_string(),
            location: String::new(),
            lat: 0.0,
            lon: 0.0,
            map_link: None,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn events_for_day_sorts_by_time_and_keeps_ties_stable() {
        let mut store = ItineraryStore::default();
        store.replace_all(vec![
            event("2024-06-01", "14:00", "late"),
            event("2024-06-01", "09:00", "first-nine"),
            event("2024-06-02", "08:00", "other-day"),
            event("2024-06-01", "09:00", "second-nine"),
        ]);

        let plan = store.events_for_day(day("2024-06-01"));
        let names: Vec<&str> = plan.iter().map(|e| e.activity.as_str()).collect();
        assert_eq!(names, vec!["first-nine", "second-nine", "late"]);
    }

    #[test]
    fn replace_all_is_idempotent() {
        let events = vec![
            event("2024-06-01", "10:00", "a"),
            event("2024-06-01", "11:00", "b"),
        ];

        let mut once = ItineraryStore::default();
        once.replace_all(events.clone());

        let mut twice = ItineraryStore::default();
        twice.replace_all(events.clone());
        twice.replace_all(events);

        assert_eq!(once, twice);
    }

    #[test]
    fn replacement_is_wholesale_not_a_merge() {
        let mut store = ItineraryStore::default();
        store.replace_all(vec![event("2024-06-01", "10:00", "old")]);
        store.replace_all(vec![event("2024-06-02", "10:00", "new")]);

        assert!(store.events_for_day(day("2024-06-01")).is_empty());
        assert_eq!(store.events_for_day(day("2024-06-02")).len(), 1);
    }

    #[test]
    fn out_of_range_dates_are_kept_but_never_join_a_day_view() {
        let mut store = ItineraryStore::default();
        store.replace_all(vec![event("not-a-date", "10:00", "garbage")]);

        assert_eq!(store.events().len(), 1);
        assert!(store.events_for_day(day("2024-06-01")).is_empty());
    }

    #[test]
    fn accommodation_lookup_is_by_exact_date_key() {
        let mut store = ItineraryStore::default();
        store.set_accommodation(
            day("2024-06-01"),
            Accommodation {
                name: "Hotel Sanders".to_string(),
                lat: 55.67,
                lon: 12.58,
            },
        );

        assert_eq!(
            store.accommodation_for_day(day("2024-06-01")).map(|a| a.name.as_str()),
            Some("Hotel Sanders")
        );
        assert!(store.accommodation_for_day(day("2024-06-02")).is_none());
    }

    #[test]
    fn trip_days_is_the_inclusive_day_sequence() {
        let days = trip_days(day("2024-06-01"), day("2024-06-03"));
        assert_eq!(
            days,
            vec![day("2024-06-01"), day("2024-06-02"), day("2024-06-03")]
        );
    }

    #[test]
    fn trip_days_handles_degenerate_ranges() {
        assert_eq!(trip_days(day("2024-06-01"), day("2024-06-01")).len(), 1);
        assert!(trip_days(day("2024-06-02"), day("2024-06-01")).is_empty());
    }

    #[test]
    fn selection_resets_to_first_day_when_out_of_range() {
        let days = trip_days(day("2024-06-01"), day("2024-06-03"));

        assert_eq!(
            effective_selection(&days, Some(day("2024-06-02"))),
            Some(day("2024-06-02"))
        );
        assert_eq!(
            effective_selection(&days, Some(day("2024-07-15"))),
            Some(day("2024-06-01"))
        );
        assert_eq!(effective_selection(&days, None), Some(day("2024-06-01")));
        assert_eq!(effective_selection(&[], Some(day("2024-06-01"))), None);
    }
}
