pub mod domain;
pub mod itinerary;
pub mod normalize;
pub mod pipeline;
pub mod ports;
pub mod prompt;

pub use domain::{
    Accommodation, Destination, ExpenseCategory, GenerationResult, ItineraryItem, LedgerEntry,
    ShoppingItem, Source, TripDetails, TripState,
};
pub use itinerary::ItineraryStore;
pub use ports::{
    CurrencyRateService, GenerationMode, ItineraryModelService, PortError, PortResult,
    RawGeneration, StateStore,
};
