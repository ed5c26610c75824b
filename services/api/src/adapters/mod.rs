pub mod gemini;
pub mod rates;
pub mod snapshot;

pub use gemini::GeminiPlanAdapter;
pub use rates::FrankfurterRateAdapter;
pub use snapshot::JsonFileStore;
