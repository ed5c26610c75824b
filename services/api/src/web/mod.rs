pub mod generation;
pub mod protocol;
pub mod rest;
pub mod state;

pub use generation::run_generation;
pub use state::AppState;
