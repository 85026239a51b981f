// === PUBLIC CONTRACT ===
pub mod contract;

pub use contract::model;

// === INTERNAL MODULES ===
// Exposed for the server binary's wiring and for integration tests.
pub mod api;
pub mod domain;
pub mod infra;
