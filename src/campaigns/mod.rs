//! Campaign, variant, and targeting-rule records as supplied by the
//! campaign store.
mod models;
mod rules;

pub use models::*;
