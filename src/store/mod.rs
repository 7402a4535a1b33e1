//! Persistent per-destination configuration and delivery state.
//!
//! - `ledger`: bounded record of delivered feed ids
//! - `destinations`: the JSON-backed configuration store

pub mod destinations;
pub mod ledger;

pub use destinations::{ConfigStore, DestinationConfig};
pub use ledger::DEFAULT_LEDGER_CAPACITY;
