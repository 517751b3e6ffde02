//! Adapters for the trip lifecycle.
//!
//! In-memory implementations of the outbound ports. The node uses them when
//! no external back office is wired in; tests use them everywhere.

pub mod memory;

pub use memory::{InMemoryIncidentLedger, InMemoryTripStore, StaticStatusCatalog};
