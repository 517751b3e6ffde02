//! Domain layer for the trip lifecycle.
//!
//! - `ordering` - delivery status catalog
//! - `state_machine` - pure transition rules
//! - `incident_gate` - open-incident check
//! - `locks` - per-trip serialization
//! - `errors` - error taxonomy

pub mod errors;
pub mod incident_gate;
pub mod locks;
pub mod ordering;
pub mod state_machine;

pub use errors::{CatalogError, StoreError, TripError};
pub use incident_gate::IncidentGate;
pub use locks::{TripLockGuard, TripLocks};
pub use ordering::DeliveryStatusOrdering;
pub use state_machine::{
    plan_resume, plan_suspend, plan_transition, TransitionCommit, TransitionPlan, TripSnapshot,
};
