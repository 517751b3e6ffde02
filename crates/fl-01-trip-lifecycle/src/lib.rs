//! # Trip Lifecycle Subsystem
//!
//! Owns the ordered progression of a trip through the delivery status
//! catalog and the incident gate that can freeze it.
//!
//! ## Rules
//!
//! | Rule | Enforcement Location |
//! |------|---------------------|
//! | Advance by exactly one index | `domain/state_machine.rs` - `plan_transition()` |
//! | Only active statuses are targets | `domain/ordering.rs` - `active_index_of()` |
//! | `end_time` set once, on first arrival at completion | `domain/state_machine.rs` - `TransitionPlan` |
//! | Incident in `Handling` blocks progression | `domain/incident_gate.rs` |
//! | Trip row and history row commit together | `ports/outbound.rs` - `TripStore::commit_transition` |
//! | One in-flight command per trip | `domain/locks.rs` |
//!
//! ## State Machine
//!
//! ```text
//! [assigned] ──→ [picked_up] ──→ [delivering] ──→ [completed]
//!      │              │               │
//!      └──────────────┴───────────────┴──suspend──→ [delaying | canceled]
//!                                                          │
//!                       [prior status] ←──resume───────────┘
//! ```
//!
//! Side-branch moves are reachable only through [`ports::IncidentWorkflow`].
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - in-memory trip store, incident ledger, catalog     │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - TripLifecycleApi, IncidentWorkflow         │
//! │  ports/outbound.rs - TripStore, IncidentSource, StatusCatalog   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - ordering, state machine, incident gate, locks        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryIncidentLedger, InMemoryTripStore, StaticStatusCatalog};
pub use domain::{
    CatalogError, DeliveryStatusOrdering, StoreError, TransitionCommit, TripError, TripSnapshot,
};
pub use ports::{
    CatalogSnapshot, IncidentSource, IncidentWorkflow, StatusCatalog, SystemTimeSource,
    TimeSource, TripLifecycleApi, TripStore,
};
pub use service::{load_ordering, TripLifecycleService};
