//! Ports for the trip lifecycle (hexagonal boundary).

pub mod inbound;
pub mod outbound;

pub use inbound::{IncidentWorkflow, TripLifecycleApi};
pub use outbound::{
    CatalogSnapshot, IncidentSource, StatusCatalog, SystemTimeSource, TimeSource, TripStore,
};
