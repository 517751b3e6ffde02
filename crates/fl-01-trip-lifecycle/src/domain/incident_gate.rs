//! # Incident Gate
//!
//! Answers whether a trip has an incident in `Handling`. The check is
//! point-in-time and takes no lock on the incident source; the service runs
//! it inside the per-trip critical section, immediately before the commit,
//! so an incident filed afterwards is ordered after the transition.

use super::errors::TripError;
use crate::ports::outbound::IncidentSource;
use shared_types::{IncidentReport, TripId};
use std::sync::Arc;

#[derive(Clone)]
pub struct IncidentGate {
    source: Arc<dyn IncidentSource>,
}

impl IncidentGate {
    pub fn new(source: Arc<dyn IncidentSource>) -> Self {
        Self { source }
    }

    /// True iff any report referencing the trip is in `Handling`.
    pub async fn has_blocking_incident(&self, trip_id: &TripId) -> Result<bool, TripError> {
        Ok(self
            .source
            .reports_for_trip(trip_id)
            .await?
            .iter()
            .any(|r| r.status.blocks_progression()))
    }

    /// All reports referencing the trip.
    pub async fn reports(&self, trip_id: &TripId) -> Result<Vec<IncidentReport>, TripError> {
        Ok(self.source.reports_for_trip(trip_id).await?)
    }
}
