//! Inbound (Driving) ports for the trip lifecycle.
//!
//! Two deliberately separate surfaces:
//!
//! - [`TripLifecycleApi`] - what dispatchers reach over HTTP. Strict
//!   single-step progression only.
//! - [`IncidentWorkflow`] - what the incident-resolution workflow calls. The
//!   only way to enter or leave a side-branch status.

use crate::domain::{TripError, TripSnapshot};
use async_trait::async_trait;
use shared_types::{ActorId, ReportId, StatusId, TripId, TripStatusHistory};

#[async_trait]
pub trait TripLifecycleApi: Send + Sync {
    /// Advance a trip by exactly one status.
    ///
    /// Checks, in order: trip exists, no incident in `Handling`, target is a
    /// known active status, target index is current index + 1.
    async fn request_transition(
        &self,
        trip_id: &TripId,
        target: &StatusId,
        actor: &ActorId,
    ) -> Result<TripSnapshot, TripError>;

    /// Current state of a trip.
    async fn trip(&self, trip_id: &TripId) -> Result<TripSnapshot, TripError>;

    /// Audit trail ordered by start time.
    async fn trip_history(&self, trip_id: &TripId) -> Result<Vec<TripStatusHistory>, TripError>;
}

#[async_trait]
pub trait IncidentWorkflow: Send + Sync {
    /// Park a trip on a side-branch status while `report_id` is handled.
    async fn suspend_for_incident(
        &self,
        trip_id: &TripId,
        side_status: &StatusId,
        report_id: &ReportId,
    ) -> Result<TripSnapshot, TripError>;

    /// Return a suspended trip to its prior status once `report_id` is no
    /// longer in `Handling`.
    async fn resume_after_incident(
        &self,
        trip_id: &TripId,
        report_id: &ReportId,
    ) -> Result<TripSnapshot, TripError>;
}
