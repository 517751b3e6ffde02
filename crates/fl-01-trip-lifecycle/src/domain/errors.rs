//! Trip lifecycle error types.
//!
//! Every rejected command surfaces as a typed [`TripError`]; none are
//! swallowed.

use shared_types::{ReportId, StatusId, TripId};
use thiserror::Error;

/// Outcome of a rejected lifecycle command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TripError {
    /// No trip with this id.
    #[error("trip not found: {0}")]
    TripNotFound(TripId),

    /// Target status is unknown, inactive, or not a configured side branch.
    #[error("delivery status not found: {0}")]
    StatusNotFound(StatusId),

    /// Incident report referenced by the incident workflow does not exist
    /// for this trip.
    #[error("incident report {report_id} not found for trip {trip_id}")]
    ReportNotFound { trip_id: TripId, report_id: ReportId },

    /// An incident on the trip is being handled.
    #[error("trip {0} is blocked by an incident in handling")]
    Blocked(TripId),

    /// Target is not exactly one step ahead of the current status.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: StatusId, to: StatusId },

    /// Commit failed and was rolled back; the caller may retry.
    #[error("transient persistence failure: {0}")]
    TransientPersistence(String),
}

impl TripError {
    /// Unknown trip, status or report.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TripError::TripNotFound(_)
                | TripError::StatusNotFound(_)
                | TripError::ReportNotFound { .. }
        )
    }

    /// Only persistence failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TripError::TransientPersistence(_))
    }
}

/// Invalid delivery status catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate status id: {0}")]
    DuplicateStatusId(StatusId),

    #[error("duplicate status index: {0}")]
    DuplicateIndex(i32),

    #[error("catalog needs at least two active statuses, found {found}")]
    TooFewActive { found: usize },

    #[error("side-branch status {0} is also a catalog status")]
    SideBranchCollides(StatusId),

    #[error("catalog could not be loaded: {0}")]
    Unavailable(String),
}

/// Failure reported by a storage adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or the write was aborted.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The row changed underneath the commit.
    #[error("trip {trip_id} expected status {expected}, found {found}")]
    Conflict {
        trip_id: TripId,
        expected: StatusId,
        found: StatusId,
    },

    #[error("trip not found: {0}")]
    TripNotFound(TripId),
}

impl From<StoreError> for TripError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TripNotFound(id) => TripError::TripNotFound(id),
            other => TripError::TransientPersistence(other.to_string()),
        }
    }
}
