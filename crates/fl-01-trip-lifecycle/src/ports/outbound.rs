//! Outbound (Driven) ports for the trip lifecycle.
//!
//! Trips, history and incidents belong to the surrounding back office; this
//! crate reaches them only through these traits.

use crate::domain::{StoreError, TransitionCommit};
use async_trait::async_trait;
use shared_types::{DeliveryStatus, IncidentReport, StatusId, Timestamp, Trip, TripId, TripStatusHistory};

/// Trip rows and their status history.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn load_trip(&self, trip_id: &TripId) -> Result<Option<Trip>, StoreError>;

    /// History for one trip, ordered by start time.
    async fn load_history(&self, trip_id: &TripId) -> Result<Vec<TripStatusHistory>, StoreError>;

    /// Update the trip row and append the history row as one atomic unit.
    ///
    /// Must fail with [`StoreError::Conflict`] and write nothing if the
    /// stored status no longer equals `commit.expected_status`.
    async fn commit_transition(&self, commit: TransitionCommit) -> Result<Trip, StoreError>;
}

/// Read-only view of incident reports.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    async fn reports_for_trip(&self, trip_id: &TripId) -> Result<Vec<IncidentReport>, StoreError>;
}

/// Delivery status catalog as loaded from configuration or the database.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub statuses: Vec<DeliveryStatus>,
    pub side_branch: Vec<StatusId>,
}

#[async_trait]
pub trait StatusCatalog: Send + Sync {
    async fn load(&self) -> Result<CatalogSnapshot, StoreError>;
}

/// Time source for history timestamps and completion.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: parking_lot::Mutex<Timestamp>,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: parking_lot::Mutex::new(initial),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut time = self.time.lock();
        *time += chrono::Duration::seconds(secs);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        *self.time.lock()
    }
}
