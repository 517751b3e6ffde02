//! In-memory trip store, incident ledger and status catalog.

use crate::domain::{StoreError, TransitionCommit};
use crate::ports::outbound::{CatalogSnapshot, IncidentSource, StatusCatalog, TripStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    DeliveryStatus, IncidentReport, IncidentStatus, ReportId, StatusId, Trip, TripId,
    TripStatusHistory,
};
use std::collections::HashMap;

#[derive(Default)]
struct StoreState {
    trips: HashMap<TripId, Trip>,
    history: HashMap<TripId, Vec<TripStatusHistory>>,
}

/// Trip rows and history behind one lock, so a commit is all-or-nothing.
#[derive(Default)]
pub struct InMemoryTripStore {
    state: RwLock<StoreState>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a trip row. Creation writes no history.
    pub fn insert_trip(&self, trip: Trip) {
        self.state.write().trips.insert(trip.trip_id.clone(), trip);
    }

    pub fn trip_count(&self) -> usize {
        self.state.read().trips.len()
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn load_trip(&self, trip_id: &TripId) -> Result<Option<Trip>, StoreError> {
        Ok(self.state.read().trips.get(trip_id).cloned())
    }

    async fn load_history(&self, trip_id: &TripId) -> Result<Vec<TripStatusHistory>, StoreError> {
        let mut rows = self
            .state
            .read()
            .history
            .get(trip_id)
            .cloned()
            .unwrap_or_default();
        rows.sort_by_key(|h| h.start_time);
        Ok(rows)
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<Trip, StoreError> {
        let mut state = self.state.write();
        let trip_id = commit.trip.trip_id.clone();

        let stored = state
            .trips
            .get(&trip_id)
            .ok_or_else(|| StoreError::TripNotFound(trip_id.clone()))?;
        if stored.current_status_id != commit.expected_status {
            return Err(StoreError::Conflict {
                trip_id,
                expected: commit.expected_status,
                found: stored.current_status_id.clone(),
            });
        }

        state.trips.insert(trip_id.clone(), commit.trip.clone());
        state.history.entry(trip_id).or_default().push(commit.history);
        Ok(commit.trip)
    }
}

/// Incident reports keyed by report id.
#[derive(Default)]
pub struct InMemoryIncidentLedger {
    reports: RwLock<HashMap<ReportId, IncidentReport>>,
}

impl InMemoryIncidentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a new report, or overwrite an existing one with the same id.
    pub fn file_report(&self, report: IncidentReport) {
        self.reports.write().insert(report.report_id.clone(), report);
    }

    /// Move a report to a new processing state. Returns false if unknown.
    pub fn set_status(&self, report_id: &ReportId, status: IncidentStatus) -> bool {
        match self.reports.write().get_mut(report_id) {
            Some(report) => {
                report.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl IncidentSource for InMemoryIncidentLedger {
    async fn reports_for_trip(&self, trip_id: &TripId) -> Result<Vec<IncidentReport>, StoreError> {
        Ok(self
            .reports
            .read()
            .values()
            .filter(|r| &r.trip_id == trip_id)
            .cloned()
            .collect())
    }
}

/// Catalog fixed at construction; swap it with [`StaticStatusCatalog::replace`].
#[derive(Default)]
pub struct StaticStatusCatalog {
    snapshot: RwLock<CatalogSnapshot>,
}

impl StaticStatusCatalog {
    pub fn new(statuses: Vec<DeliveryStatus>, side_branch: Vec<StatusId>) -> Self {
        Self {
            snapshot: RwLock::new(CatalogSnapshot {
                statuses,
                side_branch,
            }),
        }
    }

    pub fn replace(&self, snapshot: CatalogSnapshot) {
        *self.snapshot.write() = snapshot;
    }
}

#[async_trait]
impl StatusCatalog for StaticStatusCatalog {
    async fn load(&self) -> Result<CatalogSnapshot, StoreError> {
        Ok(self.snapshot.read().clone())
    }
}
