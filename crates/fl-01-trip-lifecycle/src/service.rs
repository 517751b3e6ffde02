//! Trip Lifecycle Service - wires the domain rules to storage, the incident
//! gate and the event bus.
//!
//! Every command for a trip runs inside that trip's critical section:
//!
//! ```text
//! lock(trip) → load → incident gate → plan → commit → unlock → publish
//! ```
//!
//! Two concurrent requests for the same trip therefore see each other's
//! result; at most one advance from a given status is ever accepted.

use crate::domain::{
    plan_resume, plan_suspend, plan_transition, CatalogError, DeliveryStatusOrdering,
    IncidentGate, TransitionCommit, TripError, TripLocks, TripSnapshot,
};
use crate::ports::inbound::{IncidentWorkflow, TripLifecycleApi};
use crate::ports::outbound::{
    IncidentSource, StatusCatalog, SystemTimeSource, TimeSource, TripStore,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{DispatchEvent, EventPublisher};
use shared_types::{ActorId, ReportId, StatusId, Trip, TripId, TripStatusHistory};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Build an ordering from whatever the catalog currently holds.
pub async fn load_ordering(
    catalog: &dyn StatusCatalog,
) -> Result<DeliveryStatusOrdering, CatalogError> {
    let snapshot = catalog
        .load()
        .await
        .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
    DeliveryStatusOrdering::new(snapshot.statuses)?.with_side_branch(snapshot.side_branch)
}

pub struct TripLifecycleService {
    store: Arc<dyn TripStore>,
    gate: IncidentGate,
    ordering: RwLock<Arc<DeliveryStatusOrdering>>,
    locks: TripLocks,
    clock: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
}

impl TripLifecycleService {
    pub fn new(
        ordering: DeliveryStatusOrdering,
        store: Arc<dyn TripStore>,
        incidents: Arc<dyn IncidentSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            gate: IncidentGate::new(incidents),
            ordering: RwLock::new(Arc::new(ordering)),
            locks: TripLocks::new(),
            clock: Arc::new(SystemTimeSource),
            events,
        }
    }

    /// Replace the clock (tests use a fixed one).
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Current catalog. Cheap; callers get a consistent snapshot.
    pub fn ordering(&self) -> Arc<DeliveryStatusOrdering> {
        self.ordering.read().clone()
    }

    /// Swap in a freshly loaded catalog. In-flight commands keep the
    /// snapshot they started with.
    pub async fn reload_catalog(&self, catalog: &dyn StatusCatalog) -> Result<(), CatalogError> {
        let ordering = load_ordering(catalog).await?;
        info!(
            statuses = ordering.statuses().len(),
            completion_index = ordering.completion_index(),
            "Delivery status catalog reloaded"
        );
        *self.ordering.write() = Arc::new(ordering);
        Ok(())
    }

    async fn load_existing(&self, trip_id: &TripId) -> Result<Trip, TripError> {
        self.store
            .load_trip(trip_id)
            .await?
            .ok_or_else(|| TripError::TripNotFound(trip_id.clone()))
    }

    async fn commit(&self, commit: TransitionCommit) -> Result<Trip, TripError> {
        let trip_id = commit.trip.trip_id.clone();
        self.store.commit_transition(commit).await.map_err(|e| {
            error!(trip_id = %trip_id, error = %e, "Trip transition commit failed");
            TripError::from(e)
        })
    }
}

#[async_trait]
impl TripLifecycleApi for TripLifecycleService {
    async fn request_transition(
        &self,
        trip_id: &TripId,
        target: &StatusId,
        actor: &ActorId,
    ) -> Result<TripSnapshot, TripError> {
        let ordering = self.ordering();
        let (plan, trip) = {
            let _guard = self.locks.acquire(trip_id).await;
            let trip = self.load_existing(trip_id).await?;

            if self.gate.has_blocking_incident(trip_id).await? {
                warn!(trip_id = %trip_id, target = %target, actor = %actor, "Transition blocked by incident in handling");
                return Err(TripError::Blocked(trip_id.clone()));
            }

            let plan = plan_transition(&ordering, &trip, target).map_err(|e| {
                debug!(trip_id = %trip_id, current = %trip.current_status_id, target = %target, error = %e, "Transition rejected");
                e
            })?;

            let commit = plan.clone().into_commit(&trip, self.clock.now());
            let trip = self.commit(commit).await?;
            (plan, trip)
        };

        info!(
            trip_id = %trip_id,
            from = %plan.from,
            to = %plan.to,
            status_index = plan.to_index,
            actor = %actor,
            "Trip status advanced"
        );

        let at = self.clock.now();
        self.events
            .publish(DispatchEvent::TripStatusAdvanced {
                trip_id: trip_id.clone(),
                from: plan.from.clone(),
                to: plan.to.clone(),
                actor_id: actor.clone(),
                at,
            })
            .await;

        if plan.completes_trip {
            let completed_at = trip.end_time.unwrap_or(at);
            info!(trip_id = %trip_id, status = %plan.to, "Trip completed");
            self.events
                .publish(DispatchEvent::TripCompleted {
                    trip_id: trip_id.clone(),
                    status_id: plan.to,
                    completed_at,
                })
                .await;
        }

        Ok(TripSnapshot::of(trip, &ordering))
    }

    async fn trip(&self, trip_id: &TripId) -> Result<TripSnapshot, TripError> {
        let trip = self.load_existing(trip_id).await?;
        Ok(TripSnapshot::of(trip, &self.ordering()))
    }

    async fn trip_history(&self, trip_id: &TripId) -> Result<Vec<TripStatusHistory>, TripError> {
        self.load_existing(trip_id).await?;
        Ok(self.store.load_history(trip_id).await?)
    }
}

#[async_trait]
impl IncidentWorkflow for TripLifecycleService {
    async fn suspend_for_incident(
        &self,
        trip_id: &TripId,
        side_status: &StatusId,
        report_id: &ReportId,
    ) -> Result<TripSnapshot, TripError> {
        let ordering = self.ordering();
        let trip = {
            let _guard = self.locks.acquire(trip_id).await;
            let trip = self.load_existing(trip_id).await?;

            let reports = self.gate.reports(trip_id).await?;
            let report = reports
                .iter()
                .find(|r| &r.report_id == report_id)
                .ok_or_else(|| TripError::ReportNotFound {
                    trip_id: trip_id.clone(),
                    report_id: report_id.clone(),
                })?;
            if !report.status.blocks_progression() {
                return Err(TripError::InvalidTransition {
                    from: trip.current_status_id.clone(),
                    to: side_status.clone(),
                });
            }

            let commit = plan_suspend(&ordering, &trip, side_status, self.clock.now())?;
            self.commit(commit).await?
        };

        info!(trip_id = %trip_id, report_id = %report_id, status = %side_status, "Trip suspended for incident");
        self.events
            .publish(DispatchEvent::TripSuspended {
                trip_id: trip_id.clone(),
                report_id: report_id.clone(),
                side_status_id: side_status.clone(),
                at: self.clock.now(),
            })
            .await;

        Ok(TripSnapshot::of(trip, &ordering))
    }

    async fn resume_after_incident(
        &self,
        trip_id: &TripId,
        report_id: &ReportId,
    ) -> Result<TripSnapshot, TripError> {
        let ordering = self.ordering();
        let trip = {
            let _guard = self.locks.acquire(trip_id).await;
            let trip = self.load_existing(trip_id).await?;

            let reports = self.gate.reports(trip_id).await?;
            if !reports.iter().any(|r| &r.report_id == report_id) {
                return Err(TripError::ReportNotFound {
                    trip_id: trip_id.clone(),
                    report_id: report_id.clone(),
                });
            }
            // Any incident still in handling keeps the trip parked.
            if reports.iter().any(|r| r.status.blocks_progression()) {
                return Err(TripError::Blocked(trip_id.clone()));
            }

            let history = self.store.load_history(trip_id).await?;
            let commit = plan_resume(&ordering, &trip, &history, self.clock.now())?;
            self.commit(commit).await?
        };

        info!(trip_id = %trip_id, report_id = %report_id, status = %trip.current_status_id, "Trip resumed after incident");
        self.events
            .publish(DispatchEvent::TripResumed {
                trip_id: trip_id.clone(),
                report_id: report_id.clone(),
                restored_status_id: trip.current_status_id.clone(),
                at: self.clock.now(),
            })
            .await;

        Ok(TripSnapshot::of(trip, &ordering))
    }
}
