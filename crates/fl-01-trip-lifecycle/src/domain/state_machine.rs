//! # Trip State Machine
//!
//! Pure transition rules. Nothing here touches storage; the service layer
//! loads the trip, asks for a plan, and commits the resulting
//! [`TransitionCommit`] atomically.
//!
//! ## State Machine
//!
//! ```text
//! [lowest active] ──+1──→ ... ──+1──→ [second highest] ──+1──→ [completion]
//!        │                  │                                (end_time set)
//!        └──── suspend ─────┴──→ [side branch] ──resume──→ [status before suspend]
//! ```
//!
//! Regular requests advance by exactly one index. The only non-monotonic
//! move is `resume`, which restores the status held before suspension and is
//! reachable only through the incident workflow.

use super::errors::TripError;
use super::ordering::DeliveryStatusOrdering;
use serde::{Deserialize, Serialize};
use shared_types::{StatusId, Timestamp, Trip, TripStatusHistory};

/// Everything the store must write for one accepted move, as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommit {
    /// Trip row after the move.
    pub trip: Trip,
    /// Status the row must still hold at commit time.
    pub expected_status: StatusId,
    /// History row to append.
    pub history: TripStatusHistory,
}

/// Accepted regular transition, before it is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: StatusId,
    pub to: StatusId,
    pub to_index: i32,
    /// First arrival at the completion index.
    pub completes_trip: bool,
}

impl TransitionPlan {
    pub fn into_commit(self, trip: &Trip, now: Timestamp) -> TransitionCommit {
        let mut updated = trip.clone();
        updated.current_status_id = self.to.clone();
        if self.completes_trip {
            updated.end_time = Some(now);
        }
        TransitionCommit {
            history: TripStatusHistory::new(trip.trip_id.clone(), self.to, now),
            expected_status: self.from,
            trip: updated,
        }
    }
}

/// Trip as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSnapshot {
    #[serde(flatten)]
    pub trip: Trip,
    /// `None` while the trip sits on a side-branch status.
    pub status_index: Option<i32>,
    pub suspended: bool,
}

impl TripSnapshot {
    pub fn of(trip: Trip, ordering: &DeliveryStatusOrdering) -> Self {
        let status_index = ordering.index_of(&trip.current_status_id);
        let suspended = ordering.is_side_branch(&trip.current_status_id);
        Self {
            trip,
            status_index,
            suspended,
        }
    }
}

/// Validate a regular transition request (target resolution and the
/// single-step rule). Existence and incident checks happen before this.
pub fn plan_transition(
    ordering: &DeliveryStatusOrdering,
    trip: &Trip,
    target: &StatusId,
) -> Result<TransitionPlan, TripError> {
    let to_index = ordering
        .active_index_of(target)
        .ok_or_else(|| TripError::StatusNotFound(target.clone()))?;

    let invalid = || TripError::InvalidTransition {
        from: trip.current_status_id.clone(),
        to: target.clone(),
    };

    // Side-branch or unknown current status: no regular move applies.
    let from_index = ordering.index_of(&trip.current_status_id).ok_or_else(invalid)?;

    if from_index.checked_add(1) != Some(to_index) {
        return Err(invalid());
    }

    Ok(TransitionPlan {
        from: trip.current_status_id.clone(),
        to: target.clone(),
        to_index,
        completes_trip: to_index == ordering.completion_index() && trip.end_time.is_none(),
    })
}

/// Move a trip onto a side-branch status.
pub fn plan_suspend(
    ordering: &DeliveryStatusOrdering,
    trip: &Trip,
    side_status: &StatusId,
    now: Timestamp,
) -> Result<TransitionCommit, TripError> {
    if !ordering.is_side_branch(side_status) {
        return Err(TripError::StatusNotFound(side_status.clone()));
    }

    let current_index = ordering.index_of(&trip.current_status_id);
    let at_terminal = current_index == Some(ordering.highest_active().status_index);
    if current_index.is_none() || at_terminal || trip.is_completed() {
        return Err(TripError::InvalidTransition {
            from: trip.current_status_id.clone(),
            to: side_status.clone(),
        });
    }

    let mut updated = trip.clone();
    updated.current_status_id = side_status.clone();
    updated.suspended_from = Some(trip.current_status_id.clone());
    Ok(TransitionCommit {
        history: TripStatusHistory::new(trip.trip_id.clone(), side_status.clone(), now),
        expected_status: trip.current_status_id.clone(),
        trip: updated,
    })
}

/// Restore a suspended trip to the status it held before suspension.
///
/// Trips parked before `suspended_from` was recorded fall back to the most
/// recent main-progression status in `history` (ordered by start time). With
/// neither, there is nothing to restore and the move is rejected.
pub fn plan_resume(
    ordering: &DeliveryStatusOrdering,
    trip: &Trip,
    history: &[TripStatusHistory],
    now: Timestamp,
) -> Result<TransitionCommit, TripError> {
    if !ordering.is_side_branch(&trip.current_status_id) {
        return Err(TripError::InvalidTransition {
            from: trip.current_status_id.clone(),
            to: trip.current_status_id.clone(),
        });
    }

    let restored = trip
        .suspended_from
        .as_ref()
        .or_else(|| {
            history
                .iter()
                .rev()
                .map(|h| &h.status_id)
                .find(|id| ordering.index_of(id).is_some())
        })
        .filter(|id| ordering.index_of(id).is_some())
        .cloned()
        .ok_or_else(|| TripError::InvalidTransition {
            from: trip.current_status_id.clone(),
            to: trip.current_status_id.clone(),
        })?;

    let mut updated = trip.clone();
    updated.current_status_id = restored.clone();
    updated.suspended_from = None;
    Ok(TransitionCommit {
        history: TripStatusHistory::new(trip.trip_id.clone(), restored, now),
        expected_status: trip.current_status_id.clone(),
        trip: updated,
    })
}
