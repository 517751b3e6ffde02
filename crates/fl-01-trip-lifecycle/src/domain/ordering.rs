//! # Delivery Status Ordering
//!
//! Read-mostly catalog of delivery statuses, ordered by `status_index`.
//!
//! - Every entry (active or not) resolves through [`DeliveryStatusOrdering::index_of`],
//!   so a trip parked on a since-retired status can still be compared.
//! - Only active entries are valid transition targets and take part in the
//!   "highest" / "second highest" computations.
//! - Side-branch statuses (`delaying`, `canceled`) sit outside the linear
//!   progression and have no index at all.

use super::errors::CatalogError;
use shared_types::{DeliveryStatus, StatusId};
use std::collections::{HashMap, HashSet};

/// Ordered catalog of delivery statuses.
#[derive(Debug, Clone)]
pub struct DeliveryStatusOrdering {
    /// All entries, ascending by index.
    statuses: Vec<DeliveryStatus>,
    /// Status id -> position in `statuses`.
    by_id: HashMap<StatusId, usize>,
    /// Positions of active entries in `statuses`, ascending.
    active: Vec<usize>,
    /// Out-of-band incident statuses.
    side_branch: HashSet<StatusId>,
}

impl DeliveryStatusOrdering {
    /// Build and validate a catalog.
    ///
    /// Requires unique ids, unique indices and at least two active entries
    /// (the completion rule needs a second-highest active index).
    pub fn new(mut statuses: Vec<DeliveryStatus>) -> Result<Self, CatalogError> {
        statuses.sort_by_key(|s| s.status_index);

        let mut by_id = HashMap::with_capacity(statuses.len());
        for (pos, status) in statuses.iter().enumerate() {
            if by_id.insert(status.status_id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateStatusId(status.status_id.clone()));
            }
        }
        for pair in statuses.windows(2) {
            if pair[0].status_index == pair[1].status_index {
                return Err(CatalogError::DuplicateIndex(pair[0].status_index));
            }
        }

        let active: Vec<usize> = statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active)
            .map(|(pos, _)| pos)
            .collect();
        if active.len() < 2 {
            return Err(CatalogError::TooFewActive {
                found: active.len(),
            });
        }

        Ok(Self {
            statuses,
            by_id,
            active,
            side_branch: HashSet::new(),
        })
    }

    /// Register the out-of-band statuses the incident workflow may use.
    pub fn with_side_branch(
        mut self,
        side_branch: impl IntoIterator<Item = StatusId>,
    ) -> Result<Self, CatalogError> {
        for id in side_branch {
            if self.by_id.contains_key(&id) {
                return Err(CatalogError::SideBranchCollides(id));
            }
            self.side_branch.insert(id);
        }
        Ok(self)
    }

    /// Index of any catalog entry, active or not.
    pub fn index_of(&self, status_id: &StatusId) -> Option<i32> {
        self.status(status_id).map(|s| s.status_index)
    }

    /// Index of an active entry; inactive and unknown ids resolve to `None`.
    pub fn active_index_of(&self, status_id: &StatusId) -> Option<i32> {
        self.status(status_id)
            .filter(|s| s.is_active)
            .map(|s| s.status_index)
    }

    pub fn status(&self, status_id: &StatusId) -> Option<&DeliveryStatus> {
        self.by_id.get(status_id).map(|&pos| &self.statuses[pos])
    }

    pub fn is_active(&self, status_id: &StatusId) -> bool {
        self.active_index_of(status_id).is_some()
    }

    pub fn is_side_branch(&self, status_id: &StatusId) -> bool {
        self.side_branch.contains(status_id)
    }

    /// Initial state for new trips.
    pub fn lowest_active(&self) -> &DeliveryStatus {
        &self.statuses[self.active[0]]
    }

    /// Terminal state.
    pub fn highest_active(&self) -> &DeliveryStatus {
        &self.statuses[self.active[self.active.len() - 1]]
    }

    pub fn second_highest_active_index(&self) -> i32 {
        self.statuses[self.active[self.active.len() - 2]].status_index
    }

    /// Index whose first arrival stamps `Trip::end_time`.
    pub fn completion_index(&self) -> i32 {
        self.second_highest_active_index() + 1
    }

    /// All entries, ascending by index.
    pub fn statuses(&self) -> &[DeliveryStatus] {
        &self.statuses
    }

    pub fn side_branch(&self) -> impl Iterator<Item = &StatusId> {
        self.side_branch.iter()
    }
}
