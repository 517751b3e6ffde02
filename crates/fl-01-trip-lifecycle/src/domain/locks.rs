//! Per-trip lock table.
//!
//! Serializes validate-then-commit for one trip while leaving other trips
//! free to proceed. Entries are dropped once no caller holds or waits on
//! them, so the table stays proportional to in-flight trips.

use dashmap::DashMap;
use shared_types::TripId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct TripLocks {
    locks: DashMap<TripId, Arc<Mutex<()>>>,
}

impl TripLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `trip_id`.
    pub async fn acquire(&self, trip_id: &TripId) -> TripLockGuard<'_> {
        let mutex = self
            .locks
            .entry(trip_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        TripLockGuard {
            table: self,
            trip_id: trip_id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of trips currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Holds a trip's lock; releases and prunes the table entry on drop.
pub struct TripLockGuard<'a> {
    table: &'a TripLocks,
    trip_id: TripId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TripLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's own reference left: nobody holds or waits.
        self.table
            .locks
            .remove_if(&self.trip_id, |_, m| Arc::strong_count(m) == 1);
    }
}
