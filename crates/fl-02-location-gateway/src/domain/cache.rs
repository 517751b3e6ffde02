//! Latest location per subject.
//!
//! Overwritten on every sample, never appended, never evicted. Entries
//! outlive the producer connection that wrote them.

use dashmap::DashMap;
use shared_types::{LocationSample, SubjectId};

#[derive(Default)]
pub struct LocationCache {
    latest: DashMap<SubjectId, LocationSample>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached sample for `subject`.
    pub fn put(&self, subject: SubjectId, sample: LocationSample) {
        self.latest.insert(subject, sample);
    }

    pub fn get(&self, subject: &SubjectId) -> Option<LocationSample> {
        self.latest.get(subject).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
