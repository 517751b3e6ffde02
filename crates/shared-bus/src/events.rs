//! # Dispatch Events
//!
//! Every event that flows through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::{ActorId, ReportId, StatusId, Timestamp, TripId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchEvent {
    /// A transition request was accepted and committed.
    TripStatusAdvanced {
        trip_id: TripId,
        from: StatusId,
        to: StatusId,
        actor_id: ActorId,
        at: Timestamp,
    },

    /// The trip reached its completion index and `end_time` was set.
    TripCompleted {
        trip_id: TripId,
        status_id: StatusId,
        completed_at: Timestamp,
    },

    /// The incident workflow moved the trip into a side-branch status.
    TripSuspended {
        trip_id: TripId,
        report_id: ReportId,
        side_status_id: StatusId,
        at: Timestamp,
    },

    /// The incident workflow restored the trip to its prior status.
    TripResumed {
        trip_id: TripId,
        report_id: ReportId,
        restored_status_id: StatusId,
        at: Timestamp,
    },
}

impl DispatchEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TripStatusAdvanced { .. } | Self::TripCompleted { .. } => EventTopic::TripLifecycle,
            Self::TripSuspended { .. } | Self::TripResumed { .. } => EventTopic::Incidents,
        }
    }

    /// Trip the event concerns.
    #[must_use]
    pub fn trip_id(&self) -> &TripId {
        match self {
            Self::TripStatusAdvanced { trip_id, .. }
            | Self::TripCompleted { trip_id, .. }
            | Self::TripSuspended { trip_id, .. }
            | Self::TripResumed { trip_id, .. } => trip_id,
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Regular status progression and completion.
    TripLifecycle,
    /// Incident-driven suspend / resume.
    Incidents,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Trips to include. Empty means all trips.
    pub trips: Vec<TripId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            trips: Vec::new(),
        }
    }

    /// Create a filter for events about specific trips.
    #[must_use]
    pub fn for_trips(trips: Vec<TripId>) -> Self {
        Self {
            topics: Vec::new(),
            trips,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &DispatchEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let trip_match = self.trips.is_empty() || self.trips.contains(event.trip_id());

        topic_match && trip_match
    }
}
