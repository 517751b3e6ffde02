//! # Event Publisher
//!
//! The lifecycle service publishes after every committed transition. A
//! publish with nobody listening is not an error; the transition already
//! happened and the event is simply dropped.

use crate::events::{DispatchEvent, EventFilter, EventTopic};
use crate::subscriber::{EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// Returns the number of active subscribers that received the event.
    async fn publish(&self, event: DispatchEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-process bus over `tokio::sync::broadcast`.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<DispatchEvent>,
    lifecycle_events: AtomicU64,
    incident_events: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            lifecycle_events: AtomicU64::new(0),
            incident_events: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, trips = filter.trips.len(), "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Events published on one topic, delivered or not.
    #[must_use]
    pub fn published_on(&self, topic: EventTopic) -> u64 {
        let lifecycle = self.lifecycle_events.load(Ordering::Relaxed);
        let incidents = self.incident_events.load(Ordering::Relaxed);
        match topic {
            EventTopic::TripLifecycle => lifecycle,
            EventTopic::Incidents => incidents,
            EventTopic::All => lifecycle + incidents,
        }
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: DispatchEvent) -> usize {
        let topic = event.topic();
        let trip_id = event.trip_id().clone();
        let counter = match topic {
            EventTopic::Incidents => &self.incident_events,
            _ => &self.lifecycle_events,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(topic = ?topic, trip_id = %trip_id, receivers, "Dispatch event published");
        receivers
    }

    fn events_published(&self) -> u64 {
        self.published_on(EventTopic::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{ReportId, StatusId, TripId};

    fn completed() -> DispatchEvent {
        DispatchEvent::TripCompleted {
            trip_id: TripId::new("T1").unwrap(),
            status_id: StatusId::new("completed").unwrap(),
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let bus = InMemoryEventBus::new();

        let receivers = bus.publish(completed()).await;
        assert_eq!(receivers, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn test_publish_with_subscriber() {
        let bus = InMemoryEventBus::new();

        // Create subscriber BEFORE publishing
        let _sub = bus.subscribe(EventFilter::all());

        let receivers = bus.publish(completed()).await;

        assert_eq!(receivers, 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = InMemoryEventBus::new();

        let _sub1 = bus.subscribe(EventFilter::all());
        let _sub2 = bus.subscribe(EventFilter::all());
        let _sub3 = bus.subscribe(EventFilter::topics(vec![EventTopic::Incidents]));

        // Filtering happens on receive, so every receiver counts.
        let receivers = bus.publish(completed()).await;
        assert_eq!(receivers, 3);
    }

    #[tokio::test]
    async fn test_per_topic_counts() {
        let bus = InMemoryEventBus::new();
        bus.publish(completed()).await;
        bus.publish(DispatchEvent::TripSuspended {
            trip_id: TripId::new("T1").unwrap(),
            report_id: ReportId::new("R1").unwrap(),
            side_status_id: StatusId::new("delaying").unwrap(),
            at: Utc::now(),
        })
        .await;
        bus.publish(completed()).await;

        assert_eq!(bus.published_on(EventTopic::TripLifecycle), 2);
        assert_eq!(bus.published_on(EventTopic::Incidents), 1);
        assert_eq!(bus.events_published(), 3);
    }

    #[test]
    fn test_default_bus() {
        let bus = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.events_published(), 0);
    }
}
