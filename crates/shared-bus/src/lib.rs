//! # Shared Bus - In-Process Event Bus
//!
//! Carries side effects of the trip lifecycle (status advanced, trip
//! completed, trip resumed after an incident) to whoever cares about them:
//! notification senders, analytics, the dispatcher dashboard.
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────┐
//! │ Trip lifecycle   │                    │ Notifier / etc.  │
//! │                  │    publish()       │                  │
//! │                  │ ──────┐            │                  │
//! └──────────────────┘       │            └──────────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐           │
//!                      │  Event Bus   │ ──────────┘
//!                      └──────────────┘  subscribe()
//! ```
//!
//! Delivery is best-effort: events published with no subscriber are dropped,
//! and a subscriber that falls more than the channel capacity behind skips
//! the oldest events.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{DispatchEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are skipped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
