//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `SubjectId`, `ConnectionId`, `ActorId`
//! - **Trip lifecycle**: `DeliveryStatus`, `Trip`, `TripStatusHistory`
//! - **Incidents** (read-only here): `IncidentReport`, `IncidentStatus`

use crate::errors::SharedTypeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wall-clock instant used for trip history and completion.
pub type Timestamp = DateTime<Utc>;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name(String);

        impl TryFrom<String> for $name {
            type Error = SharedTypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl $name {
            /// Create from any string-like value, rejecting blank input.
            pub fn new(value: impl Into<String>) -> Result<Self, SharedTypeError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(SharedTypeError::EmptyIdentifier { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Driver (location-producing entity). Stable for a connection's lifetime.
    SubjectId,
    "subject id"
);
string_id!(
    /// Trip identifier assigned by the dispatch workflow.
    TripId,
    "trip id"
);
string_id!(
    /// Delivery status identifier, e.g. `picked_up`.
    StatusId,
    "status id"
);
string_id!(
    /// Caller requesting a trip status change.
    ActorId,
    "actor id"
);
string_id!(
    /// Incident report identifier.
    ReportId,
    "report id"
);

// =============================================================================
// CONNECTIONS
// =============================================================================

/// Identity of one socket. Uses UUID v7 so ids sort by accept time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a socket plays for its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionRole {
    /// Originates samples (a driver device). At most one per subject.
    Producer,
    /// Receives fanned-out samples. Zero or many per subject.
    Subscriber,
}

// =============================================================================
// TRIP LIFECYCLE
// =============================================================================

/// One entry of the delivery status catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatus {
    pub status_id: StatusId,
    /// Unique, strictly ordered position in the canonical progression.
    pub status_index: i32,
    /// Inactive (soft-deleted) entries stay resolvable for history.
    pub is_active: bool,
}

impl DeliveryStatus {
    pub fn active(status_id: StatusId, status_index: i32) -> Self {
        Self {
            status_id,
            status_index,
            is_active: true,
        }
    }

    pub fn inactive(status_id: StatusId, status_index: i32) -> Self {
        Self {
            status_id,
            status_index,
            is_active: false,
        }
    }
}

/// A trip as far as the lifecycle core is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub trip_id: TripId,
    pub current_status_id: StatusId,
    /// Set once, when the trip first reaches the completion index.
    pub end_time: Option<Timestamp>,
    /// Status held when the trip was parked on a side branch; cleared on resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_from: Option<StatusId>,
}

impl Trip {
    pub fn new(trip_id: TripId, current_status_id: StatusId) -> Self {
        Self {
            trip_id,
            current_status_id,
            end_time: None,
            suspended_from: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Append-only audit record, one per accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusHistory {
    pub history_id: Uuid,
    pub trip_id: TripId,
    pub status_id: StatusId,
    pub start_time: Timestamp,
}

impl TripStatusHistory {
    pub fn new(trip_id: TripId, status_id: StatusId, start_time: Timestamp) -> Self {
        Self {
            history_id: Uuid::new_v4(),
            trip_id,
            status_id,
            start_time,
        }
    }
}

// =============================================================================
// INCIDENTS
// =============================================================================

/// Processing state of an incident report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
    /// Filed, not yet picked up.
    Pending,
    /// Being handled; blocks the trip's status progression.
    Handling,
    /// Closed out.
    Resolved,
}

impl IncidentStatus {
    pub fn blocks_progression(&self) -> bool {
        matches!(self, IncidentStatus::Handling)
    }
}

/// Incident report owned by the external incident workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub report_id: ReportId,
    pub trip_id: TripId,
    pub status: IncidentStatus,
}
