//! # Location Samples
//!
//! A `LocationSample` is the only payload that flows over the producer and
//! subscriber sockets, and the body of the point-lookup endpoint.

use crate::errors::SharedTypeError;
use serde::{Deserialize, Serialize};

/// Most recent position reported by a subject.
///
/// Serialized as `{"Latitude": <f64>, "Longitude": <f64>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocationSample {
    /// Degrees north, [-90, 90].
    pub latitude: f64,
    /// Degrees east, [-180, 180].
    pub longitude: f64,
}

impl LocationSample {
    /// Create a sample without range checks.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<(), SharedTypeError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SharedTypeError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SharedTypeError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    /// Parse a UTF-8 JSON frame and validate it.
    pub fn from_frame(frame: &str) -> Result<Self, FrameError> {
        let sample: Self = serde_json::from_str(frame)?;
        sample.validate()?;
        Ok(sample)
    }

    /// Serialize to the wire shape.
    pub fn to_frame(&self) -> String {
        // Two f64 fields always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Why an inbound frame could not be turned into a sample.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    OutOfRange(#[from] SharedTypeError),
}
