//! # Shared Error Types

use thiserror::Error;

/// Rejected construction of a shared value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SharedTypeError {
    /// Identifier was empty or whitespace.
    #[error("{kind} must not be empty")]
    EmptyIdentifier { kind: &'static str },

    /// Latitude outside [-90, 90] or not finite.
    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180] or not finite.
    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
}
