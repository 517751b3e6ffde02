//! # Shared Types Crate
//!
//! Domain vocabulary shared by every FleetLine crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identifiers and entities crossing crate
//!   boundaries are defined here and nowhere else.
//! - **Opaque identifiers**: subject, trip and status ids are newtypes over
//!   strings so they cannot be confused with one another at call sites.
//! - **Wire shape lives with the type**: `LocationSample` owns its JSON field
//!   names (`Latitude` / `Longitude`).

pub mod entities;
pub mod errors;
pub mod location;

pub use entities::*;
pub use errors::*;
pub use location::*;
