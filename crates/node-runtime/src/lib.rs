//! # Node Runtime Library
//!
//! Exposes configuration loading and component wiring so the binary and the
//! integration suite build the node the same way. The entry point is the
//! `fleetline-node` binary in `main.rs`.

#![warn(clippy::all)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod node;

pub use config::{load_from_env, ConfigError, NodeConfig, SeedTrip, CONFIG_PATH_VAR};
pub use node::FleetlineNode;
