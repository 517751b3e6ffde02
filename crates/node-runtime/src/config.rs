//! # Node Configuration
//!
//! One JSON document, named by `FL_CONFIG`, holds the gateway sections
//! (`http`, `websocket`, `token`, `cors`) next to the delivery status catalog.
//! Every section is optional. Environment overrides are applied last:
//!
//! | Variable                 | Field                  |
//! |--------------------------|------------------------|
//! | `FL_HTTP_PORT`           | `http.port`            |
//! | `FL_TOKEN_ISSUER`        | `token.issuer`         |
//! | `FL_TOKEN_AUDIENCE`      | `token.audience`       |
//! | `FL_TOKEN_SIGNING_KEY`   | `token.signing_key`    |
//! | `FL_TOKEN_SUBJECT_CLAIM` | `token.subject_claim`  |
//!
//! Loaded once at start; nothing here is hot-reloaded.

use fl_01_trip_lifecycle::CatalogSnapshot;
use fl_02_location_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use shared_types::{DeliveryStatus, StatusId, Trip, TripId};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "FL_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    #[serde(flatten)]
    pub gateway: GatewayConfig,
    /// Canonical delivery statuses.
    pub statuses: Vec<DeliveryStatus>,
    /// Statuses only the incident workflow may enter.
    pub side_branch: Vec<StatusId>,
    /// Trips present at start. Trips normally come from the dispatch back
    /// office; seeding lets a standalone node serve status changes.
    pub seed_trips: Vec<SeedTrip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedTrip {
    pub trip_id: TripId,
    /// Defaults to the lowest active status.
    #[serde(default)]
    pub status_id: Option<StatusId>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            statuses: default_statuses(),
            side_branch: default_side_branch(),
            seed_trips: Vec::new(),
        }
    }
}

fn status_id(raw: &str) -> Option<StatusId> {
    StatusId::new(raw).ok()
}

fn default_statuses() -> Vec<DeliveryStatus> {
    ["assigned", "picked_up", "delivering", "completed"]
        .iter()
        .zip(0..)
        .filter_map(|(id, index)| status_id(id).map(|id| DeliveryStatus::active(id, index)))
        .collect()
}

fn default_side_branch() -> Vec<StatusId> {
    ["delaying", "canceled"]
        .iter()
        .filter_map(|id| status_id(id))
        .collect()
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

impl NodeConfig {
    /// Load from `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let path_display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path_display.clone(),
            source,
        })?;

        info!(path = %path_display, "Loaded configuration file");
        Ok(config)
    }

    /// Apply `FL_*` overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("FL_HTTP_PORT") {
            self.gateway.http.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "FL_HTTP_PORT",
                value: port.clone(),
            })?;
        }

        let token = &mut self.gateway.token;
        if let Some(issuer) = lookup("FL_TOKEN_ISSUER") {
            token.issuer = issuer;
        }
        if let Some(audience) = lookup("FL_TOKEN_AUDIENCE") {
            token.audience = audience;
        }
        if let Some(key) = lookup("FL_TOKEN_SIGNING_KEY") {
            token.signing_key = key;
            info!("Loaded token signing key from environment");
        }
        if let Some(claim) = lookup("FL_TOKEN_SUBJECT_CLAIM") {
            token.subject_claim = claim;
        }

        Ok(())
    }

    /// Catalog in the shape the lifecycle crate loads it.
    pub fn catalog(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            statuses: self.statuses.clone(),
            side_branch: self.side_branch.clone(),
        }
    }

    /// Seed trips resolved against the lowest active status.
    pub fn initial_trips(&self, lowest_active: &StatusId) -> Vec<Trip> {
        self.seed_trips
            .iter()
            .map(|seed| {
                let status = seed.status_id.clone().unwrap_or_else(|| lowest_active.clone());
                Trip::new(seed.trip_id.clone(), status)
            })
            .collect()
    }
}

/// Read `FL_CONFIG`, load the file it names and apply environment overrides.
pub fn load_from_env() -> Result<NodeConfig, ConfigError> {
    let path = std::env::var_os(CONFIG_PATH_VAR).map(std::path::PathBuf::from);
    let mut config = NodeConfig::load(path.as_deref())?;
    config.apply_env_overrides(|var| std::env::var(var).ok())?;
    Ok(config)
}
