//! # Node Wiring
//!
//! Builds every component from a [`NodeConfig`] and hands the lifecycle
//! service to the gateway:
//!
//! ```text
//! StaticStatusCatalog ──load──→ DeliveryStatusOrdering
//!                                        │
//! InMemoryTripStore ─────┐               ↓
//! InMemoryIncidentLedger ┼──→ TripLifecycleService ──→ InMemoryEventBus
//!                        │               │                   │
//!                        │               ↓                   ↓
//!                        │        LocationGateway      event log task
//! ```

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use fl_01_trip_lifecycle::{
    load_ordering, InMemoryIncidentLedger, InMemoryTripStore, StaticStatusCatalog,
    TripLifecycleService,
};
use fl_02_location_gateway::LocationGateway;
use shared_bus::{DispatchEvent, EventFilter, InMemoryEventBus, Subscription};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The running FleetLine node.
pub struct FleetlineNode {
    gateway: LocationGateway,
    lifecycle: Arc<TripLifecycleService>,
    store: Arc<InMemoryTripStore>,
    incidents: Arc<InMemoryIncidentLedger>,
    bus: Arc<InMemoryEventBus>,
}

impl FleetlineNode {
    /// Initialize all components. Fails on an invalid catalog or gateway
    /// configuration.
    pub async fn build(config: NodeConfig) -> Result<Self> {
        let catalog = StaticStatusCatalog::new(config.statuses.clone(), config.side_branch.clone());
        let ordering = load_ordering(&catalog)
            .await
            .context("invalid delivery status catalog")?;
        info!(
            statuses = ordering.statuses().len(),
            first = %ordering.lowest_active().status_id,
            terminal = %ordering.highest_active().status_id,
            completion_index = ordering.completion_index(),
            "Loaded delivery status catalog"
        );

        let store = Arc::new(InMemoryTripStore::new());
        for trip in config.initial_trips(&ordering.lowest_active().status_id) {
            debug!(trip_id = %trip.trip_id, status_id = %trip.current_status_id, "Seeding trip");
            store.insert_trip(trip);
        }

        let incidents = Arc::new(InMemoryIncidentLedger::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let lifecycle = Arc::new(TripLifecycleService::new(
            ordering,
            store.clone(),
            incidents.clone(),
            bus.clone(),
        ));

        let gateway = LocationGateway::new(config.gateway, lifecycle.clone())
            .context("invalid gateway configuration")?;

        Ok(Self {
            gateway,
            lifecycle,
            store,
            incidents,
            bus,
        })
    }

    pub fn gateway(&self) -> &LocationGateway {
        &self.gateway
    }

    pub fn lifecycle(&self) -> Arc<TripLifecycleService> {
        Arc::clone(&self.lifecycle)
    }

    pub fn store(&self) -> Arc<InMemoryTripStore> {
        Arc::clone(&self.store)
    }

    pub fn incidents(&self) -> Arc<InMemoryIncidentLedger> {
        Arc::clone(&self.incidents)
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    /// Log every dispatch event until the bus goes away.
    pub fn spawn_event_log(&self) -> JoinHandle<()> {
        let subscription = self.bus.subscribe(EventFilter::all());
        tokio::spawn(log_events(subscription))
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.gateway
            .serve(listener, shutdown)
            .await
            .context("location gateway failed")
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.gateway
            .start(shutdown)
            .await
            .context("location gateway failed")
    }
}

async fn log_events(mut subscription: Subscription) {
    while let Some(event) = subscription.recv().await {
        match &event {
            DispatchEvent::TripCompleted {
                trip_id,
                status_id,
                completed_at,
            } => info!(
                trip_id = %trip_id,
                status_id = %status_id,
                completed_at = %completed_at,
                "Trip completed"
            ),
            other => debug!(trip_id = %other.trip_id(), topic = ?other.topic(), "Dispatch event"),
        }
    }
}
