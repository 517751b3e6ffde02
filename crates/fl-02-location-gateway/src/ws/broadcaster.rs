//! Sample fan-out.
//!
//! `on_sample` never awaits: it writes the cache, snapshots the subject's
//! subscribers and queues the frame on each one with `try_send`. A full or
//! closed queue evicts that subscriber without affecting the others.
//!
//! Per-subject ordering follows from the producer session calling
//! `on_sample` sequentially for each frame it reads.

use crate::domain::cache::LocationCache;
use crate::middleware::GatewayMetrics;
use crate::ws::registry::{ConnectionRegistry, Frame, SendFailure};
use shared_types::{ConnectionId, LocationSample, SubjectId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the frame was queued for
    pub delivered: usize,
    /// Subscribers removed because their queue was full or closed
    pub evicted: Vec<ConnectionId>,
}

pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    cache: Arc<LocationCache>,
    metrics: Arc<GatewayMetrics>,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        cache: Arc<LocationCache>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            registry,
            cache,
            metrics,
        }
    }

    /// Cache `sample` for `subject` and push it to every current subscriber.
    pub fn on_sample(&self, subject: &SubjectId, sample: LocationSample) -> BroadcastReport {
        self.cache.put(subject.clone(), sample);

        let frame: Frame = Arc::from(sample.to_frame());
        let mut report = BroadcastReport::default();

        for subscriber in self.registry.subscribers_of(subject) {
            match subscriber.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    let connection_id = subscriber.connection_id();
                    match failure {
                        SendFailure::Full => warn!(
                            subject_id = %subject,
                            connection_id = %connection_id,
                            "Subscriber queue full, evicting"
                        ),
                        SendFailure::Closed => debug!(
                            subject_id = %subject,
                            connection_id = %connection_id,
                            "Subscriber gone, evicting"
                        ),
                    }
                    self.registry.remove_connection(connection_id);
                    report.evicted.push(connection_id);
                }
            }
        }

        self.metrics.record_sample();
        self.metrics.record_deliveries(report.delivered);
        self.metrics.record_evictions(report.evicted.len());

        debug!(
            subject_id = %subject,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Broadcast sample"
        );
        report
    }

    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}
