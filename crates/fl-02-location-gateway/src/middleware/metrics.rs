//! Gateway metrics.
//!
//! Plain atomic counters, exported as JSON on `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Location gateway metrics
#[derive(Default)]
pub struct GatewayMetrics {
    // Connection gauges
    pub producer_connections: AtomicU64,
    pub subscriber_connections: AtomicU64,

    // Handshake counters
    pub handshakes_rejected: AtomicU64,
    pub producers_replaced: AtomicU64,

    // Sample flow
    pub samples_received: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub deliveries: AtomicU64,
    pub subscriber_evictions: AtomicU64,

    // HTTP
    pub requests_total: AtomicU64,
    pub requests_error: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_producer_connect(&self) {
        self.producer_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_producer_disconnect(&self) {
        self.producer_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_subscriber_connect(&self) {
        self.subscriber_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscriber_disconnect(&self) {
        self.subscriber_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_handshake_rejected(&self) {
        self.handshakes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_producer_replaced(&self) {
        self.producers_replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self) {
        self.samples_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Malformed, out-of-range or over the rate limit
    pub fn record_sample_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deliveries(&self, count: usize) {
        self.deliveries.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.subscriber_evictions
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record an HTTP request outcome
    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "connections": {
                "producers": self.producer_connections.load(Ordering::Relaxed),
                "subscribers": self.subscriber_connections.load(Ordering::Relaxed),
            },
            "handshakes": {
                "rejected": self.handshakes_rejected.load(Ordering::Relaxed),
                "producers_replaced": self.producers_replaced.load(Ordering::Relaxed),
            },
            "samples": {
                "received": self.samples_received.load(Ordering::Relaxed),
                "dropped": self.samples_dropped.load(Ordering::Relaxed),
                "deliveries": self.deliveries.load(Ordering::Relaxed),
                "subscriber_evictions": self.subscriber_evictions.load(Ordering::Relaxed),
            },
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "error": self.requests_error.load(Ordering::Relaxed),
            },
        })
    }
}
