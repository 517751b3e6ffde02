//! Middleware stack for the location gateway.
//!
//! Layer order: Request → CORS → Tracing → Handler

pub mod cors;
pub mod metrics;
pub mod tracing;

pub use cors::create_cors_layer;
pub use metrics::GatewayMetrics;
pub use tracing::TracingLayer;
