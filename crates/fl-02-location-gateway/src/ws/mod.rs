//! WebSocket side of the gateway.
//!
//! - `registry` - who is producing and who is listening, per subject
//! - `broadcaster` - cache write plus fan-out of each accepted sample
//! - `handler` - handshake policy and the per-socket session loops

pub mod broadcaster;
pub mod handler;
pub mod registry;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use handler::{ConnectParams, SessionRequest, WebSocketHandler};
pub use registry::{ConnectionRegistry, ProducerHandle, SendFailure, SubscriberHandle};
