//! FL-02 Location Gateway - real-time GPS fan-out plus the trip status HTTP surface.
//!
//! Drivers' devices connect as **producers** and stream location samples;
//! dispatch consoles connect as **subscribers** to one driver and receive
//! every sample that driver sends while they are connected. The last sample
//! per driver is cached for point lookups.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     LOCATION GATEWAY (fl-02)                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   GET /ws            GET /location/:id      PATCH /trips/:id/... │
//! │      │                     │                        │            │
//! │  ┌───┴──────────────────────┴────────────────────────┴───┐       │
//! │  │              Middleware: CORS → Tracing               │       │
//! │  └───┬──────────────────────┬────────────────────────┬───┘       │
//! │      │                      │                        │           │
//! │  WebSocketHandler      LocationCache        TripLifecycleApi     │
//! │  (token, limits)            ↑                    (fl-01)         │
//! │      │                      │                                    │
//! │      └──► Broadcaster ──────┘                                    │
//! │               │                                                  │
//! │        ConnectionRegistry ──► per-subscriber bounded queues      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! | Property            | Mechanism                                          |
//! |---------------------|----------------------------------------------------|
//! | Single producer     | register returns the displaced handle; it closes   |
//! | Authenticated send  | HS256 token, subject claim must equal `userId`     |
//! | Exactly-once fan-out| snapshot of subscribers, one `try_send` each       |
//! | Isolation           | a full or closed queue evicts only that subscriber |
//! | Per-subject order   | producer session calls `on_sample` sequentially    |
//! | Cache freshness     | cache written before fan-out, last write wins      |
//!
//! # Usage
//!
//! ```ignore
//! use fl_02_location_gateway::{GatewayConfig, LocationGateway};
//!
//! let gateway = LocationGateway::new(config, lifecycle)?;
//! gateway.start(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod middleware;
pub mod service;
pub mod ws;

pub use domain::{
    ApiError, ConfigError, CorsConfig, GatewayConfig, GatewayError, HandshakeRejection,
    HttpConfig, LocationCache, TokenConfig, TokenValidator, Unauthorized, WebSocketConfig,
};
pub use middleware::GatewayMetrics;
pub use service::{LocationGateway, StatusChangeRequest};
pub use ws::{BroadcastReport, Broadcaster, ConnectParams, ConnectionRegistry, SessionRequest};
