//! Domain layer for the location gateway.

pub mod cache;
pub mod config;
pub mod error;
pub mod token;

pub use cache::LocationCache;
pub use config::{ConfigError, CorsConfig, GatewayConfig, HttpConfig, TokenConfig, WebSocketConfig};
pub use error::{ApiError, ApiResult, GatewayError, HandshakeRejection};
pub use token::{TokenValidator, Unauthorized};
