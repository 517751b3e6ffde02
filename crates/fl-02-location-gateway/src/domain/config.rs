//! Gateway configuration with validation.
//!
//! Loaded once at process start; token parameters are never hot-reloaded.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration (routes and socket upgrades share one port)
    pub http: HttpConfig,
    /// WebSocket session configuration
    pub websocket: WebSocketConfig,
    /// Token validation parameters
    pub token: TokenConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.issuer.trim().is_empty() {
            return Err(ConfigError::MissingToken("issuer"));
        }
        if self.token.audience.trim().is_empty() {
            return Err(ConfigError::MissingToken("audience"));
        }
        if self.token.signing_key.is_empty() {
            return Err(ConfigError::MissingToken("signing_key"));
        }
        if self.token.subject_claim.trim().is_empty() {
            return Err(ConfigError::MissingToken("subject_claim"));
        }

        if self.websocket.rate_limit == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "rate_limit cannot be 0".into(),
            ));
        }
        if self.websocket.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }
        if self.websocket.subscriber_buffer == 0 {
            return Err(ConfigError::InvalidLimit(
                "subscriber_buffer cannot be 0".into(),
            ));
        }

        if self.websocket.ping_interval.is_zero() || self.websocket.idle_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "ping_interval and idle_timeout must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 5080)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5080,
        }
    }
}

/// Default maximum inbound frame size (64KB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default producer rate limit (frames per second)
pub const DEFAULT_RATE_LIMIT: u32 = 20;

/// Default per-subscriber outbound queue depth
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// WebSocket session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Frames larger than this close the socket with 1009
    pub max_message_size: usize,
    /// Producer frames per second; the excess is dropped
    pub rate_limit: u32,
    /// Outbound queue depth per subscriber; a full queue evicts the subscriber
    pub subscriber_buffer: usize,
    /// Server ping interval
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,
    /// Close connections with no inbound traffic for this long
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// Push the cached sample to a subscriber right after it registers
    pub replay_cached_on_subscribe: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            rate_limit: DEFAULT_RATE_LIMIT,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            replay_cached_on_subscribe: false,
        }
    }
}

/// Token validation parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Expected `iss` claim
    pub issuer: String,
    /// Expected `aud` claim
    pub audience: String,
    /// HS256 shared secret
    pub signing_key: String,
    /// Claim carrying the subject id
    pub subject_claim: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            signing_key: String::new(),
            subject_claim: "sub".to_string(),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("signing_key", &"<redacted>")
            .field("subject_claim", &self.subject_claim)
            .finish()
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache (seconds)
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "PATCH".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            max_age: 86400, // 24 hours
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A required token parameter is empty
    #[error("token {0} must be configured")]
    MissingToken(&'static str),
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Humantime serde module for Duration serialization
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m".
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
