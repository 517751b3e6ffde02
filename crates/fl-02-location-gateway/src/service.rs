//! Location gateway service - routes, shared state and the serve loop.
//!
//! One listener carries every surface:
//!
//! | Route                          | Purpose                                 |
//! |--------------------------------|-----------------------------------------|
//! | `GET /ws`                      | producer / subscriber socket upgrade    |
//! | `GET /location/:user_id`       | last cached sample for a subject        |
//! | `PATCH /trips/:trip_id/status` | single-step trip status advance         |
//! | `GET /trips/:trip_id`          | current trip snapshot                   |
//! | `GET /trips/:trip_id/history`  | status history ordered by start time    |
//! | `GET /health`, `GET /metrics`  | liveness and counters                   |

use crate::domain::cache::LocationCache;
use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, ApiResult, GatewayError};
use crate::domain::token::TokenValidator;
use crate::middleware::{create_cors_layer, GatewayMetrics, TracingLayer};
use crate::ws::{Broadcaster, ConnectParams, ConnectionRegistry, WebSocketHandler};
use axum::{
    extract::{rejection::JsonRejection, ws::WebSocketUpgrade, Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use fl_01_trip_lifecycle::{TripLifecycleApi, TripSnapshot};
use serde::Deserialize;
use shared_types::{ActorId, LocationSample, StatusId, SubjectId, TripId, TripStatusHistory};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{info, warn};

/// Body of `PATCH /trips/:trip_id/status`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub status_id: String,
    pub actor_id: String,
}

/// Location gateway
pub struct LocationGateway {
    config: GatewayConfig,
    ws: Arc<WebSocketHandler>,
    broadcaster: Arc<Broadcaster>,
    lifecycle: Arc<dyn TripLifecycleApi>,
    metrics: Arc<GatewayMetrics>,
}

impl LocationGateway {
    /// Create a gateway. Fails on invalid configuration.
    pub fn new(
        config: GatewayConfig,
        lifecycle: Arc<dyn TripLifecycleApi>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let metrics = Arc::new(GatewayMetrics::new());
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(LocationCache::new()),
            Arc::clone(&metrics),
        ));
        let ws = Arc::new(WebSocketHandler::new(
            Arc::clone(&broadcaster),
            Arc::new(TokenValidator::new(&config.token)),
            config.websocket.clone(),
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config,
            ws,
            broadcaster,
            lifecycle,
            metrics,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        Arc::clone(&self.broadcaster)
    }

    /// Build the full router
    pub fn router(&self) -> Router {
        let state = AppState {
            ws: Arc::clone(&self.ws),
            cache: Arc::clone(self.broadcaster.cache()),
            lifecycle: Arc::clone(&self.lifecycle),
            metrics: Arc::clone(&self.metrics),
        };

        let middleware = ServiceBuilder::new()
            .layer(create_cors_layer(&self.config.cors))
            .layer(TracingLayer::new());

        Router::new()
            .route("/ws", get(ws_upgrade))
            .route("/location/:user_id", get(get_location))
            .route("/trips/:trip_id", get(get_trip))
            .route("/trips/:trip_id/status", patch(patch_trip_status))
            .route("/trips/:trip_id/history", get(get_trip_history))
            .route("/health", get(health_check))
            .route("/metrics", get(get_metrics))
            .layer(middleware)
            .with_state(state)
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %addr, "Location gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        info!("Location gateway stopped");
        Ok(())
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    ws: Arc<WebSocketHandler>,
    cache: Arc<LocationCache>,
    lifecycle: Arc<dyn TripLifecycleApi>,
    metrics: Arc<GatewayMetrics>,
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Query(mut params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if params.token.is_none() {
        params.token = bearer_token(&headers);
    }

    let handler = Arc::clone(&state.ws);
    ws.on_upgrade(move |socket| handler.handle(socket, params))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

async fn get_location(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<LocationSample>> {
    SubjectId::new(user_id)
        .ok()
        .and_then(|subject| state.cache.get(&subject))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No location"))
}

async fn patch_trip_status(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    body: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> ApiResult<Json<TripSnapshot>> {
    let result = advance(&state, trip_id, body).await;
    state.metrics.record_request(result.is_ok());
    result.map(Json)
}

async fn advance(
    state: &AppState,
    trip_id: String,
    body: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> ApiResult<TripSnapshot> {
    let Json(request) = body.map_err(|rejection| ApiError::invalid_request(rejection.body_text()))?;

    let trip_id = TripId::new(trip_id).map_err(|e| ApiError::invalid_request(e.to_string()))?;
    let status_id =
        StatusId::new(request.status_id).map_err(|e| ApiError::invalid_request(e.to_string()))?;
    let actor_id =
        ActorId::new(request.actor_id).map_err(|e| ApiError::invalid_request(e.to_string()))?;

    state
        .lifecycle
        .request_transition(&trip_id, &status_id, &actor_id)
        .await
        .map_err(|e| {
            if e.is_retryable() {
                warn!(trip_id = %trip_id, error = %e, "Trip status change failed");
            }
            ApiError::from(e)
        })
}

async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> ApiResult<Json<TripSnapshot>> {
    let trip_id = TripId::new(trip_id).map_err(|e| ApiError::invalid_request(e.to_string()))?;
    Ok(Json(state.lifecycle.trip(&trip_id).await?))
}

async fn get_trip_history(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> ApiResult<Json<Vec<TripStatusHistory>>> {
    let trip_id = TripId::new(trip_id).map_err(|e| ApiError::invalid_request(e.to_string()))?;
    Ok(Json(state.lifecycle.trip_history(&trip_id).await?))
}

async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
