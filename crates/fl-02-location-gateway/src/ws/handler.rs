//! WebSocket session handling for producers and subscribers.
//!
//! Every socket is upgraded first and judged afterwards, so a rejected
//! handshake still gets a proper close frame (1008) instead of a bare HTTP
//! error.
//!
//! Security features:
//! - Producer tokens validated against the claimed subject
//! - Message size limit (1009 on violation)
//! - Rate limiting per producer connection
//! - Idle timeout with server pings

use crate::domain::config::WebSocketConfig;
use crate::domain::error::HandshakeRejection;
use crate::domain::token::TokenValidator;
use crate::middleware::GatewayMetrics;
use crate::ws::broadcaster::Broadcaster;
use crate::ws::registry::{ProducerHandle, SubscriberHandle};
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::StreamExt;
use serde::Deserialize;
use shared_types::{ConnectionId, LocationSample, SubjectId};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Query parameters of `GET /ws`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub token: Option<String>,
}

/// Accepted handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    Produce(SubjectId),
    Subscribe(SubjectId),
}

/// Close code and reason sent when the server ends a session.
type Closing = (u16, &'static str);

/// Fixed one-second window counter, reset lazily.
#[derive(Debug)]
struct RateWindow {
    limit: u32,
    count: u32,
    window_start: Instant,
}

impl RateWindow {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Check rate limit, returns true if the frame is allowed
    fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            self.window_start = now;
            self.count = 0;
        }

        self.count += 1;
        self.count <= self.limit
    }
}

/// Shared state for all sessions
pub struct WebSocketHandler {
    broadcaster: Arc<Broadcaster>,
    validator: Arc<TokenValidator>,
    config: WebSocketConfig,
    metrics: Arc<GatewayMetrics>,
}

impl WebSocketHandler {
    pub fn new(
        broadcaster: Arc<Broadcaster>,
        validator: Arc<TokenValidator>,
        config: WebSocketConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            broadcaster,
            validator,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    /// Decide what the connection is allowed to be.
    pub fn authorize(&self, params: &ConnectParams) -> Result<SessionRequest, HandshakeRejection> {
        let subject = params
            .user_id
            .as_deref()
            .and_then(|id| SubjectId::new(id).ok())
            .ok_or(HandshakeRejection::PolicyViolation("missing userId"))?;

        match params.action.as_deref() {
            Some("send") => {
                let token = params
                    .token
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or(HandshakeRejection::Unauthorized)?;
                self.validator
                    .validate(token, &subject)
                    .map_err(|_| HandshakeRejection::Unauthorized)?;
                Ok(SessionRequest::Produce(subject))
            }
            Some("subscribe") => Ok(SessionRequest::Subscribe(subject)),
            Some(_) => Err(HandshakeRejection::PolicyViolation("unknown action")),
            None => Err(HandshakeRejection::PolicyViolation("missing action")),
        }
    }

    /// Run one upgraded socket to completion.
    pub async fn handle(self: Arc<Self>, mut socket: WebSocket, params: ConnectParams) {
        match self.authorize(&params) {
            Ok(SessionRequest::Produce(subject)) => self.run_producer(socket, subject).await,
            Ok(SessionRequest::Subscribe(subject)) => self.run_subscriber(socket, subject).await,
            Err(rejection) => {
                self.metrics.record_handshake_rejected();
                warn!(
                    user_id = params.user_id.as_deref().unwrap_or(""),
                    action = params.action.as_deref().unwrap_or(""),
                    reason = rejection.reason(),
                    "Rejected WebSocket handshake"
                );
                close(&mut socket, (close_code::POLICY, rejection.reason())).await;
            }
        }
    }

    async fn run_producer(&self, mut socket: WebSocket, subject: SubjectId) {
        let connection_id = ConnectionId::new();
        let registry = self.broadcaster.registry();

        let (handle, mut displaced) = ProducerHandle::new(connection_id);
        if let Some(previous) = registry.register_producer(subject.clone(), handle) {
            self.metrics.record_producer_replaced();
            info!(
                subject_id = %subject,
                connection_id = %connection_id,
                previous = %previous.connection_id(),
                "Producer reconnected, closing previous connection"
            );
            previous.displace();
        }
        self.metrics.record_producer_connect();
        info!(subject_id = %subject, connection_id = %connection_id, "Producer connected");

        let mut rate = RateWindow::new(self.config.rate_limit);
        let mut ping = interval_at(
            Instant::now() + self.config.ping_interval,
            self.config.ping_interval,
        );
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_activity = Instant::now();

        let closing: Option<Closing> = loop {
            tokio::select! {
                _ = &mut displaced => break Some((close_code::POLICY, "replaced")),
                _ = ping.tick() => {
                    if last_activity.elapsed() > self.config.idle_timeout {
                        info!(subject_id = %subject, connection_id = %connection_id, "Closing idle producer");
                        break Some((close_code::NORMAL, "idle timeout"));
                    }
                    if socket.send(Message::Ping(Vec::new())).await.is_err() {
                        break None;
                    }
                }
                incoming = socket.next() => {
                    let Some(incoming) = incoming else { break None };
                    last_activity = Instant::now();

                    match incoming {
                        Ok(Message::Text(text)) => {
                            if text.len() > self.config.max_message_size {
                                warn!(subject_id = %subject, size = text.len(), max = self.config.max_message_size, "Message exceeds size limit");
                                break Some((close_code::SIZE, "message too large"));
                            }
                            self.accept_frame(&subject, &text, &mut rate);
                        }
                        Ok(Message::Binary(data)) => {
                            if data.len() > self.config.max_message_size {
                                warn!(subject_id = %subject, size = data.len(), max = self.config.max_message_size, "Message exceeds size limit");
                                break Some((close_code::SIZE, "message too large"));
                            }
                            match std::str::from_utf8(&data) {
                                Ok(text) => self.accept_frame(&subject, text, &mut rate),
                                Err(_) => {
                                    self.metrics.record_sample_dropped();
                                    warn!(subject_id = %subject, "Dropping non-UTF-8 frame");
                                }
                            }
                        }
                        // Pongs to client pings are sent by the protocol layer.
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                        Ok(Message::Close(_)) => {
                            debug!(connection_id = %connection_id, "WebSocket close received");
                            break None;
                        }
                        Err(e) => {
                            warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                            break None;
                        }
                    }
                }
            }
        };

        // A displaced session must not remove its successor.
        registry.remove_producer(&subject, connection_id);
        self.metrics.record_producer_disconnect();

        if let Some(closing) = closing {
            close(&mut socket, closing).await;
        }
        info!(subject_id = %subject, connection_id = %connection_id, "Producer disconnected");
    }

    fn accept_frame(&self, subject: &SubjectId, text: &str, rate: &mut RateWindow) {
        if !rate.allow() {
            self.metrics.record_sample_dropped();
            warn!(subject_id = %subject, limit = rate.limit, "Producer over rate limit, dropping frame");
            return;
        }

        match LocationSample::from_frame(text) {
            Ok(sample) => {
                self.broadcaster.on_sample(subject, sample);
            }
            Err(e) => {
                self.metrics.record_sample_dropped();
                warn!(subject_id = %subject, error = %e, "Dropping invalid location frame");
            }
        }
    }

    async fn run_subscriber(&self, mut socket: WebSocket, subject: SubjectId) {
        let connection_id = ConnectionId::new();
        let registry = self.broadcaster.registry();

        let (handle, mut outbound) =
            SubscriberHandle::new(connection_id, self.config.subscriber_buffer);
        registry.register_subscriber(subject.clone(), handle);
        self.metrics.record_subscriber_connect();
        info!(subject_id = %subject, connection_id = %connection_id, "Subscriber connected");

        let mut closing: Option<Closing> = None;

        if self.config.replay_cached_on_subscribe {
            if let Some(sample) = self.broadcaster.cache().get(&subject) {
                if socket.send(Message::Text(sample.to_frame())).await.is_err() {
                    closing = Some((close_code::AWAY, "send failed"));
                }
            }
        }

        let mut ping = interval_at(
            Instant::now() + self.config.ping_interval,
            self.config.ping_interval,
        );
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_activity = Instant::now();

        if closing.is_none() {
            closing = loop {
                tokio::select! {
                    frame = outbound.recv() => match frame {
                        Some(frame) => {
                            if let Err(e) = socket.send(Message::Text(frame.to_string())).await {
                                debug!(connection_id = %connection_id, error = %e, "Failed to push sample");
                                break None;
                            }
                        }
                        // Every sender is gone: the broadcaster evicted us.
                        None => break Some((close_code::AGAIN, "subscriber too slow")),
                    },
                    _ = ping.tick() => {
                        if last_activity.elapsed() > self.config.idle_timeout {
                            info!(subject_id = %subject, connection_id = %connection_id, "Closing idle subscriber");
                            break Some((close_code::NORMAL, "idle timeout"));
                        }
                        if socket.send(Message::Ping(Vec::new())).await.is_err() {
                            break None;
                        }
                    }
                    incoming = socket.next() => {
                        match incoming {
                            None | Some(Ok(Message::Close(_))) => break None,
                            Some(Err(e)) => {
                                warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                                break None;
                            }
                            Some(Ok(_)) => {
                                // Subscribers are read-only; inbound traffic only counts as liveness.
                                last_activity = Instant::now();
                            }
                        }
                    }
                }
            };
        }

        registry.remove_connection(connection_id);
        self.metrics.record_subscriber_disconnect();

        if let Some(closing) = closing {
            close(&mut socket, closing).await;
        }
        info!(subject_id = %subject, connection_id = %connection_id, "Subscriber disconnected");
    }
}

async fn close(socket: &mut WebSocket, (code, reason): Closing) {
    let frame = CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Failed to send close frame");
    }
}
