//! Request tracing middleware.
//!
//! Each HTTP request runs inside a `gateway_request` span tagged with the
//! route family it hit. Socket upgrades get a span too, but it closes when
//! the 101 response goes out; session logs carry their own `connection_id`.

use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{debug, info_span, Instrument, Span};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

/// Coarse route family, stable across path parameters.
pub fn route_family(path: &str) -> &'static str {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("ws"), None, _) => "socket",
        (Some("location"), Some(_), None) => "location",
        (Some("trips"), Some(_), Some("status")) => "trip_status",
        (Some("trips"), Some(_), _) => "trip_read",
        (Some("health"), None, _) | (Some("metrics"), None, _) => "ops",
        _ => "other",
    }
}

/// W3C `traceparent` fields we keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceParent {
    pub trace_id: String,
    pub parent_id: String,
}

impl TraceParent {
    /// Parse `version-trace_id-parent_id-flags`; ids must be lowercase hex of
    /// the W3C lengths and not all zero.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let (_version, trace_id, parent_id, _flags) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        let valid = |id: &str, len: usize| {
            id.len() == len
                && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
                && id.bytes().any(|b| b != b'0')
        };
        if !valid(trace_id, 32) || !valid(parent_id, 16) {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            parent_id: parent_id.to_string(),
        })
    }
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let parent = req
            .headers()
            .get("traceparent")
            .and_then(|v| v.to_str().ok())
            .and_then(TraceParent::parse);

        let span = info_span!(
            "gateway_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            route = route_family(req.uri().path()),
            trace_id = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        );
        if let Some(parent) = &parent {
            span.record("trace_id", parent.trace_id.as_str());
        }

        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(req).await;
                let current = Span::current();

                match &result {
                    Ok(response) => {
                        let status = response.status();
                        current.record("http.status_code", status.as_u16());
                        // 4xx is a rejected command, not a gateway fault.
                        current.record(
                            "otel.status_code",
                            if status.is_server_error() { "ERROR" } else { "OK" },
                        );
                        debug!(
                            status = status.as_u16(),
                            elapsed_us = started.elapsed().as_micros() as u64,
                            "Request finished"
                        );
                    }
                    Err(_) => {
                        current.record("otel.status_code", "ERROR");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
