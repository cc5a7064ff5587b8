//! Outbound correlation for calls to the meditation backend and identity
//! provider.
//!
//! Every request built through [`TracedClientExt`] leaves with the W3C
//! `traceparent`/`tracestate` of the current span and the `x-request-id` of
//! the browser request that triggered it.

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use std::future::Future;
use std::time::Duration;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Run `future` with `request_id` attached to every outbound call it makes.
pub async fn with_request_id<F: Future>(request_id: String, future: F) -> F::Output {
    REQUEST_ID.scope(request_id, future).await
}

/// The correlation id of the request being served, if any.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Headers to attach to an outbound call made from the current span.
///
/// `traceparent` is only present when an OpenTelemetry context is active,
/// i.e. when the OTLP exporter is enabled.
pub fn outbound_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    if span_context.is_valid() {
        let traceparent = format!(
            "00-{}-{}-{:02x}",
            span_context.trace_id(),
            span_context.span_id(),
            span_context.trace_flags().to_u8()
        );
        if let Ok(value) = HeaderValue::from_str(&traceparent) {
            headers.insert(TRACEPARENT_HEADER, value);
        }

        let state = span_context.trace_state().header();
        if !state.is_empty()
            && let Ok(value) = HeaderValue::from_str(&state)
        {
            headers.insert(TRACESTATE_HEADER, value);
        }
    }

    if let Some(value) = current_request_id().and_then(|id| HeaderValue::from_str(&id).ok()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    headers
}

/// A reqwest builder whose correlation headers are added at send time.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
}

impl TracedRequest {
    fn map(self, f: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder) -> Self {
        Self {
            request: f(self.request),
        }
    }

    pub fn json<T: serde::Serialize + ?Sized>(self, body: &T) -> Self {
        self.map(|r| r.json(body))
    }

    pub fn form<T: serde::Serialize + ?Sized>(self, body: &T) -> Self {
        self.map(|r| r.form(body))
    }

    pub fn query<T: serde::Serialize + ?Sized>(self, query: &T) -> Self {
        self.map(|r| r.query(query))
    }

    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        self.map(|r| r.bearer_auth(token))
    }

    /// Per-call timeout; generation calls run far longer than lookups.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|r| r.timeout(timeout))
    }

    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        self.request.headers(outbound_headers()).send().await
    }
}

pub trait TracedClientExt {
    fn traced_get(&self, url: &str) -> TracedRequest;
    fn traced_post(&self, url: &str) -> TracedRequest;
    fn traced_delete(&self, url: &str) -> TracedRequest;
}

impl TracedClientExt for reqwest::Client {
    fn traced_get(&self, url: &str) -> TracedRequest {
        TracedRequest {
            request: self.get(url),
        }
    }

    fn traced_post(&self, url: &str) -> TracedRequest {
        TracedRequest {
            request: self.post(url),
        }
    }

    fn traced_delete(&self, url: &str) -> TracedRequest {
        TracedRequest {
            request: self.delete(url),
        }
    }
}
