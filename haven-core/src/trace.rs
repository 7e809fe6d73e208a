//! W3C trace-context propagation between services.
//!
//! A [`TraceContext`] carries the correlation id (trace id) shared by every
//! hop of one request plus the id of the current span and its parent. It is
//! written to and read from the `traceparent` header with the OpenTelemetry
//! `TraceContextPropagator`, so any W3C-compliant service can continue it.

use std::collections::HashMap;

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;

pub const TRACEPARENT_HEADER: &str = "traceparent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: TraceId,
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
}

impl TraceContext {
    /// Starts a new trace for a request that arrived without one.
    pub fn new_root() -> Self {
        Self {
            trace_id: random_trace_id(),
            span_id: random_span_id(),
            parent_span_id: None,
        }
    }

    /// A new span under the same trace, parented to this one.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: random_span_id(),
            parent_span_id: Some(self.span_id),
        }
    }

    /// Continues a trace from inbound headers. The remote span becomes the
    /// parent of a fresh local span. Returns `None` when no valid
    /// `traceparent` is present.
    pub fn from_headers(headers: &HashMap<String, String>) -> Option<Self> {
        let propagator = TraceContextPropagator::new();
        let cx = propagator.extract(headers);
        let span = cx.span();
        let remote = span.span_context();

        if !remote.is_valid() {
            return None;
        }

        Some(Self {
            trace_id: remote.trace_id(),
            span_id: random_span_id(),
            parent_span_id: Some(remote.span_id()),
        })
    }

    /// Writes `traceparent` for this span into outbound headers.
    pub fn inject(&self, headers: &mut HashMap<String, String>) {
        let span_context = SpanContext::new(
            self.trace_id,
            self.span_id,
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        let cx = Context::new().with_remote_span_context(span_context);
        TraceContextPropagator::new().inject_context(&cx, headers);
    }

    pub fn trace_id(&self) -> String {
        self.trace_id.to_string()
    }

    pub fn span_id(&self) -> String {
        self.span_id.to_string()
    }

    pub fn parent_span_id(&self) -> Option<String> {
        self.parent_span_id.map(|id| id.to_string())
    }
}

fn random_trace_id() -> TraceId {
    let mut bytes: [u8; 16] = rand::random();
    if bytes == [0; 16] {
        bytes[15] = 1;
    }
    TraceId::from_bytes(bytes)
}

fn random_span_id() -> SpanId {
    let mut bytes: [u8; 8] = rand::random();
    if bytes == [0; 8] {
        bytes[7] = 1;
    }
    SpanId::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_then_continue_keeps_trace_id() {
        let root = TraceContext::new_root();
        let mut headers = HashMap::new();
        root.inject(&mut headers);

        let header = headers.get(TRACEPARENT_HEADER).unwrap();
        assert!(header.starts_with("00-"));
        assert!(header.contains(&root.trace_id()));

        let continued = TraceContext::from_headers(&headers).unwrap();
        assert_eq!(continued.trace_id(), root.trace_id());
        assert_eq!(continued.parent_span_id(), Some(root.span_id()));
        assert_ne!(continued.span_id(), root.span_id());
    }

    #[test]
    fn test_missing_or_garbage_header_yields_none() {
        assert!(TraceContext::from_headers(&HashMap::new()).is_none());

        let mut headers = HashMap::new();
        headers.insert(TRACEPARENT_HEADER.to_string(), "not-a-trace".to_string());
        assert!(TraceContext::from_headers(&headers).is_none());
    }

    #[test]
    fn test_external_traceparent_is_parsed() {
        let mut headers = HashMap::new();
        headers.insert(
            TRACEPARENT_HEADER.to_string(),
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".to_string(),
        );

        let cx = TraceContext::from_headers(&headers).unwrap();
        assert_eq!(cx.trace_id(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(cx.parent_span_id().as_deref(), Some("00f067aa0ba902b7"));
    }

    #[test]
    fn test_child_shares_trace() {
        let root = TraceContext::new_root();
        let child = root.child();
        assert_eq!(child.trace_id(), root.trace_id());
        assert_eq!(child.parent_span_id(), Some(root.span_id()));
    }
}
