use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use haven_core::{RequestContext, TraceContext};

use crate::state::AppState;

/// Echoed on every response so callers can find the request in the logs.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Trace continued (or started) for the current request.
#[derive(Debug, Clone, Copy)]
pub struct InboundTrace(pub TraceContext);

pub async fn trace_context_middleware(mut req: Request, next: Next) -> Response {
    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let trace = TraceContext::from_headers(&headers).unwrap_or_else(TraceContext::new_root);
    let trace_id = trace.trace_id();
    tracing::debug!(trace_id = %trace_id, path = %req.uri().path(), "Inbound request");
    req.extensions_mut().insert(InboundTrace(trace));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

/// The caller as the workflows see it: a request context with this
/// request's deadline, and the raw `Authorization` value forwarded to the
/// auth service untouched. A missing header becomes an empty bearer, which
/// the workflows answer with 401 without calling out.
pub struct Caller {
    pub ctx: RequestContext,
    pub bearer: String,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let trace = parts
            .extensions
            .get::<InboundTrace>()
            .map(|t| t.0)
            .unwrap_or_else(TraceContext::new_root);
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            ctx: RequestContext::new(trace, state.request_budget),
            bearer,
        })
    }
}
