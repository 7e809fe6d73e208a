//! Outbound calls to the collaborating services.
//!
//! Every call runs inside one circuit breaker per dependency name, which
//! wraps a retry loop, which in turn runs under the caller's deadline.

pub mod circuit_breaker;
pub mod client;
pub mod gateways;
pub mod metrics;
pub mod retry;

pub use circuit_breaker::{BreakerConfig, BreakerError, BreakerRegistry, CircuitBreaker, CircuitState};
pub use client::{ClientError, ClientSettings, ResilientClient, ServiceResponse};
pub use gateways::{HttpServices, ServiceEndpoints};
pub use metrics::ClientMetrics;
pub use retry::{retry_with_backoff, RetryPolicy};
