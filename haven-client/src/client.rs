use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use haven_core::{GatewayError, RequestContext};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::Instrument;

use crate::circuit_breaker::{BreakerError, BreakerRegistry};
use crate::metrics::ClientMetrics;
use crate::retry::{retry_with_backoff, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("{dependency}: deadline exceeded")]
    DeadlineExceeded { dependency: String },

    #[error("{dependency}: circuit open")]
    CircuitOpen { dependency: String },

    #[error("{dependency}: transport error: {reason}")]
    Transport { dependency: String, reason: String },

    #[error("{dependency}: upstream answered {status}")]
    Upstream { dependency: String, status: u16 },

    #[error("{dependency}: could not build request: {reason}")]
    InvalidRequest { dependency: String, reason: String },
}

impl ClientError {
    /// Connection problems and 5xx answers are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport { .. } | ClientError::Upstream { .. })
    }
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::DeadlineExceeded { dependency } => GatewayError::DeadlineExceeded { dependency },
            ClientError::CircuitOpen { dependency } => GatewayError::CircuitOpen { dependency },
            ClientError::Transport { dependency, reason }
            | ClientError::InvalidRequest { dependency, reason } => {
                GatewayError::Unavailable { dependency, reason }
            }
            ClientError::Upstream { dependency, status } => GatewayError::Unavailable {
                dependency,
                reason: format!("status {}", status),
            },
        }
    }
}

/// A completed exchange with a status below 500.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub dependency: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_slice(&self.body).map_err(|e| GatewayError::Decode {
            dependency: self.dependency.clone(),
            reason: e.to_string(),
        })
    }

    /// Turn a non-2xx answer into [`GatewayError::Rejected`].
    pub fn expect_status(self, expected: u16) -> Result<Self, GatewayError> {
        if self.status == expected {
            return Ok(self);
        }
        Err(self.rejected())
    }

    pub fn expect_success(self) -> Result<Self, GatewayError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(self.rejected())
    }

    fn rejected(&self) -> GatewayError {
        let message = serde_json::from_slice::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| String::from_utf8_lossy(&self.body).into_owned());
        GatewayError::Rejected {
            dependency: self.dependency.clone(),
            status: self.status,
            message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Upper bound for one logical call, retries included.
    pub call_timeout: Duration,
    pub connect_timeout: Duration,
    /// Skip certificate verification for the internal mesh.
    pub accept_invalid_certs: bool,
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            accept_invalid_certs: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP client shared by all gateways: breaker, then deadline, then retry.
pub struct ResilientClient {
    http: reqwest::Client,
    settings: ClientSettings,
    breakers: Arc<BreakerRegistry>,
    metrics: Option<ClientMetrics>,
}

impl ResilientClient {
    pub fn new(settings: ClientSettings, breakers: Arc<BreakerRegistry>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;
        Ok(Self {
            http,
            settings,
            breakers,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: ClientMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub async fn call(
        &self,
        ctx: &RequestContext,
        dependency: &str,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> Result<ServiceResponse, ClientError> {
        let deadline = ctx.deadline.min(Instant::now() + self.settings.call_timeout);
        let span = tracing::info_span!(
            "outbound",
            dependency,
            method = %method,
            trace_id = %ctx.trace.trace_id()
        );

        let breaker = self.breakers.get(dependency);
        let outcome = breaker
            .execute(|| async {
                if Instant::now() >= deadline {
                    return Err(ClientError::DeadlineExceeded {
                        dependency: dependency.to_string(),
                    });
                }
                let attempts = retry_with_backoff(&self.settings.retry, ClientError::is_transient, |attempt| {
                    self.attempt(ctx, dependency, method.clone(), url, bearer, body, attempt)
                });
                match tokio::time::timeout_at(deadline, attempts).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(dependency, "Deadline exceeded");
                        Err(ClientError::DeadlineExceeded {
                            dependency: dependency.to_string(),
                        })
                    }
                }
            })
            .instrument(span)
            .await;

        match outcome {
            Ok(response) => Ok(response),
            Err(BreakerError::Open) => {
                tracing::warn!(dependency, "Circuit open, failing fast");
                Err(ClientError::CircuitOpen {
                    dependency: dependency.to_string(),
                })
            }
            Err(BreakerError::Inner(err)) => Err(err),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn attempt(
        &self,
        ctx: &RequestContext,
        dependency: &str,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<&serde_json::Value>,
        attempt: u32,
    ) -> Result<ServiceResponse, ClientError> {
        let mut propagation = HashMap::new();
        ctx.trace.child().inject(&mut propagation);

        let mut request = self.http.request(method, url);
        for (name, value) in &propagation {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(bearer) = bearer {
            request = request.header(AUTHORIZATION, bearer);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(dependency, attempt, url, "Sending request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                self.count(dependency, "transport_error");
                if err.is_builder() {
                    return Err(ClientError::InvalidRequest {
                        dependency: dependency.to_string(),
                        reason: err.to_string(),
                    });
                }
                return Err(ClientError::Transport {
                    dependency: dependency.to_string(),
                    reason: err.to_string(),
                });
            }
        };

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|err| {
            self.count(dependency, "transport_error");
            ClientError::Transport {
                dependency: dependency.to_string(),
                reason: err.to_string(),
            }
        })?;

        if status >= 500 {
            self.count(dependency, "upstream_error");
            return Err(ClientError::Upstream {
                dependency: dependency.to_string(),
                status,
            });
        }
        self.count(dependency, if status < 400 { "ok" } else { "rejected" });

        Ok(ServiceResponse {
            dependency: dependency.to_string(),
            status,
            body: body.to_vec(),
        })
    }

    fn count(&self, dependency: &str, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_attempt(dependency, outcome);
        }
    }
}
