use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::model::{AccommodationSummary, Reservation};

/// Failure of a call to a remote collaborator, already classified so the
/// workflows can tell "slow" from "down" from "said no".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("{dependency} rejected the request with status {status}: {message}")]
    Rejected {
        dependency: String,
        status: u16,
        message: String,
    },

    #[error("{dependency} did not answer before the deadline")]
    DeadlineExceeded { dependency: String },

    #[error("circuit breaker for {dependency} is open")]
    CircuitOpen { dependency: String },

    #[error("{dependency} is unavailable: {reason}")]
    Unavailable { dependency: String, reason: String },

    #[error("{dependency} returned an unreadable payload: {reason}")]
    Decode { dependency: String, reason: String },
}

impl GatewayError {
    pub fn dependency(&self) -> &str {
        match self {
            GatewayError::Rejected { dependency, .. }
            | GatewayError::DeadlineExceeded { dependency }
            | GatewayError::CircuitOpen { dependency }
            | GatewayError::Unavailable { dependency, .. }
            | GatewayError::Decode { dependency, .. } => dependency,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Rejected { status: 404, .. })
    }
}

/// Body of `POST /notifications/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostNotification {
    pub host_id: String,
    pub host_email: String,
    pub notification_text: String,
}

impl HostNotification {
    pub fn new_reservation(host_id: &str, host_email: &str, host_name: &str, accommodation: &str, guest: &str) -> Self {
        Self {
            host_id: host_id.to_string(),
            host_email: host_email.to_string(),
            notification_text: format!(
                "Dear {}, you have a new reservation! Your {} has been reserved by {}.",
                host_name, accommodation, guest
            ),
        }
    }

    pub fn cancellation(host_id: &str, host_email: &str, host_name: &str, accommodation: &str, guest: &str) -> Self {
        Self {
            host_id: host_id.to_string(),
            host_email: host_email.to_string(),
            notification_text: format!(
                "Dear {}, reservation for your {} has been canceled by {}.",
                host_name, accommodation, guest
            ),
        }
    }
}

#[async_trait]
pub trait AccommodationGateway: Send + Sync {
    async fn accommodation(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        accommodation_id: &str,
    ) -> Result<AccommodationSummary, GatewayError>;
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify_host(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        notification: &HostNotification,
    ) -> Result<(), GatewayError>;
}

/// Rating-eligibility bookkeeping kept by the rating service.
#[async_trait]
pub trait RatingGateway: Send + Sync {
    /// `POST /rating/createReservation` with the full record.
    async fn register_stay(
        &self,
        ctx: &RequestContext,
        reservation: &Reservation,
    ) -> Result<(), GatewayError>;

    /// `DELETE /rating/deleteReservation` for `(accommodationId, guestId)`.
    async fn drop_stay(
        &self,
        ctx: &RequestContext,
        accommodation_id: &str,
        guest_id: &str,
    ) -> Result<(), GatewayError>;
}
