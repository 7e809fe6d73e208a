use std::collections::BTreeMap;

use haven_core::{GatewayError, LedgerError, StoreError};
use uuid::Uuid;

/// Everything a reservation workflow can end with, short of success.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Unauthorized.")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation failed")]
    ValidationFailed(BTreeMap<String, String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{}", service_message(.dependency, .timed_out))]
    ServiceUnavailable { dependency: String, timed_out: bool },

    #[error("{} service is temporarily disabled after repeated failures.", service_label(.dependency))]
    CircuitOpen { dependency: String },

    #[error("Reservation {0} is already canceled.")]
    AlreadyCanceled(Uuid),

    #[error("{0}")]
    InvariantViolation(String),

    #[error("{0}")]
    InternalError(String),

    /// The reservation was stored but a later step failed.
    #[error("Reservation {reservation_id} was saved, but a follow-up step failed: {source}")]
    AfterCommit {
        reservation_id: Uuid,
        source: Box<ReservationError>,
    },
}

pub fn service_label(dependency: &str) -> &str {
    match dependency {
        "auth" => "Authorization",
        "accommodation" => "Accommodation",
        "notification" => "Notification",
        "rating" => "Rating",
        other => other,
    }
}

fn service_message(dependency: &str, timed_out: &bool) -> String {
    if *timed_out {
        format!("{} service did not respond in time.", service_label(dependency))
    } else {
        format!("{} service is not available.", service_label(dependency))
    }
}

impl ReservationError {
    pub fn validation(field: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), message.to_string());
        ReservationError::ValidationFailed(fields)
    }

    /// Classify a dependency failure that is not a business answer.
    /// Explicit rejections are mapped by the calling step, which knows what
    /// a "no" from that dependency means.
    pub fn from_dependency(err: GatewayError) -> Self {
        match err {
            GatewayError::DeadlineExceeded { dependency } => ReservationError::ServiceUnavailable {
                dependency,
                timed_out: true,
            },
            GatewayError::CircuitOpen { dependency } => ReservationError::CircuitOpen { dependency },
            GatewayError::Unavailable { dependency, .. } | GatewayError::Rejected { dependency, .. } => {
                ReservationError::ServiceUnavailable {
                    dependency,
                    timed_out: false,
                }
            }
            GatewayError::Decode { dependency, reason } => {
                tracing::error!(dependency = %dependency, reason = %reason, "Undecodable dependency payload");
                ReservationError::InternalError(format!(
                    "Unexpected response from {} service.",
                    service_label(&dependency)
                ))
            }
        }
    }

    pub fn after_commit(reservation_id: Uuid, source: ReservationError) -> Self {
        ReservationError::AfterCommit {
            reservation_id,
            source: Box::new(source),
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReservationError::Unauthorized => "unauthorized",
            ReservationError::Forbidden(_) => "forbidden",
            ReservationError::ValidationFailed(_) => "validation_failed",
            ReservationError::NotFound(_) => "not_found",
            ReservationError::Conflict(_) => "conflict",
            ReservationError::Unavailable(_) => "unavailable",
            ReservationError::ServiceUnavailable { .. } => "service_unavailable",
            ReservationError::CircuitOpen { .. } => "circuit_open",
            ReservationError::AlreadyCanceled(_) => "already_canceled",
            ReservationError::InvariantViolation(_) => "invariant_violation",
            ReservationError::InternalError(_) => "internal_error",
            ReservationError::AfterCommit { .. } => "after_commit",
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => ReservationError::Conflict(
                "Cannot reserve. Please double check if you already reserved exactly the accommodation and check in date."
                    .to_string(),
            ),
            StoreError::NotFound(_) => ReservationError::NotFound("Reservation not found.".to_string()),
            StoreError::AlreadyCanceled(id) => ReservationError::AlreadyCanceled(id),
            StoreError::CancellationClosed { .. } => ReservationError::InvariantViolation(
                "Cannot cancel reservation, check-in date has already started.".to_string(),
            ),
            StoreError::Backend(reason) => {
                tracing::error!(reason = %reason, "Reservation store failure");
                ReservationError::InternalError("Reservation store is not available.".to_string())
            }
        }
    }
}

impl From<LedgerError> for ReservationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidPrice(price) => {
                ReservationError::validation("price", &format!("Invalid price {}.", price))
            }
            LedgerError::Backend(reason) => {
                tracing::error!(reason = %reason, "Availability ledger failure");
                ReservationError::InternalError("Availability ledger is not available.".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_and_outage_read_differently() {
        let slow = ReservationError::from_dependency(GatewayError::DeadlineExceeded {
            dependency: "auth".into(),
        });
        let down = ReservationError::from_dependency(GatewayError::Unavailable {
            dependency: "auth".into(),
            reason: "refused".into(),
        });
        let open = ReservationError::from_dependency(GatewayError::CircuitOpen {
            dependency: "auth".into(),
        });

        assert_eq!(slow.to_string(), "Authorization service did not respond in time.");
        assert_eq!(down.to_string(), "Authorization service is not available.");
        assert_eq!(open.kind(), "circuit_open");
    }

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        let id = Uuid::now_v7();
        assert!(matches!(
            ReservationError::from(StoreError::AlreadyCanceled(id)),
            ReservationError::AlreadyCanceled(x) if x == id
        ));
        assert_eq!(
            ReservationError::from(StoreError::CancellationClosed {
                reservation_id: id,
                check_in: "2026-05-01".parse().unwrap(),
            })
            .kind(),
            "invariant_violation"
        );
    }
}
