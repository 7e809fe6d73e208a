use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use haven_booking::ReservationError;
use serde_json::{json, Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
        AppError::BadRequest("Invalid request body. Check the request format.".to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected path");
        AppError::BadRequest("Invalid path parameter.".to_string())
    }
}

/// HTTP status for a workflow outcome. Post-commit failures take the status
/// of the step that failed.
pub fn status_for(err: &ReservationError) -> StatusCode {
    match err {
        ReservationError::Unauthorized => StatusCode::UNAUTHORIZED,
        ReservationError::Forbidden(_) => StatusCode::FORBIDDEN,
        ReservationError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        ReservationError::NotFound(_) => StatusCode::NOT_FOUND,
        ReservationError::Conflict(_)
        | ReservationError::Unavailable(_)
        | ReservationError::AlreadyCanceled(_) => StatusCode::CONFLICT,
        ReservationError::ServiceUnavailable { .. } | ReservationError::CircuitOpen { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ReservationError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReservationError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ReservationError::AfterCommit { source, .. } => status_for(source),
    }
}

fn reservation_body(err: &ReservationError) -> Map<String, Value> {
    let mut body = Map::new();
    match err {
        ReservationError::ValidationFailed(fields) => {
            body.insert("error".into(), json!(err.to_string()));
            body.insert("details".into(), json!(fields));
        }
        ReservationError::AfterCommit {
            reservation_id,
            source,
        } => {
            body = reservation_body(source);
            body.insert("reservationId".into(), json!(reservation_id));
        }
        other => {
            body.insert("error".into(), json!(other.to_string()));
        }
    }
    body
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Reservation(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!(kind = err.kind(), "Request failed: {}", err);
                } else {
                    tracing::debug!(kind = err.kind(), "Request rejected: {}", err);
                }
                (status, Value::Object(reservation_body(&err)))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}
