use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use haven_booking::{CheckAvailabilityRequest, CreateOutcome, CreateReservationRequest, SetPriceRequest};
use haven_core::Reservation;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", post(create_reservation).get(list_reservations))
        .route("/reservations/{id}", delete(cancel_reservation))
        .route(
            "/reservations/accommodation/{accommodation_id}/upcoming",
            get(upcoming_reservations),
        )
        .route(
            "/reservations/availability/{accommodation_id}",
            post(check_availability),
        )
        .route("/availability/{accommodation_id}/prices", put(set_prices))
}

async fn create_reservation(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOutcome>), AppError> {
    let Json(req) = payload?;
    let outcome = state.orchestrator.create(&caller.ctx, &caller.bearer, req).await?;
    tracing::info!(reservation_id = %outcome.reservation.reservation_id, "Reservation created");
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn list_reservations(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let reservations = state.orchestrator.list_active(&caller.ctx, &caller.bearer).await?;
    Ok(Json(reservations))
}

/// 204 when every step went through; 200 with the warnings otherwise.
async fn cancel_reservation(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(reservation_id) = path?;
    let outcome = state
        .orchestrator
        .cancel(&caller.ctx, &caller.bearer, reservation_id)
        .await?;

    if outcome.warnings.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    tracing::warn!(%reservation_id, warnings = ?outcome.warnings, "Reservation canceled with warnings");
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Reservation canceled.",
            "reservationId": reservation_id,
            "warnings": outcome.warnings,
        })),
    )
        .into_response())
}

async fn upcoming_reservations(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Path(accommodation_id) = path?;
    let number = state
        .orchestrator
        .upcoming_count(&caller.ctx, &caller.bearer, &accommodation_id)
        .await?;
    Ok(Json(json!({ "number": number })))
}

async fn check_availability(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<CheckAvailabilityRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Path(accommodation_id) = path?;
    let Json(req) = payload?;
    state.orchestrator.check_availability(&accommodation_id, req).await?;
    Ok(Json(json!({
        "message": "Accommodation is available for the specified dates."
    })))
}

async fn set_prices(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<SetPriceRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Path(accommodation_id) = path?;
    let Json(req) = payload?;
    state
        .orchestrator
        .set_prices(&caller.ctx, &caller.bearer, &accommodation_id, req)
        .await?;
    Ok(Json(json!({ "message": "Prices updated." })))
}
