//! Host statistics. No authentication; each answers with a bare JSON number.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservations/host/{host_id}/total", get(total_reservations))
        .route(
            "/reservations/host/{host_id}/cancelled-percentage",
            get(cancelled_percentage),
        )
        .route("/reservations/host/{host_id}/total-duration", get(total_duration))
}

async fn total_reservations(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<Json<u64>, AppError> {
    Ok(Json(state.orchestrator.host_total(&host_id).await?))
}

async fn cancelled_percentage(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<Json<f64>, AppError> {
    Ok(Json(state.orchestrator.host_cancelled_percentage(&host_id).await?))
}

async fn total_duration(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<Json<i64>, AppError> {
    Ok(Json(state.orchestrator.host_total_duration(&host_id).await?))
}
