use chrono::NaiveDate;
use haven_core::model::flexible_date;
use haven_core::Reservation;
use serde::{Deserialize, Serialize};

/// Body of `POST /reservations`. Every field is optional here so missing
/// values surface as field-level validation errors, not decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[serde(default, alias = "accommodation_id")]
    pub accommodation_id: Option<String>,
    #[serde(default, alias = "check_in_date", deserialize_with = "flexible_date::deserialize_option")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(default, alias = "check_out_date", deserialize_with = "flexible_date::deserialize_option")]
    pub check_out_date: Option<NaiveDate>,
    /// Kept raw so `2.5` or `"two"` are reported as a validation error.
    #[serde(default, alias = "number_of_guests")]
    pub number_of_guests: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityRequest {
    #[serde(default, deserialize_with = "flexible_date::deserialize_option")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date::deserialize_option")]
    pub check_out_date: Option<NaiveDate>,
}

/// Body of `PUT /availability/{accommodationId}/prices`: one price for
/// every night in `[startDate, endDate)`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceRequest {
    #[serde(default, deserialize_with = "flexible_date::deserialize_option")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date::deserialize_option")]
    pub end_date: Option<NaiveDate>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutcome {
    #[serde(flatten)]
    pub reservation: Reservation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
}

/// A committed cancellation plus whatever best-effort steps did not go through.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub reservation: Reservation,
    pub warnings: Vec<String>,
}
