use async_trait::async_trait;
use chrono::NaiveDate;
use haven_shared::ReservationEvent;
use uuid::Uuid;

use crate::model::Reservation;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Guest {guest_id} already has a reservation for accommodation {accommodation_id} starting {check_in}")]
    Duplicate {
        guest_id: String,
        accommodation_id: String,
        check_in: NaiveDate,
    },

    #[error("Reservation {0} not found")]
    NotFound(Uuid),

    #[error("Reservation {0} is already canceled")]
    AlreadyCanceled(Uuid),

    #[error("Cannot cancel reservation {reservation_id}, check-in date {check_in} has already started")]
    CancellationClosed {
        reservation_id: Uuid,
        check_in: NaiveDate,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable reservation records, keyed by `(guest_id, reservation_id)`.
///
/// Aggregate queries return `Err` when the backend fails, so a failed scan is
/// never confused with a host that legitimately has zero reservations.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Duplicate`] if an active
    /// reservation already holds the same `(guest, accommodation, check-in)`.
    async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError>;

    async fn has_active(
        &self,
        guest_id: &str,
        accommodation_id: &str,
        check_in: NaiveDate,
    ) -> Result<bool, StoreError>;

    async fn find(&self, guest_id: &str, reservation_id: Uuid) -> Result<Reservation, StoreError>;

    /// Flip `is_canceled`. Irreversible; rejected once `today` has reached
    /// the check-in day.
    async fn cancel(
        &self,
        guest_id: &str,
        reservation_id: Uuid,
        today: NaiveDate,
    ) -> Result<Reservation, StoreError>;

    async fn list_active(&self, guest_id: &str) -> Result<Vec<Reservation>, StoreError>;

    async fn count_active_by_host(&self, host_id: &str) -> Result<u64, StoreError>;

    /// Cancelled share of all the host's reservations, in percent.
    async fn cancelled_ratio(&self, host_id: &str) -> Result<f64, StoreError>;

    /// Sum of nights over the host's active reservations.
    async fn total_stay_duration_days(&self, host_id: &str) -> Result<i64, StoreError>;

    /// Active reservations whose check-out is still ahead of `today`.
    async fn count_upcoming_by_accommodation(
        &self,
        accommodation_id: &str,
        today: NaiveDate,
    ) -> Result<u64, StoreError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: &ReservationEvent) -> Result<(), StoreError>;
}
