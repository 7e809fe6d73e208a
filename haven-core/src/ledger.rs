use async_trait::async_trait;

use crate::model::StayRange;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger backend error: {0}")]
    Backend(String),

    #[error("Invalid price {0}")]
    InvalidPrice(f64),
}

/// Per-accommodation calendar of booked nights and nightly prices.
///
/// Implementations serialize mutations per accommodation: `try_book` is the
/// compare-and-set the reservation workflow relies on to rule out double
/// booking.
#[async_trait]
pub trait AvailabilityLedger: Send + Sync {
    /// True iff no night in the stay is marked booked.
    async fn is_available(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError>;

    /// Atomically check and book. Returns `false` without changing anything
    /// if any night is already booked.
    async fn try_book(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError>;

    /// Mark every night booked. Booking an already booked range is a no-op.
    async fn book(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError>;

    /// Mark every night free.
    async fn release(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError>;

    async fn set_price(&self, accommodation_id: &str, stay: &StayRange, price: f64) -> Result<(), LedgerError>;

    /// Total price of the stay, or `None` if any night has no price.
    async fn quote(&self, accommodation_id: &str, stay: &StayRange) -> Result<Option<f64>, LedgerError>;
}
