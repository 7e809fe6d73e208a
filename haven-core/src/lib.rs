pub mod clock;
pub mod context;
pub mod gateway;
pub mod identity;
pub mod ledger;
pub mod mock;
pub mod model;
pub mod repository;
pub mod trace;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::RequestContext;
pub use gateway::{AccommodationGateway, GatewayError, HostNotification, NotificationGateway, RatingGateway};
pub use identity::AuthGateway;
pub use ledger::{AvailabilityLedger, LedgerError};
pub use model::{AccommodationSummary, HostContact, NewReservation, Reservation, StayRange, UserIdentity, UserRole};
pub use repository::{EventLog, ReservationRepository, StoreError};
pub use trace::TraceContext;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
