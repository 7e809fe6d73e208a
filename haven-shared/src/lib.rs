pub mod models;
pub mod pii;

pub use models::events::{ReservationEvent, ReservationEventKind};
pub use pii::Masked;
