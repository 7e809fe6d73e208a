pub mod error;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod validation;

pub use error::ReservationError;
pub use metrics::WorkflowMetrics;
pub use models::{
    CancelOutcome, CheckAvailabilityRequest, CreateOutcome, CreateReservationRequest,
    SetPriceRequest,
};
pub use orchestrator::{Collaborators, ReservationOrchestrator, Storage};
