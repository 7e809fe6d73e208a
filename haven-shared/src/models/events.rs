use chrono::Utc;
use std::fmt;

/// State transitions recorded in the reservation audit trail.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ReservationEventKind {
    Reserved,
    Cancelled,
}

impl ReservationEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationEventKind::Reserved => "Reserved",
            ReservationEventKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ReservationEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record. Written once per successful create/cancel,
/// never read back by the workflows.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ReservationEvent {
    pub event: ReservationEventKind,
    pub guest_id: String,
    pub accommodation_id: String,
    pub timestamp: i64,
}

impl ReservationEvent {
    pub fn new(event: ReservationEventKind, guest_id: &str, accommodation_id: &str) -> Self {
        Self {
            event,
            guest_id: guest_id.to_string(),
            accommodation_id: accommodation_id.to_string(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn reserved(guest_id: &str, accommodation_id: &str) -> Self {
        Self::new(ReservationEventKind::Reserved, guest_id, accommodation_id)
    }

    pub fn cancelled(guest_id: &str, accommodation_id: &str) -> Self {
        Self::new(ReservationEventKind::Cancelled, guest_id, accommodation_id)
    }
}
