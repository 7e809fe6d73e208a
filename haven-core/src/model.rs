use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Half-open day range `[check_in, check_out)`. Both ends are calendar days,
/// so the night of `check_out` is never part of the stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> CoreResult<Self> {
        if check_in >= check_out {
            return Err(CoreError::ValidationError(format!(
                "check-in {} must be before check-out {}",
                check_in, check_out
            )));
        }
        Ok(Self { check_in, check_out })
    }

    /// Every booked night, in order.
    pub fn nights(&self) -> impl Iterator<Item = NaiveDate> {
        let check_out = self.check_out;
        self.check_in
            .iter_days()
            .take_while(move |day| *day < check_out)
    }

    pub fn len_days(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn last_night(&self) -> NaiveDate {
        self.check_out - Duration::days(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(alias = "guest", alias = "GUEST")]
    Guest,
    #[serde(alias = "host", alias = "HOST")]
    Host,
    /// Any role this service has no rules for. Never passes a role check.
    #[serde(other)]
    Other,
}

/// Caller identity as resolved by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub role: UserRole,
    pub username: String,
}

/// Contact details used for host notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContact {
    pub id: String,
    pub email: String,
    pub username: String,
}

/// The slice of accommodation metadata the reservation workflows need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccommodationSummary {
    pub id: String,
    pub name: String,
    pub location: String,
    pub host_id: String,
    pub min_guests: u32,
    pub max_guests: u32,
}

/// A validated reservation request, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub guest_id: String,
    pub accommodation_id: String,
    pub stay: StayRange,
    pub number_of_guests: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub reservation_id: Uuid,
    pub guest_id: String,
    pub accommodation_id: String,
    pub accommodation_name: String,
    pub accommodation_location: String,
    pub accommodation_host_id: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: u32,
    pub is_canceled: bool,
}

impl Reservation {
    /// Builds the persisted record. Ids are UUIDv7 so they sort by creation time.
    pub fn from_new(new: NewReservation, accommodation: &AccommodationSummary) -> Self {
        Self {
            reservation_id: Uuid::now_v7(),
            guest_id: new.guest_id,
            accommodation_id: new.accommodation_id,
            accommodation_name: accommodation.name.clone(),
            accommodation_location: accommodation.location.clone(),
            accommodation_host_id: accommodation.host_id.clone(),
            check_in_date: new.stay.check_in,
            check_out_date: new.stay.check_out,
            number_of_guests: new.number_of_guests,
            is_canceled: false,
        }
    }

    pub fn stay(&self) -> StayRange {
        StayRange {
            check_in: self.check_in_date,
            check_out: self.check_out_date,
        }
    }

    /// True while the record blocks its `(guest, accommodation, check-in)` slot.
    pub fn is_active(&self) -> bool {
        !self.is_canceled
    }

    pub fn same_slot(&self, guest_id: &str, accommodation_id: &str, check_in: NaiveDate) -> bool {
        self.guest_id == guest_id
            && self.accommodation_id == accommodation_id
            && self.check_in_date == check_in
    }
}

/// Share of cancelled reservations in percent; 0 when the host has none.
pub fn cancelled_percentage(active: u64, cancelled: u64) -> f64 {
    let total = active + cancelled;
    if total == 0 {
        0.0
    } else {
        cancelled as f64 / total as f64 * 100.0
    }
}

/// Serde helpers for request dates. Accepts `2026-05-01` as well as full
/// RFC 3339 timestamps; the time of day is dropped in the timestamp's own
/// offset. The zero timestamp (`0001-01-01`) counts as absent.
pub mod flexible_date {
    use chrono::{DateTime, Datelike, NaiveDate};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let trimmed = raw.trim();
        let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.date_naive()))?;
        if date.year() <= 1 {
            None
        } else {
            Some(date)
        }
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => {
                let trimmed = value.trim();
                let looks_like_zero = trimmed.starts_with("0001-01-01");
                match parse(trimmed) {
                    Some(date) => Ok(Some(date)),
                    None if looks_like_zero => Ok(None),
                    None => Err(serde::de::Error::custom(format!(
                        "invalid date '{}', expected YYYY-MM-DD or RFC 3339",
                        trimmed
                    ))),
                }
            }
        }
    }
}
