use std::collections::BTreeMap;

use chrono::NaiveDate;
use haven_core::{AccommodationSummary, NewReservation, StayRange};

use crate::error::ReservationError;
use crate::models::CreateReservationRequest;

pub const ACCOMMODATION_REQUIRED: &str = "Field accommodationId is required";
pub const DATES_REQUIRED: &str = "Check-in and check-out dates are required.";
pub const CHECK_IN_IN_PAST: &str = "Check-in date must be in the future.";
pub const CHECK_IN_AFTER_CHECK_OUT: &str = "Check-in date must be before check out date.";
pub const GUESTS_NOT_WHOLE: &str = "Invalid field number_of_guests. It's a whole number.";
pub const TOO_MANY_GUESTS: &str = "Too much guests. Double check the capacity of accommodation.";
pub const ACCOMMODATION_ID_INVALID: &str = "Field accommodationId is not a valid id";

/// Longest stay accepted unless configured otherwise.
pub const DEFAULT_MAX_STAY_NIGHTS: u32 = 365;

fn stay_too_long(max_nights: u32) -> String {
    format!("A stay can last at most {} nights.", max_nights)
}

/// Checked before any collaborator is contacted. The id ends up as a path
/// segment of the accommodation service URL.
pub fn require_accommodation_id(req: &CreateReservationRequest) -> Result<String, ReservationError> {
    match req.accommodation_id.as_deref().map(str::trim) {
        Some(id) if id.is_empty() => {
            Err(ReservationError::validation("accommodationId", ACCOMMODATION_REQUIRED))
        }
        Some(id) if !is_path_safe(id) => {
            Err(ReservationError::validation("accommodationId", ACCOMMODATION_ID_INVALID))
        }
        Some(id) => Ok(id.to_string()),
        None => Err(ReservationError::validation("accommodationId", ACCOMMODATION_REQUIRED)),
    }
}

fn is_path_safe(id: &str) -> bool {
    id != "." && id != ".." && !id.contains(&['/', '\\', '?', '#', '%'][..])
}

/// A stay range for endpoints that only need dates.
pub fn require_stay(
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    max_nights: u32,
) -> Result<StayRange, ReservationError> {
    let (Some(check_in), Some(check_out)) = (check_in, check_out) else {
        return Err(ReservationError::validation("checkInDate", DATES_REQUIRED));
    };
    let stay = StayRange::new(check_in, check_out)
        .map_err(|_| ReservationError::validation("checkOutDate", CHECK_IN_AFTER_CHECK_OUT))?;
    if stay.len_days() > i64::from(max_nights) {
        return Err(ReservationError::validation("checkOutDate", &stay_too_long(max_nights)));
    }
    Ok(stay)
}

fn whole_guests(raw: Option<&serde_json::Value>) -> Option<u32> {
    let value = raw?;
    let n = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

/// Full business validation of a create request against the accommodation
/// it targets. Every violated rule is reported under its field.
pub fn validate_request(
    guest_id: &str,
    accommodation_id: &str,
    req: &CreateReservationRequest,
    accommodation: &AccommodationSummary,
    today: NaiveDate,
    max_nights: u32,
) -> Result<NewReservation, ReservationError> {
    let mut errors = BTreeMap::new();

    let stay = match (req.check_in_date, req.check_out_date) {
        (Some(check_in), Some(check_out)) => {
            if check_in <= today {
                errors.insert("checkInDate".to_string(), CHECK_IN_IN_PAST.to_string());
            }
            match StayRange::new(check_in, check_out) {
                Ok(stay) if stay.len_days() > i64::from(max_nights) => {
                    errors.insert("checkOutDate".to_string(), stay_too_long(max_nights));
                    None
                }
                Ok(stay) => Some(stay),
                Err(_) => {
                    errors.insert("checkOutDate".to_string(), CHECK_IN_AFTER_CHECK_OUT.to_string());
                    None
                }
            }
        }
        _ => {
            errors.insert("checkInDate".to_string(), DATES_REQUIRED.to_string());
            None
        }
    };

    let guests = match whole_guests(req.number_of_guests.as_ref()) {
        Some(n) if n > accommodation.max_guests => {
            errors.insert("numberOfGuests".to_string(), TOO_MANY_GUESTS.to_string());
            None
        }
        Some(n) if n < accommodation.min_guests => {
            errors.insert(
                "numberOfGuests".to_string(),
                format!(
                    "Not enough guests. The accommodation requires at least {}.",
                    accommodation.min_guests
                ),
            );
            None
        }
        Some(n) => Some(n),
        None => {
            errors.insert("numberOfGuests".to_string(), GUESTS_NOT_WHOLE.to_string());
            None
        }
    };

    match (stay, guests) {
        (Some(stay), Some(number_of_guests)) if errors.is_empty() => Ok(NewReservation {
            guest_id: guest_id.to_string(),
            accommodation_id: accommodation_id.to_string(),
            stay,
            number_of_guests,
        }),
        _ => Err(ReservationError::ValidationFailed(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loft() -> AccommodationSummary {
        AccommodationSummary {
            id: "acc-1".into(),
            name: "Loft".into(),
            location: "Novi Sad".into(),
            host_id: "host-1".into(),
            min_guests: 1,
            max_guests: 4,
        }
    }

    fn request(check_in: &str, check_out: &str, guests: serde_json::Value) -> CreateReservationRequest {
        CreateReservationRequest {
            accommodation_id: Some("acc-1".into()),
            check_in_date: Some(check_in.parse().unwrap()),
            check_out_date: Some(check_out.parse().unwrap()),
            number_of_guests: Some(guests),
        }
    }

    const MAX: u32 = DEFAULT_MAX_STAY_NIGHTS;

    fn today() -> NaiveDate {
        "2026-04-20".parse().unwrap()
    }

    fn fields(err: ReservationError) -> BTreeMap<String, String> {
        match err {
            ReservationError::ValidationFailed(fields) => fields,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        let new = validate_request("g1", "acc-1", &request("2026-05-01", "2026-05-05", json!(2)), &loft(), today(), MAX)
            .unwrap();
        assert_eq!(new.number_of_guests, 2);
        assert_eq!(new.stay.len_days(), 4);
    }

    #[test]
    fn test_too_many_guests() {
        let err = validate_request("g1", "acc-1", &request("2026-05-01", "2026-05-05", json!(6)), &loft(), today(), MAX)
            .unwrap_err();
        assert_eq!(fields(err)["numberOfGuests"], TOO_MANY_GUESTS);
    }

    #[test]
    fn test_fractional_or_text_guests() {
        for raw in [json!(2.5), json!("two"), json!(0), json!(-1)] {
            let err = validate_request("g1", "acc-1", &request("2026-05-01", "2026-05-05", raw), &loft(), today(), MAX)
                .unwrap_err();
            assert_eq!(fields(err)["numberOfGuests"], GUESTS_NOT_WHOLE);
        }
        assert!(validate_request("g1", "acc-1", &request("2026-05-01", "2026-05-05", json!(3.0)), &loft(), today(), MAX)
            .is_ok());
    }

    #[test]
    fn test_check_in_today_is_not_future() {
        let err = validate_request("g1", "acc-1", &request("2026-04-20", "2026-04-22", json!(1)), &loft(), today(), MAX)
            .unwrap_err();
        assert_eq!(fields(err)["checkInDate"], CHECK_IN_IN_PAST);
    }

    #[test]
    fn test_inverted_and_empty_ranges() {
        for (from, to) in [("2026-05-05", "2026-05-01"), ("2026-05-01", "2026-05-01")] {
            let err = validate_request("g1", "acc-1", &request(from, to, json!(1)), &loft(), today(), MAX).unwrap_err();
            assert_eq!(fields(err)["checkOutDate"], CHECK_IN_AFTER_CHECK_OUT);
        }
    }

    #[test]
    fn test_missing_dates_and_id() {
        let req = CreateReservationRequest {
            accommodation_id: Some("  ".into()),
            number_of_guests: Some(json!(1)),
            ..Default::default()
        };
        assert_eq!(fields(require_accommodation_id(&req).unwrap_err())["accommodationId"], ACCOMMODATION_REQUIRED);
        let err = validate_request("g1", "acc-1", &req, &loft(), today(), MAX).unwrap_err();
        assert_eq!(fields(err)["checkInDate"], DATES_REQUIRED);
    }

    #[test]
    fn test_stay_length_is_capped() {
        let err = validate_request("g1", "acc-1", &request("2026-05-01", "9999-12-31", json!(1)), &loft(), today(), MAX)
            .unwrap_err();
        assert_eq!(fields(err)["checkOutDate"], "A stay can last at most 365 nights.");

        assert!(require_stay(Some("2026-05-01".parse().unwrap()), Some("2026-05-08".parse().unwrap()), 7).is_ok());
        let err = require_stay(Some("2026-05-01".parse().unwrap()), Some("2026-05-09".parse().unwrap()), 7).unwrap_err();
        assert_eq!(fields(err)["checkOutDate"], "A stay can last at most 7 nights.");
    }

    #[test]
    fn test_accommodation_id_must_be_one_path_segment() {
        for id in ["../../users/currentUser?x=", "..", "acc#1", "acc%2F1", "a/b"] {
            let req = CreateReservationRequest {
                accommodation_id: Some(id.into()),
                ..Default::default()
            };
            let err = require_accommodation_id(&req).unwrap_err();
            assert_eq!(fields(err)["accommodationId"], ACCOMMODATION_ID_INVALID);
        }
        let req = CreateReservationRequest {
            accommodation_id: Some(" 64f1c0ffee ".into()),
            ..Default::default()
        };
        assert_eq!(require_accommodation_id(&req).unwrap(), "64f1c0ffee");
    }
}
