use std::collections::BTreeMap;

use chrono::NaiveDate;
use haven_core::StayRange;
use serde::{Deserialize, Serialize};

/// Booked nights and nightly prices for a single accommodation.
///
/// A night absent from `booked` is free. A night absent from `prices` is
/// unpriced, which makes any quote covering it undefined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub booked: BTreeMap<NaiveDate, bool>,
    pub prices: BTreeMap<NaiveDate, f64>,
}

impl LedgerEntry {
    pub fn is_free(&self, stay: &StayRange) -> bool {
        stay.nights()
            .all(|night| !self.booked.get(&night).copied().unwrap_or(false))
    }

    pub fn mark(&mut self, stay: &StayRange, booked: bool) {
        for night in stay.nights() {
            if booked {
                self.booked.insert(night, true);
            } else {
                self.booked.remove(&night);
            }
        }
    }

    /// Check-and-book in one step; leaves the entry untouched on conflict.
    pub fn try_book(&mut self, stay: &StayRange) -> bool {
        if !self.is_free(stay) {
            return false;
        }
        self.mark(stay, true);
        true
    }

    pub fn set_price(&mut self, stay: &StayRange, price: f64) {
        for night in stay.nights() {
            self.prices.insert(night, price);
        }
    }

    pub fn quote(&self, stay: &StayRange) -> Option<f64> {
        stay.nights()
            .map(|night| self.prices.get(&night).copied())
            .sum()
    }

    pub fn booked_nights(&self) -> Vec<NaiveDate> {
        self.booked
            .iter()
            .filter(|(_, booked)| **booked)
            .map(|(night, _)| *night)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stay(from: &str, to: &str) -> StayRange {
        StayRange::new(from.parse().unwrap(), to.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_check_out_night_is_not_booked() {
        let mut entry = LedgerEntry::default();
        assert!(entry.try_book(&stay("2026-05-01", "2026-05-05")));

        assert_eq!(entry.booked_nights().len(), 4);
        assert!(entry.is_free(&stay("2026-05-05", "2026-05-07")));
        assert!(!entry.is_free(&stay("2026-05-04", "2026-05-06")));
    }

    #[test]
    fn test_failed_try_book_changes_nothing() {
        let mut entry = LedgerEntry::default();
        entry.mark(&stay("2026-05-03", "2026-05-04"), true);
        let before = entry.clone();

        assert!(!entry.try_book(&stay("2026-05-01", "2026-05-05")));
        assert_eq!(entry, before);
    }

    #[test]
    fn test_release_frees_nights() {
        let mut entry = LedgerEntry::default();
        let range = stay("2026-05-01", "2026-05-03");
        entry.mark(&range, true);
        entry.mark(&range, false);
        assert!(entry.is_free(&range));
        assert!(entry.booked_nights().is_empty());
    }

    #[test]
    fn test_quote_requires_every_night_priced() {
        let mut entry = LedgerEntry::default();
        entry.set_price(&stay("2026-05-01", "2026-05-03"), 80.0);
        entry.set_price(&stay("2026-05-03", "2026-05-04"), 120.0);

        assert_eq!(entry.quote(&stay("2026-05-01", "2026-05-04")), Some(280.0));
        assert_eq!(entry.quote(&stay("2026-05-01", "2026-05-05")), None);
    }
}
