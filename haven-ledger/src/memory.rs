use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use haven_core::{AvailabilityLedger, LedgerError, StayRange};
use tokio::sync::{Mutex, RwLock};

use crate::calendar::LedgerEntry;

/// Process-local ledger. Each accommodation has its own lock, so bookings
/// for different accommodations never contend.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RwLock<HashMap<String, Arc<Mutex<LedgerEntry>>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, accommodation_id: &str) -> Arc<Mutex<LedgerEntry>> {
        if let Some(entry) = self.entries.read().await.get(accommodation_id) {
            return entry.clone();
        }
        let mut entries = self.entries.write().await;
        entries
            .entry(accommodation_id.to_string())
            .or_default()
            .clone()
    }

    /// Copy of the current calendar, empty if the accommodation was never touched.
    pub async fn snapshot(&self, accommodation_id: &str) -> LedgerEntry {
        let entry = self.entry(accommodation_id).await;
        let guard = entry.lock().await;
        guard.clone()
    }
}

#[async_trait]
impl AvailabilityLedger for InMemoryLedger {
    async fn is_available(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError> {
        let entry = self.entry(accommodation_id).await;
        let guard = entry.lock().await;
        Ok(guard.is_free(stay))
    }

    async fn try_book(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError> {
        let entry = self.entry(accommodation_id).await;
        let mut guard = entry.lock().await;
        let booked = guard.try_book(stay);
        if !booked {
            tracing::debug!(accommodation_id, check_in = %stay.check_in, "Ledger conflict");
        }
        Ok(booked)
    }

    async fn book(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError> {
        let entry = self.entry(accommodation_id).await;
        entry.lock().await.mark(stay, true);
        Ok(())
    }

    async fn release(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError> {
        let entry = self.entry(accommodation_id).await;
        entry.lock().await.mark(stay, false);
        Ok(())
    }

    async fn set_price(&self, accommodation_id: &str, stay: &StayRange, price: f64) -> Result<(), LedgerError> {
        if !price.is_finite() || price < 0.0 {
            return Err(LedgerError::InvalidPrice(price));
        }
        let entry = self.entry(accommodation_id).await;
        entry.lock().await.set_price(stay, price);
        Ok(())
    }

    async fn quote(&self, accommodation_id: &str, stay: &StayRange) -> Result<Option<f64>, LedgerError> {
        let entry = self.entry(accommodation_id).await;
        let guard = entry.lock().await;
        Ok(guard.quote(stay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stay(from: &str, to: &str) -> StayRange {
        StayRange::new(from.parse().unwrap(), to.parse().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_try_book_admits_one() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .try_book("acc-1", &stay("2026-05-01", "2026-05-05"))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_accommodations_are_independent() {
        let ledger = InMemoryLedger::new();
        let range = stay("2026-05-01", "2026-05-05");
        assert!(ledger.try_book("acc-1", &range).await.unwrap());
        assert!(ledger.is_available("acc-2", &range).await.unwrap());
    }

    #[tokio::test]
    async fn test_book_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let range = stay("2026-05-01", "2026-05-03");
        ledger.book("acc-1", &range).await.unwrap();
        ledger.book("acc-1", &range).await.unwrap();
        assert_eq!(ledger.snapshot("acc-1").await.booked_nights().len(), 2);

        ledger.release("acc-1", &range).await.unwrap();
        assert!(ledger.is_available("acc-1", &range).await.unwrap());
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let ledger = InMemoryLedger::new();
        let err = ledger
            .set_price("acc-1", &stay("2026-05-01", "2026-05-02"), -1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrice(_)));
    }
}
