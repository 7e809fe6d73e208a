use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use haven_core::model::cancelled_percentage;
use haven_core::{EventLog, Reservation, ReservationRepository, StoreError};
use haven_shared::ReservationEvent;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Reservation store for single-node runs and tests. Inserts take the
/// write lock, so the uniqueness check and the insert are one step.
#[derive(Default)]
pub struct InMemoryReservationRepository {
    records: RwLock<HashMap<Uuid, Reservation>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn host_counts(&self, host_id: &str) -> (u64, u64) {
        let records = self.records.read().await;
        records
            .values()
            .filter(|r| r.accommodation_host_id == host_id)
            .fold((0, 0), |(active, cancelled), r| {
                if r.is_canceled {
                    (active, cancelled + 1)
                } else {
                    (active + 1, cancelled)
                }
            })
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let taken = records.values().any(|r| {
            r.is_active()
                && r.same_slot(
                    &reservation.guest_id,
                    &reservation.accommodation_id,
                    reservation.check_in_date,
                )
        });
        if taken {
            return Err(StoreError::Duplicate {
                guest_id: reservation.guest_id.clone(),
                accommodation_id: reservation.accommodation_id.clone(),
                check_in: reservation.check_in_date,
            });
        }
        records.insert(reservation.reservation_id, reservation.clone());
        Ok(())
    }

    async fn has_active(
        &self,
        guest_id: &str,
        accommodation_id: &str,
        check_in: NaiveDate,
    ) -> Result<bool, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .any(|r| r.is_active() && r.same_slot(guest_id, accommodation_id, check_in)))
    }

    async fn find(&self, guest_id: &str, reservation_id: Uuid) -> Result<Reservation, StoreError> {
        let records = self.records.read().await;
        records
            .get(&reservation_id)
            .filter(|r| r.guest_id == guest_id)
            .cloned()
            .ok_or(StoreError::NotFound(reservation_id))
    }

    async fn cancel(
        &self,
        guest_id: &str,
        reservation_id: Uuid,
        today: NaiveDate,
    ) -> Result<Reservation, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&reservation_id)
            .filter(|r| r.guest_id == guest_id)
            .ok_or(StoreError::NotFound(reservation_id))?;

        if record.is_canceled {
            return Err(StoreError::AlreadyCanceled(reservation_id));
        }
        if today >= record.check_in_date {
            return Err(StoreError::CancellationClosed {
                reservation_id,
                check_in: record.check_in_date,
            });
        }
        record.is_canceled = true;
        Ok(record.clone())
    }

    async fn list_active(&self, guest_id: &str) -> Result<Vec<Reservation>, StoreError> {
        let records = self.records.read().await;
        let mut active: Vec<Reservation> = records
            .values()
            .filter(|r| r.guest_id == guest_id && r.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|r| (r.check_in_date, r.reservation_id));
        Ok(active)
    }

    async fn count_active_by_host(&self, host_id: &str) -> Result<u64, StoreError> {
        Ok(self.host_counts(host_id).await.0)
    }

    async fn cancelled_ratio(&self, host_id: &str) -> Result<f64, StoreError> {
        let (active, cancelled) = self.host_counts(host_id).await;
        Ok(cancelled_percentage(active, cancelled))
    }

    async fn total_stay_duration_days(&self, host_id: &str) -> Result<i64, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.accommodation_host_id == host_id && r.is_active())
            .map(|r| r.stay().len_days())
            .sum())
    }

    async fn count_upcoming_by_accommodation(
        &self,
        accommodation_id: &str,
        today: NaiveDate,
    ) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| {
                r.accommodation_id == accommodation_id && r.is_active() && r.check_out_date > today
            })
            .count() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<ReservationEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ReservationEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: &ReservationEvent) -> Result<(), StoreError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
