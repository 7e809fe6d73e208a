use async_trait::async_trait;
use haven_core::{EventLog, StoreError};
use haven_shared::ReservationEvent;
use sqlx::PgPool;
use tracing::{error, info};

/// Audit trail in the `reservation_events` table.
#[derive(Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn append(&self, event: &ReservationEvent) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO reservation_events (event, guest_id, accommodation_id, occurred_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(event.event.as_str())
        .bind(&event.guest_id)
        .bind(&event.accommodation_id)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(
                    "Recorded {} event for accommodation {}",
                    event.event, event.accommodation_id
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to record {} event: {}", event.event, e);
                Err(StoreError::Backend(e.to_string()))
            }
        }
    }
}
