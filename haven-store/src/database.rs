use std::time::Duration;

use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::events::PgEventLog;
use crate::reservation_repo::PgReservationRepository;

/// Postgres pool shared by the reservation store and the event log.
#[derive(Clone)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(300))
            .connect(url)
            .await?;
        info!(max_connections, "Connected to Postgres");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Reservation schema is up to date");
        Ok(())
    }

    pub fn repositories(&self) -> (PgReservationRepository, PgEventLog) {
        (
            PgReservationRepository::new(self.pool.clone()),
            PgEventLog::new(self.pool.clone()),
        )
    }
}
