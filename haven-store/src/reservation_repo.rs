use async_trait::async_trait;
use chrono::NaiveDate;
use haven_core::model::cancelled_percentage;
use haven_core::{Reservation, ReservationRepository, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    reservation_id: Uuid,
    guest_id: String,
    accommodation_id: String,
    accommodation_name: String,
    accommodation_location: String,
    accommodation_host_id: String,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    number_of_guests: i32,
    is_canceled: bool,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            reservation_id: row.reservation_id,
            guest_id: row.guest_id,
            accommodation_id: row.accommodation_id,
            accommodation_name: row.accommodation_name,
            accommodation_location: row.accommodation_location,
            accommodation_host_id: row.accommodation_host_id,
            check_in_date: row.check_in_date,
            check_out_date: row.check_out_date,
            number_of_guests: row.number_of_guests.max(0) as u32,
            is_canceled: row.is_canceled,
        }
    }
}

const RESERVATION_COLUMNS: &str = "reservation_id, guest_id, accommodation_id, accommodation_name, \
     accommodation_location, accommodation_host_id, check_in_date, check_out_date, \
     number_of_guests, is_canceled";

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Reservation store query failed");
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[derive(sqlx::FromRow)]
struct HostCounts {
    active: i64,
    cancelled: i64,
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO reservations_by_guest (reservation_id, guest_id, accommodation_id, \
             accommodation_name, accommodation_location, accommodation_host_id, check_in_date, \
             check_out_date, number_of_guests, is_canceled) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)",
        )
        .bind(reservation.reservation_id)
        .bind(&reservation.guest_id)
        .bind(&reservation.accommodation_id)
        .bind(&reservation.accommodation_name)
        .bind(&reservation.accommodation_location)
        .bind(&reservation.accommodation_host_id)
        .bind(reservation.check_in_date)
        .bind(reservation.check_out_date)
        .bind(i32::try_from(reservation.number_of_guests).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate {
                guest_id: reservation.guest_id.clone(),
                accommodation_id: reservation.accommodation_id.clone(),
                check_in: reservation.check_in_date,
            }),
            Err(err) => Err(backend(err)),
        }
    }

    async fn has_active(
        &self,
        guest_id: &str,
        accommodation_id: &str,
        check_in: NaiveDate,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reservations_by_guest \
             WHERE guest_id = $1 AND accommodation_id = $2 AND check_in_date = $3 AND NOT is_canceled)",
        )
        .bind(guest_id)
        .bind(accommodation_id)
        .bind(check_in)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(exists)
    }

    async fn find(&self, guest_id: &str, reservation_id: Uuid) -> Result<Reservation, StoreError> {
        let query = format!(
            "SELECT {} FROM reservations_by_guest WHERE guest_id = $1 AND reservation_id = $2",
            RESERVATION_COLUMNS
        );
        let row: Option<ReservationRow> = sqlx::query_as(&query)
            .bind(guest_id)
            .bind(reservation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(Reservation::from)
            .ok_or(StoreError::NotFound(reservation_id))
    }

    async fn cancel(
        &self,
        guest_id: &str,
        reservation_id: Uuid,
        today: NaiveDate,
    ) -> Result<Reservation, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let query = format!(
            "SELECT {} FROM reservations_by_guest WHERE guest_id = $1 AND reservation_id = $2 FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let row: Option<ReservationRow> = sqlx::query_as(&query)
            .bind(guest_id)
            .bind(reservation_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        let mut reservation = row
            .map(Reservation::from)
            .ok_or(StoreError::NotFound(reservation_id))?;

        if reservation.is_canceled {
            return Err(StoreError::AlreadyCanceled(reservation_id));
        }
        if today >= reservation.check_in_date {
            return Err(StoreError::CancellationClosed {
                reservation_id,
                check_in: reservation.check_in_date,
            });
        }

        sqlx::query(
            "UPDATE reservations_by_guest SET is_canceled = TRUE WHERE guest_id = $1 AND reservation_id = $2",
        )
        .bind(guest_id)
        .bind(reservation_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        reservation.is_canceled = true;
        Ok(reservation)
    }

    async fn list_active(&self, guest_id: &str) -> Result<Vec<Reservation>, StoreError> {
        let query = format!(
            "SELECT {} FROM reservations_by_guest WHERE guest_id = $1 AND NOT is_canceled \
             ORDER BY check_in_date, reservation_id",
            RESERVATION_COLUMNS
        );
        let rows: Vec<ReservationRow> = sqlx::query_as(&query)
            .bind(guest_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn count_active_by_host(&self, host_id: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations_by_guest WHERE accommodation_host_id = $1 AND NOT is_canceled",
        )
        .bind(host_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(count.max(0) as u64)
    }

    async fn cancelled_ratio(&self, host_id: &str) -> Result<f64, StoreError> {
        let counts: HostCounts = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE NOT is_canceled) AS active, \
                    COUNT(*) FILTER (WHERE is_canceled) AS cancelled \
             FROM reservations_by_guest WHERE accommodation_host_id = $1",
        )
        .bind(host_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(cancelled_percentage(
            counts.active.max(0) as u64,
            counts.cancelled.max(0) as u64,
        ))
    }

    async fn total_stay_duration_days(&self, host_id: &str) -> Result<i64, StoreError> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(check_out_date - check_in_date)::BIGINT FROM reservations_by_guest \
             WHERE accommodation_host_id = $1 AND NOT is_canceled",
        )
        .bind(host_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(total.unwrap_or(0))
    }

    async fn count_upcoming_by_accommodation(
        &self,
        accommodation_id: &str,
        today: NaiveDate,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations_by_guest \
             WHERE accommodation_id = $1 AND NOT is_canceled AND check_out_date > $2",
        )
        .bind(accommodation_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(count.max(0) as u64)
    }
}
