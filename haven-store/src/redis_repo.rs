use async_trait::async_trait;
use chrono::NaiveDate;
use haven_core::{AvailabilityLedger, LedgerError, StayRange};
use tracing::info;

/// Shared ledger for multi-replica deployments. Booked nights and prices
/// live in two hashes per accommodation, keyed by ISO date.
#[derive(Clone)]
pub struct RedisLedger {
    client: redis::Client,
}

const TRY_BOOK: &str = r#"
    for i = 1, #ARGV do
        if redis.call("HEXISTS", KEYS[1], ARGV[i]) == 1 then
            return 0
        end
    end
    for i = 1, #ARGV do
        redis.call("HSET", KEYS[1], ARGV[i], "1")
    end
    return 1
"#;

fn booked_key(accommodation_id: &str) -> String {
    format!("ledger:{}:booked", accommodation_id)
}

fn price_key(accommodation_id: &str) -> String {
    format!("ledger:{}:price", accommodation_id)
}

fn night_fields(stay: &StayRange) -> Vec<String> {
    stay.nights().map(|night: NaiveDate| night.format("%Y-%m-%d").to_string()).collect()
}

fn backend(err: redis::RedisError) -> LedgerError {
    LedgerError::Backend(err.to_string())
}

impl RedisLedger {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, LedgerError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl AvailabilityLedger for RedisLedger {
    async fn is_available(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError> {
        let mut conn = self.connection().await?;
        let booked: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(booked_key(accommodation_id))
            .arg(night_fields(stay))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(booked.iter().all(Option::is_none))
    }

    async fn try_book(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError> {
        let mut conn = self.connection().await?;
        let script = redis::Script::new(TRY_BOOK);
        let booked: i64 = script
            .key(booked_key(accommodation_id))
            .arg(night_fields(stay))
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        if booked == 1 {
            info!("Ledger booked {} nights for {}", stay.len_days(), accommodation_id);
        }
        Ok(booked == 1)
    }

    async fn book(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("HSET");
        cmd.arg(booked_key(accommodation_id));
        for night in night_fields(stay) {
            cmd.arg(night).arg("1");
        }
        let _: i64 = cmd.query_async(&mut conn).await.map_err(backend)?;
        Ok(())
    }

    async fn release(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("HDEL")
            .arg(booked_key(accommodation_id))
            .arg(night_fields(stay))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        info!("Ledger released {} nights for {}", stay.len_days(), accommodation_id);
        Ok(())
    }

    async fn set_price(&self, accommodation_id: &str, stay: &StayRange, price: f64) -> Result<(), LedgerError> {
        if !price.is_finite() || price < 0.0 {
            return Err(LedgerError::InvalidPrice(price));
        }
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("HSET");
        cmd.arg(price_key(accommodation_id));
        for night in night_fields(stay) {
            cmd.arg(night).arg(price.to_string());
        }
        let _: i64 = cmd.query_async(&mut conn).await.map_err(backend)?;
        Ok(())
    }

    async fn quote(&self, accommodation_id: &str, stay: &StayRange) -> Result<Option<f64>, LedgerError> {
        let mut conn = self.connection().await?;
        let prices: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(price_key(accommodation_id))
            .arg(night_fields(stay))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(prices
            .into_iter()
            .map(|p| p.and_then(|raw| raw.parse::<f64>().ok()))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_cover_nights_only() {
        let stay = StayRange::new("2026-05-01".parse().unwrap(), "2026-05-04".parse().unwrap()).unwrap();
        assert_eq!(night_fields(&stay), vec!["2026-05-01", "2026-05-02", "2026-05-03"]);
        assert_eq!(booked_key("acc-1"), "ledger:acc-1:booked");
        assert_eq!(price_key("acc-1"), "ledger:acc-1:price");
    }
}
