pub mod app_config;
pub mod database;
pub mod events;
pub mod memory;
pub mod redis_repo;
pub mod reservation_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use events::PgEventLog;
pub use memory::{InMemoryEventLog, InMemoryReservationRepository};
pub use redis_repo::RedisLedger;
pub use reservation_repo::PgReservationRepository;
