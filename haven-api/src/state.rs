use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use haven_booking::{Collaborators, ReservationOrchestrator, Storage, WorkflowMetrics};
use haven_client::{
    BreakerConfig, BreakerRegistry, ClientMetrics, ClientSettings, HttpServices, ResilientClient,
    RetryPolicy, ServiceEndpoints,
};
use haven_core::{AvailabilityLedger, EventLog, ReservationRepository, SystemClock};
use haven_ledger::InMemoryLedger;
use haven_store::app_config::{Config, LedgerBackend, ResilienceConfig, StorageBackend};
use haven_store::{DbClient, InMemoryEventLog, InMemoryReservationRepository, RedisLedger};
use prometheus::Registry;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReservationOrchestrator>,
    pub registry: Arc<Registry>,
    /// Deadline given to each inbound request.
    pub request_budget: Duration,
}

fn client_settings(config: &Config) -> ClientSettings {
    let r = &config.resilience;
    ClientSettings {
        call_timeout: Duration::from_millis(r.call_timeout_ms),
        connect_timeout: Duration::from_millis(r.connect_timeout_ms),
        accept_invalid_certs: config.services.accept_invalid_certs,
        retry: RetryPolicy {
            max_attempts: r.max_attempts,
            initial_backoff: Duration::from_millis(r.initial_backoff_ms),
            max_backoff: Duration::from_millis(r.max_backoff_ms),
            multiplier: r.backoff_multiplier,
            jitter: r.jitter,
        },
    }
}

fn breaker_config(r: &ResilienceConfig) -> BreakerConfig {
    BreakerConfig {
        failure_threshold: r.failure_threshold,
        window: Duration::from_secs(r.failure_window_secs),
        cooldown: Duration::from_secs(r.cooldown_secs),
    }
}

async fn storage(config: &Config) -> anyhow::Result<Storage> {
    let (reservations, events): (Arc<dyn ReservationRepository>, Arc<dyn EventLog>) =
        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory reservation store; data is lost on restart");
                (
                    Arc::new(InMemoryReservationRepository::new()),
                    Arc::new(InMemoryEventLog::new()),
                )
            }
            StorageBackend::Postgres => {
                let url = config
                    .database
                    .url
                    .as_deref()
                    .context("storage.backend is postgres but database.url is not set")?;
                let db = DbClient::connect(url, config.database.max_connections)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;
                let (reservations, events) = db.repositories();
                (Arc::new(reservations), Arc::new(events))
            }
        };

    let ledger: Arc<dyn AvailabilityLedger> = match config.ledger.backend {
        LedgerBackend::Memory => Arc::new(InMemoryLedger::new()),
        LedgerBackend::Redis => {
            let url = config
                .redis
                .url
                .as_deref()
                .context("ledger.backend is redis but redis.url is not set")?;
            Arc::new(RedisLedger::new(url).context("Failed to create Redis client")?)
        }
    };

    Ok(Storage {
        reservations,
        events,
        ledger,
    })
}

/// Wire the orchestrator from configuration: HTTP gateways for the
/// collaborating services, the configured storage backends and a metrics
/// registry shared by every component.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let registry = Registry::new();

    let client_metrics = ClientMetrics::new()?;
    client_metrics.register(&registry)?;
    let workflow_metrics = WorkflowMetrics::new()?;
    workflow_metrics.register(&registry)?;

    let breakers = Arc::new(
        BreakerRegistry::new(breaker_config(&config.resilience)).with_metrics(client_metrics.clone()),
    );
    let client = ResilientClient::new(client_settings(config), breakers)
        .context("Failed to build HTTP client")?
        .with_metrics(client_metrics);

    let services = Arc::new(HttpServices::new(
        Arc::new(client),
        ServiceEndpoints {
            auth: config.services.auth_url.clone(),
            accommodation: config.services.accommodation_url.clone(),
            notification: config.services.notification_url.clone(),
            rating: config.services.rating_url.clone(),
        },
    ));
    let collaborators = Collaborators {
        auth: services.clone(),
        accommodations: services.clone(),
        notifications: services.clone(),
        ratings: services,
    };

    let orchestrator = ReservationOrchestrator::new(
        collaborators,
        storage(config).await?,
        Arc::new(SystemClock),
    )
    .with_metrics(workflow_metrics)
    .with_max_stay_nights(config.booking.max_stay_nights);

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        registry: Arc::new(registry),
        request_budget: config.request_budget(),
    })
}
