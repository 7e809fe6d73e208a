mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use common::*;
use haven_booking::ReservationError;
use haven_client::{
    BreakerConfig, BreakerRegistry, ClientSettings, HttpServices, ResilientClient, RetryPolicy,
    ServiceEndpoints,
};
use haven_core::RequestContext;

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn http_auth(base: &str, threshold: usize) -> Arc<HttpServices> {
    let breakers = BreakerRegistry::new(BreakerConfig {
        failure_threshold: threshold,
        window: Duration::from_secs(60),
        cooldown: Duration::from_secs(60),
    });
    let settings = ClientSettings {
        call_timeout: Duration::from_secs(30),
        retry: RetryPolicy::immediate(3),
        ..ClientSettings::default()
    };
    let client = ResilientClient::new(settings, Arc::new(breakers)).unwrap();
    Arc::new(HttpServices::new(Arc::new(client), ServiceEndpoints::single(base)))
}

#[tokio::test]
async fn test_hanging_auth_fails_within_deadline() {
    let base = spawn(Router::new().route(
        "/users/currentUser",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::OK
        }),
    ))
    .await;
    let h = harness_with_auth("2026-04-20", http_auth(&base, 5));
    let ctx = RequestContext::detached(Duration::from_millis(400));

    let started = Instant::now();
    let err = h.orchestrator.create(&ctx, GUEST, may_request(2)).await.unwrap_err();

    assert!(matches!(
        err,
        ReservationError::ServiceUnavailable { ref dependency, timed_out: true } if dependency == "auth"
    ));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(h.reservations.is_empty().await);
}

#[tokio::test]
async fn test_failing_auth_trips_breaker() {
    let base = spawn(Router::new().route(
        "/users/currentUser",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;
    let h = harness_with_auth("2026-04-20", http_auth(&base, 2));

    for _ in 0..2 {
        let err = h.orchestrator.create(&ctx(), GUEST, may_request(2)).await.unwrap_err();
        assert!(matches!(err, ReservationError::ServiceUnavailable { timed_out: false, .. }));
    }

    let err = h.orchestrator.create(&ctx(), GUEST, may_request(2)).await.unwrap_err();
    assert!(matches!(err, ReservationError::CircuitOpen { .. }));
    assert_eq!(h.metrics.count("create", "circuit_open"), 1);
}
