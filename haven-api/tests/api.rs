use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use haven_api::{app, AppState};
use haven_booking::{Collaborators, ReservationOrchestrator, Storage, WorkflowMetrics};
use haven_core::mock::{
    RecordingNotificationGateway, RecordingRatingGateway, StaticAccommodationGateway,
    StaticAuthGateway,
};
use haven_core::{AccommodationSummary, FixedClock, HostContact, UserIdentity, UserRole};
use haven_ledger::InMemoryLedger;
use haven_store::{InMemoryEventLog, InMemoryReservationRepository};
use prometheus::Registry;
use serde_json::{json, Value};
use tower::ServiceExt;

const GUEST: &str = "Bearer guest-token";
const HOST: &str = "Bearer host-token";

struct TestApp {
    router: Router,
    notifications: Arc<RecordingNotificationGateway>,
}

fn test_app() -> TestApp {
    let auth = StaticAuthGateway::new()
        .with_user(
            GUEST,
            UserIdentity {
                id: "guest-1".into(),
                role: UserRole::Guest,
                username: "jane".into(),
            },
        )
        .with_user(
            HOST,
            UserIdentity {
                id: "host-1".into(),
                role: UserRole::Host,
                username: "hank".into(),
            },
        )
        .with_contact(HostContact {
            id: "host-1".into(),
            email: "hank@example.com".into(),
            username: "hank".into(),
        });
    let accommodations = StaticAccommodationGateway::new().with(AccommodationSummary {
        id: "acc-A".into(),
        name: "Riverside Loft".into(),
        location: "Novi Sad".into(),
        host_id: "host-1".into(),
        min_guests: 1,
        max_guests: 4,
    });
    let notifications = Arc::new(RecordingNotificationGateway::new());

    let registry = Registry::new();
    let metrics = WorkflowMetrics::new().unwrap();
    metrics.register(&registry).unwrap();

    let orchestrator = ReservationOrchestrator::new(
        Collaborators {
            auth: Arc::new(auth),
            accommodations: Arc::new(accommodations),
            notifications: notifications.clone(),
            ratings: Arc::new(RecordingRatingGateway::new()),
        },
        Storage {
            reservations: Arc::new(InMemoryReservationRepository::new()),
            events: Arc::new(InMemoryEventLog::new()),
            ledger: Arc::new(InMemoryLedger::new()),
        },
        Arc::new(FixedClock::on("2026-04-20".parse().unwrap())),
    )
    .with_metrics(metrics);

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        registry: Arc::new(registry),
        request_budget: Duration::from_secs(5),
    };

    TestApp {
        router: app(state),
        notifications,
    }
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, value)
}

fn may_stay(guests: i64) -> Value {
    json!({
        "accommodationId": "acc-A",
        "checkInDate": "2026-05-01T00:00:00Z",
        "checkOutDate": "2026-05-05T00:00:00Z",
        "numberOfGuests": guests
    })
}

#[tokio::test]
async fn test_health() {
    let t = test_app();
    let (status, _, body) = send(&t.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_create_then_duplicate_conflicts() {
    let t = test_app();

    let (status, _, body) = send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(2))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["accommodationId"], "acc-A");
    assert_eq!(body["checkInDate"], "2026-05-01");
    assert_eq!(body["isCanceled"], false);
    assert_eq!(t.notifications.sent().len(), 1);

    let (status, _, body) = send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(2))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().starts_with("Cannot reserve"));
}

#[tokio::test]
async fn test_validation_errors_carry_details() {
    let t = test_app();
    let (status, _, body) = send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(9))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["numberOfGuests"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let t = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/reservations")
        .header("authorization", GUEST)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = t.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Invalid request body. Check the request format.");
}

#[tokio::test]
async fn test_missing_or_wrong_credentials() {
    let t = test_app();

    let (status, _, _) = send(&t.router, "POST", "/reservations", None, Some(may_stay(2))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&t.router, "POST", "/reservations", Some(HOST), Some(may_stay(2))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancel_returns_no_content_then_conflict() {
    let t = test_app();
    let (_, _, created) = send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(2))).await;
    let id = created["reservationId"].as_str().unwrap().to_string();

    let (status, _, _) = send(&t.router, "DELETE", &format!("/reservations/{}", id), Some(GUEST), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&t.router, "DELETE", &format!("/reservations/{}", id), Some(GUEST), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(&t.router, "GET", "/reservations", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_with_failing_notification_reports_warnings() {
    let t = test_app();
    let (_, _, created) = send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(2))).await;
    let id = created["reservationId"].as_str().unwrap().to_string();
    t.notifications.set_failing(true);

    let (status, _, body) = send(&t.router, "DELETE", &format!("/reservations/{}", id), Some(GUEST), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_rejects_bad_id() {
    let t = test_app();
    let (status, _, body) = send(&t.router, "DELETE", "/reservations/not-a-uuid", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid path parameter.");

    let (status, _, body) = send(&t.router, "DELETE", "/reservations/1234", Some(GUEST), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid path parameter.");
}

#[tokio::test]
async fn test_availability_and_host_statistics() {
    let t = test_app();
    let stay = json!({ "checkInDate": "2026-05-01", "checkOutDate": "2026-05-05" });

    let (status, _, _) = send(&t.router, "POST", "/reservations/availability/acc-A", None, Some(stay.clone())).await;
    assert_eq!(status, StatusCode::OK);

    send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(2))).await;

    let (status, _, _) = send(&t.router, "POST", "/reservations/availability/acc-A", None, Some(stay)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, body) = send(&t.router, "GET", "/reservations/host/host-1/total", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(1));

    let (_, _, body) = send(&t.router, "GET", "/reservations/host/host-1/total-duration", None, None).await;
    assert_eq!(body, json!(4));

    let (_, _, body) = send(&t.router, "GET", "/reservations/host/host-1/cancelled-percentage", None, None).await;
    assert_eq!(body, json!(0.0));

    let (status, _, body) = send(
        &t.router,
        "GET",
        "/reservations/accommodation/acc-A/upcoming",
        Some(HOST),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "number": 1 }));
}

#[tokio::test]
async fn test_prices_are_quoted_on_create() {
    let t = test_app();
    let prices = json!({ "startDate": "2026-05-01", "endDate": "2026-05-05", "price": 75.0 });

    let (status, _, _) = send(&t.router, "PUT", "/availability/acc-A/prices", Some(GUEST), Some(prices.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&t.router, "PUT", "/availability/acc-A/prices", Some(HOST), Some(prices)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(2))).await;
    assert_eq!(body["totalPrice"], json!(300.0));
}

#[tokio::test]
async fn test_trace_id_is_continued_and_echoed() {
    let t = test_app();
    let request = Request::builder()
        .uri("/health")
        .header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .body(Body::empty())
        .unwrap();

    let response = t.router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()["x-trace-id"],
        "4bf92f3577b34da6a3ce929d0e0e4736"
    );

    let (_, headers, _) = send(&t.router, "GET", "/health", None, None).await;
    assert_eq!(headers["x-trace-id"].len(), 32);
}

#[tokio::test]
async fn test_metrics_exposes_workflow_outcomes() {
    let t = test_app();
    send(&t.router, "POST", "/reservations", Some(GUEST), Some(may_stay(2))).await;

    let (status, _, body) = send(&t.router, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("haven_workflow_outcomes_total"));
    assert!(text.contains("outcome=\"success\""));
}
