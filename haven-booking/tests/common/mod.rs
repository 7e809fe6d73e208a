#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use haven_booking::{Collaborators, CreateReservationRequest, ReservationOrchestrator, Storage, WorkflowMetrics};
use haven_core::mock::{
    FaultyEventLog, FaultyLedger, FaultyReservationRepository, RecordingNotificationGateway,
    RecordingRatingGateway, StaticAccommodationGateway, StaticAuthGateway,
};
use haven_core::{AccommodationSummary, FixedClock, HostContact, RequestContext, UserIdentity, UserRole};
use haven_ledger::InMemoryLedger;
use haven_store::{InMemoryEventLog, InMemoryReservationRepository};
use serde_json::json;

pub const GUEST: &str = "Bearer guest-token";
pub const OTHER_GUEST: &str = "Bearer other-guest-token";
pub const HOST: &str = "Bearer host-token";

pub struct Harness {
    pub orchestrator: Arc<ReservationOrchestrator>,
    pub reservations: Arc<InMemoryReservationRepository>,
    pub events: Arc<InMemoryEventLog>,
    pub ledger: Arc<InMemoryLedger>,
    /// Switchable failures wrapped around the stores above.
    pub faulty_reservations: Arc<FaultyReservationRepository>,
    pub faulty_events: Arc<FaultyEventLog>,
    pub faulty_ledger: Arc<FaultyLedger>,
    pub notifications: Arc<RecordingNotificationGateway>,
    pub ratings: Arc<RecordingRatingGateway>,
    pub metrics: WorkflowMetrics,
}

pub fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn accommodation_a() -> AccommodationSummary {
    AccommodationSummary {
        id: "acc-A".into(),
        name: "Riverside Loft".into(),
        location: "Novi Sad".into(),
        host_id: "host-1".into(),
        min_guests: 1,
        max_guests: 4,
    }
}

pub fn auth() -> StaticAuthGateway {
    StaticAuthGateway::new()
        .with_user(
            GUEST,
            UserIdentity {
                id: "guest-1".into(),
                role: UserRole::Guest,
                username: "jane".into(),
            },
        )
        .with_user(
            OTHER_GUEST,
            UserIdentity {
                id: "guest-2".into(),
                role: UserRole::Guest,
                username: "john".into(),
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
        })
}

pub fn harness_on(today: &str) -> Harness {
    harness_with_auth(today, Arc::new(auth()))
}

pub fn harness_with_auth(today: &str, auth: Arc<dyn haven_core::AuthGateway>) -> Harness {
    let reservations = Arc::new(InMemoryReservationRepository::new());
    let events = Arc::new(InMemoryEventLog::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let notifications = Arc::new(RecordingNotificationGateway::new());
    let ratings = Arc::new(RecordingRatingGateway::new());
    let metrics = WorkflowMetrics::new().unwrap();
    let faulty_reservations = Arc::new(FaultyReservationRepository::new(reservations.clone()));
    let faulty_events = Arc::new(FaultyEventLog::new(events.clone()));
    let faulty_ledger = Arc::new(FaultyLedger::new(ledger.clone()));

    let orchestrator = ReservationOrchestrator::new(
        Collaborators {
            auth,
            accommodations: Arc::new(StaticAccommodationGateway::new().with(accommodation_a())),
            notifications: notifications.clone(),
            ratings: ratings.clone(),
        },
        Storage {
            reservations: faulty_reservations.clone(),
            events: faulty_events.clone(),
            ledger: faulty_ledger.clone(),
        },
        Arc::new(FixedClock::on(day(today))),
    )
    .with_metrics(metrics.clone());

    Harness {
        orchestrator: Arc::new(orchestrator),
        reservations,
        events,
        ledger,
        faulty_reservations,
        faulty_events,
        faulty_ledger,
        notifications,
        ratings,
        metrics,
    }
}

pub fn ctx() -> RequestContext {
    RequestContext::detached(Duration::from_secs(5))
}

pub fn may_request(guests: i64) -> CreateReservationRequest {
    serde_json::from_value(json!({
        "accommodationId": "acc-A",
        "checkInDate": "2026-05-01",
        "checkOutDate": "2026-05-05",
        "numberOfGuests": guests
    }))
    .unwrap()
}
