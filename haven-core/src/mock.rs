//! In-process collaborators for local runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use haven_shared::ReservationEvent;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::gateway::{
    AccommodationGateway, GatewayError, HostNotification, NotificationGateway, RatingGateway,
};
use crate::identity::AuthGateway;
use crate::ledger::{AvailabilityLedger, LedgerError};
use crate::model::{AccommodationSummary, HostContact, Reservation, StayRange, UserIdentity};
use crate::repository::{EventLog, ReservationRepository, StoreError};

fn rejected(dependency: &str, status: u16, message: &str) -> GatewayError {
    GatewayError::Rejected {
        dependency: dependency.to_string(),
        status,
        message: message.to_string(),
    }
}

/// Auth backed by a fixed token table.
#[derive(Default)]
pub struct StaticAuthGateway {
    tokens: HashMap<String, UserIdentity>,
    contacts: HashMap<String, HostContact>,
}

impl StaticAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user: UserIdentity) -> Self {
        self.tokens.insert(token.to_string(), user);
        self
    }

    pub fn with_contact(mut self, contact: HostContact) -> Self {
        self.contacts.insert(contact.id.clone(), contact);
        self
    }
}

#[async_trait]
impl AuthGateway for StaticAuthGateway {
    async fn current_user(
        &self,
        _ctx: &RequestContext,
        bearer: &str,
    ) -> Result<UserIdentity, GatewayError> {
        self.tokens
            .get(bearer)
            .cloned()
            .ok_or_else(|| rejected("auth", 401, "unknown token"))
    }

    async fn user_contact(
        &self,
        _ctx: &RequestContext,
        _bearer: &str,
        user_id: &str,
    ) -> Result<HostContact, GatewayError> {
        self.contacts
            .get(user_id)
            .cloned()
            .ok_or_else(|| rejected("auth", 404, "user not found"))
    }
}

#[derive(Default)]
pub struct StaticAccommodationGateway {
    accommodations: HashMap<String, AccommodationSummary>,
}

impl StaticAccommodationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, accommodation: AccommodationSummary) -> Self {
        self.accommodations
            .insert(accommodation.id.clone(), accommodation);
        self
    }
}

#[async_trait]
impl AccommodationGateway for StaticAccommodationGateway {
    async fn accommodation(
        &self,
        _ctx: &RequestContext,
        _bearer: &str,
        accommodation_id: &str,
    ) -> Result<AccommodationSummary, GatewayError> {
        self.accommodations
            .get(accommodation_id)
            .cloned()
            .ok_or_else(|| rejected("accommodation", 404, "accommodation not found"))
    }
}

/// Keeps every notification it was asked to send. Flip `failing` to make
/// it answer as if the notification service were down.
#[derive(Default)]
pub struct RecordingNotificationGateway {
    sent: Mutex<Vec<HostNotification>>,
    failing: AtomicBool,
}

impl RecordingNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<HostNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotificationGateway {
    async fn notify_host(
        &self,
        _ctx: &RequestContext,
        _bearer: &str,
        notification: &HostNotification,
    ) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable {
                dependency: "notification".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingCall {
    Register { reservation_id: Uuid },
    Drop { accommodation_id: String, guest_id: String },
}

#[derive(Default)]
pub struct RecordingRatingGateway {
    calls: Mutex<Vec<RatingCall>>,
    failing: AtomicBool,
}

impl RecordingRatingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RatingCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: RatingCall) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable {
                dependency: "rating".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        Ok(())
    }
}

#[async_trait]
impl RatingGateway for RecordingRatingGateway {
    async fn register_stay(
        &self,
        _ctx: &RequestContext,
        reservation: &Reservation,
    ) -> Result<(), GatewayError> {
        self.record(RatingCall::Register {
            reservation_id: reservation.reservation_id,
        })
    }

    async fn drop_stay(
        &self,
        _ctx: &RequestContext,
        accommodation_id: &str,
        guest_id: &str,
    ) -> Result<(), GatewayError> {
        self.record(RatingCall::Drop {
            accommodation_id: accommodation_id.to_string(),
            guest_id: guest_id.to_string(),
        })
    }
}

/// Wraps a real reservation store and fails `insert` on demand.
pub struct FaultyReservationRepository {
    inner: Arc<dyn ReservationRepository>,
    fail_inserts: AtomicBool,
}

impl FaultyReservationRepository {
    pub fn new(inner: Arc<dyn ReservationRepository>) -> Self {
        Self {
            inner,
            fail_inserts: AtomicBool::new(false),
        }
    }

    pub fn set_failing_inserts(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }
}

fn backend_down() -> StoreError {
    StoreError::Backend("connection reset by peer".to_string())
}

#[async_trait]
impl ReservationRepository for FaultyReservationRepository {
    async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(backend_down());
        }
        self.inner.insert(reservation).await
    }

    async fn has_active(
        &self,
        guest_id: &str,
        accommodation_id: &str,
        check_in: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.inner.has_active(guest_id, accommodation_id, check_in).await
    }

    async fn find(&self, guest_id: &str, reservation_id: Uuid) -> Result<Reservation, StoreError> {
        self.inner.find(guest_id, reservation_id).await
    }

    async fn cancel(
        &self,
        guest_id: &str,
        reservation_id: Uuid,
        today: NaiveDate,
    ) -> Result<Reservation, StoreError> {
        self.inner.cancel(guest_id, reservation_id, today).await
    }

    async fn list_active(&self, guest_id: &str) -> Result<Vec<Reservation>, StoreError> {
        self.inner.list_active(guest_id).await
    }

    async fn count_active_by_host(&self, host_id: &str) -> Result<u64, StoreError> {
        self.inner.count_active_by_host(host_id).await
    }

    async fn cancelled_ratio(&self, host_id: &str) -> Result<f64, StoreError> {
        self.inner.cancelled_ratio(host_id).await
    }

    async fn total_stay_duration_days(&self, host_id: &str) -> Result<i64, StoreError> {
        self.inner.total_stay_duration_days(host_id).await
    }

    async fn count_upcoming_by_accommodation(
        &self,
        accommodation_id: &str,
        today: NaiveDate,
    ) -> Result<u64, StoreError> {
        self.inner.count_upcoming_by_accommodation(accommodation_id, today).await
    }
}

/// Wraps a real event log and fails every append while `failing` is set.
pub struct FaultyEventLog {
    inner: Arc<dyn EventLog>,
    failing: AtomicBool,
}

impl FaultyEventLog {
    pub fn new(inner: Arc<dyn EventLog>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventLog for FaultyEventLog {
    async fn append(&self, event: &ReservationEvent) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(backend_down());
        }
        self.inner.append(event).await
    }
}

/// Wraps a real ledger and fails `release` on demand.
pub struct FaultyLedger {
    inner: Arc<dyn AvailabilityLedger>,
    fail_releases: AtomicBool,
}

impl FaultyLedger {
    pub fn new(inner: Arc<dyn AvailabilityLedger>) -> Self {
        Self {
            inner,
            fail_releases: AtomicBool::new(false),
        }
    }

    pub fn set_failing_releases(&self, failing: bool) {
        self.fail_releases.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AvailabilityLedger for FaultyLedger {
    async fn is_available(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError> {
        self.inner.is_available(accommodation_id, stay).await
    }

    async fn try_book(&self, accommodation_id: &str, stay: &StayRange) -> Result<bool, LedgerError> {
        self.inner.try_book(accommodation_id, stay).await
    }

    async fn book(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError> {
        self.inner.book(accommodation_id, stay).await
    }

    async fn release(&self, accommodation_id: &str, stay: &StayRange) -> Result<(), LedgerError> {
        if self.fail_releases.load(Ordering::SeqCst) {
            return Err(LedgerError::Backend("ledger unreachable".to_string()));
        }
        self.inner.release(accommodation_id, stay).await
    }

    async fn set_price(&self, accommodation_id: &str, stay: &StayRange, price: f64) -> Result<(), LedgerError> {
        self.inner.set_price(accommodation_id, stay, price).await
    }

    async fn quote(&self, accommodation_id: &str, stay: &StayRange) -> Result<Option<f64>, LedgerError> {
        self.inner.quote(accommodation_id, stay).await
    }
}
