use std::sync::Arc;

use haven_core::{
    AccommodationGateway, AuthGateway, AvailabilityLedger, Clock, EventLog, GatewayError,
    HostNotification, NotificationGateway, RatingGateway, RequestContext, Reservation,
    ReservationRepository, StayRange, StoreError, UserIdentity, UserRole,
};
use haven_shared::{Masked, ReservationEvent};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{service_label, ReservationError};
use crate::metrics::WorkflowMetrics;
use crate::models::{
    CancelOutcome, CheckAvailabilityRequest, CreateOutcome, CreateReservationRequest,
    SetPriceRequest,
};
use crate::validation::{
    require_accommodation_id, require_stay, validate_request, DEFAULT_MAX_STAY_NIGHTS,
};

/// Remote services the workflows call out to.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthGateway>,
    pub accommodations: Arc<dyn AccommodationGateway>,
    pub notifications: Arc<dyn NotificationGateway>,
    pub ratings: Arc<dyn RatingGateway>,
}

/// Local state the workflows own.
#[derive(Clone)]
pub struct Storage {
    pub reservations: Arc<dyn ReservationRepository>,
    pub events: Arc<dyn EventLog>,
    pub ledger: Arc<dyn AvailabilityLedger>,
}

/// Drives the create and cancel workflows step by step. Each step either
/// hands its result to the next or ends the workflow with a
/// [`ReservationError`].
pub struct ReservationOrchestrator {
    collaborators: Collaborators,
    storage: Storage,
    clock: Arc<dyn Clock>,
    metrics: Option<WorkflowMetrics>,
    max_stay_nights: u32,
}

impl ReservationOrchestrator {
    pub fn new(collaborators: Collaborators, storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self {
            collaborators,
            storage,
            clock,
            metrics: None,
            max_stay_nights: DEFAULT_MAX_STAY_NIGHTS,
        }
    }

    pub fn with_metrics(mut self, metrics: WorkflowMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Longest stay a request may ask for, in nights.
    pub fn with_max_stay_nights(mut self, nights: u32) -> Self {
        self.max_stay_nights = nights;
        self
    }

    fn record<T>(&self, workflow: &str, result: &Result<T, ReservationError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record(workflow, outcome);
        }
    }

    async fn authenticate(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        role: UserRole,
        denied: &str,
    ) -> Result<UserIdentity, ReservationError> {
        if bearer.trim().is_empty() {
            return Err(ReservationError::Unauthorized);
        }
        let user = match self.collaborators.auth.current_user(ctx, bearer).await {
            Ok(user) => user,
            Err(GatewayError::Rejected { status, .. }) => {
                warn!(status, "Caller could not be authenticated");
                return Err(ReservationError::Unauthorized);
            }
            Err(err) => {
                error!(error = %err, "Authentication call failed");
                return Err(ReservationError::from_dependency(err));
            }
        };
        if user.role != role {
            warn!(user_id = %user.id, "Permission denied for role {:?}", user.role);
            return Err(ReservationError::Forbidden(denied.to_string()));
        }
        debug!(user_id = %user.id, "Caller authenticated");
        Ok(user)
    }

    async fn fetch_accommodation(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        accommodation_id: &str,
    ) -> Result<haven_core::AccommodationSummary, ReservationError> {
        match self
            .collaborators
            .accommodations
            .accommodation(ctx, bearer, accommodation_id)
            .await
        {
            Ok(accommodation) => {
                debug!(accommodation_id, host_id = %accommodation.host_id, "Accommodation resolved");
                Ok(accommodation)
            }
            Err(GatewayError::Rejected { .. }) => Err(ReservationError::NotFound(
                "Accommodation with that id does not exist.".to_string(),
            )),
            Err(err) => {
                error!(error = %err, "Accommodation lookup failed");
                Err(ReservationError::from_dependency(err))
            }
        }
    }

    async fn notify(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        host_id: &str,
        build: impl FnOnce(&str, &str) -> HostNotification,
    ) -> Result<(), ReservationError> {
        let contact = match self.collaborators.auth.user_contact(ctx, bearer, host_id).await {
            Ok(contact) => contact,
            Err(GatewayError::Rejected { .. }) => {
                return Err(ReservationError::NotFound(
                    "Host with that id does not exist.".to_string(),
                ))
            }
            Err(err) => return Err(ReservationError::from_dependency(err)),
        };
        let notification = build(&contact.email, &contact.username);
        self.collaborators
            .notifications
            .notify_host(ctx, bearer, &notification)
            .await
            .map_err(|err| {
                error!(error = %err, host_id, "Host notification failed");
                ReservationError::from_dependency(err)
            })?;
        info!(host_id, host_email = %Masked(contact.email.as_str()), "Host notified");
        Ok(())
    }

    /// Create a reservation for the calling guest.
    ///
    /// Nights are booked on the ledger with a single check-and-book before
    /// the record is written; a failed write gives them back. Steps after
    /// the write cannot undo it, so their failures come back as
    /// [`ReservationError::AfterCommit`] carrying the stored id.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        req: CreateReservationRequest,
    ) -> Result<CreateOutcome, ReservationError> {
        let span = info_span!("reservation.create", trace_id = %ctx.trace.trace_id());
        let result = self.create_steps(ctx, bearer, req).instrument(span).await;
        self.record("create", &result);
        result
    }

    async fn create_steps(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        req: CreateReservationRequest,
    ) -> Result<CreateOutcome, ReservationError> {
        let guest = self
            .authenticate(
                ctx,
                bearer,
                UserRole::Guest,
                "Permission denied. Only guests can create reservations",
            )
            .instrument(info_span!("reservation.create.authenticate"))
            .await?;

        let accommodation_id = require_accommodation_id(&req)?;
        let accommodation = self
            .fetch_accommodation(ctx, bearer, &accommodation_id)
            .instrument(info_span!("reservation.create.fetch_accommodation", accommodation_id = %accommodation_id))
            .await?;

        let today = self.clock.today();
        let new = info_span!("reservation.create.validate").in_scope(|| {
            let validated = validate_request(
                &guest.id,
                &accommodation_id,
                &req,
                &accommodation,
                today,
                self.max_stay_nights,
            );
            if let Err(err) = &validated {
                info!(error = %err, "Request rejected by validation");
            }
            validated
        })?;
        let stay = new.stay;

        async {
            let exists = self
                .storage
                .reservations
                .has_active(&guest.id, &accommodation_id, stay.check_in)
                .await?;
            if exists {
                info!(guest_id = %guest.id, "Duplicate reservation attempt");
                return Err(StoreError::Duplicate {
                    guest_id: guest.id.clone(),
                    accommodation_id: accommodation_id.clone(),
                    check_in: stay.check_in,
                }
                .into());
            }
            Ok::<(), ReservationError>(())
        }
        .instrument(info_span!("reservation.create.check_duplicate"))
        .await?;

        async {
            if !self.storage.ledger.try_book(&accommodation_id, &stay).await? {
                info!(nights = stay.len_days(), "Requested nights are taken");
                return Err(ReservationError::Unavailable(
                    "Accommodation is not available for the requested dates.".to_string(),
                ));
            }
            debug!(nights = stay.len_days(), "Nights booked on the ledger");
            Ok::<(), ReservationError>(())
        }
        .instrument(info_span!("reservation.create.book_nights", accommodation_id = %accommodation_id))
        .await?;

        let reservation = Reservation::from_new(new, &accommodation);
        let reservation_id = reservation.reservation_id;
        async {
            if let Err(err) = self.storage.reservations.insert(&reservation).await {
                error!(error = %err, "Reservation was not stored");
                self.compensate_booking(&accommodation_id, &stay)
                    .instrument(info_span!("reservation.create.compensate"))
                    .await;
                return Err(ReservationError::from(err));
            }
            info!(guest_id = %guest.id, "Reservation stored");
            Ok(())
        }
        .instrument(info_span!("reservation.create.persist", reservation_id = %reservation_id))
        .await?;

        async {
            match self.collaborators.ratings.register_stay(ctx, &reservation).await {
                Ok(()) => debug!("Stay registered for rating"),
                Err(err) => warn!(error = %err, "Rating service did not register the stay"),
            }
        }
        .instrument(info_span!("reservation.create.register_rating", reservation_id = %reservation_id))
        .await;

        self.notify(ctx, bearer, &accommodation.host_id, |email, host_name| {
            HostNotification::new_reservation(
                &accommodation.host_id,
                email,
                host_name,
                &accommodation.name,
                &guest.username,
            )
        })
        .instrument(info_span!("reservation.create.notify_host", reservation_id = %reservation_id))
        .await
        .map_err(|err| ReservationError::after_commit(reservation_id, err))?;

        self.record_event(
            ReservationEvent::reserved(&guest.id, &accommodation_id),
            reservation_id,
            "Failed to record reservation event.",
        )
        .instrument(info_span!("reservation.create.record_event", reservation_id = %reservation_id))
        .await?;

        let total_price = async {
            match self.storage.ledger.quote(&accommodation_id, &stay).await {
                Ok(price) => {
                    debug!(total_price = ?price, "Stay quoted");
                    price
                }
                Err(err) => {
                    warn!(error = %err, "Price quote unavailable");
                    None
                }
            }
        }
        .instrument(info_span!("reservation.create.quote"))
        .await;

        Ok(CreateOutcome {
            reservation,
            total_price,
        })
    }

    /// Gives back nights booked for a reservation that was never stored.
    async fn compensate_booking(&self, accommodation_id: &str, stay: &StayRange) {
        match self.storage.ledger.release(accommodation_id, stay).await {
            Ok(()) => info!(accommodation_id, "Booked nights released after failed insert"),
            Err(err) => error!(error = %err, accommodation_id, "Compensating release failed"),
        }
    }

    async fn record_event(
        &self,
        event: ReservationEvent,
        reservation_id: Uuid,
        failure: &str,
    ) -> Result<(), ReservationError> {
        match self.storage.events.append(&event).await {
            Ok(()) => {
                debug!(event = event.event.as_str(), "Event recorded");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, event = event.event.as_str(), "Failed to record event");
                Err(ReservationError::after_commit(
                    reservation_id,
                    ReservationError::InternalError(failure.to_string()),
                ))
            }
        }
    }

    /// Cancel one of the calling guest's reservations.
    ///
    /// Rating and notification calls are best-effort: their failures end up
    /// in [`CancelOutcome::warnings`] and the cancellation stands.
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        reservation_id: Uuid,
    ) -> Result<CancelOutcome, ReservationError> {
        let span = info_span!(
            "reservation.cancel",
            trace_id = %ctx.trace.trace_id(),
            reservation_id = %reservation_id
        );
        let result = self.cancel_steps(ctx, bearer, reservation_id).instrument(span).await;
        self.record("cancel", &result);
        result
    }

    async fn cancel_steps(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        reservation_id: Uuid,
    ) -> Result<CancelOutcome, ReservationError> {
        let guest = self
            .authenticate(
                ctx,
                bearer,
                UserRole::Guest,
                "Permission denied. Only guests can cancel reservations",
            )
            .instrument(info_span!("reservation.cancel.authenticate"))
            .await?;

        let today = self.clock.today();
        let existing = async {
            let existing = self.storage.reservations.find(&guest.id, reservation_id).await?;
            if existing.is_canceled {
                info!("Reservation is already canceled");
                return Err(ReservationError::AlreadyCanceled(reservation_id));
            }
            if today >= existing.check_in_date {
                info!(check_in = %existing.check_in_date, "Cancellation window is closed");
                return Err(StoreError::CancellationClosed {
                    reservation_id,
                    check_in: existing.check_in_date,
                }
                .into());
            }
            Ok::<_, ReservationError>(existing)
        }
        .instrument(info_span!("reservation.cancel.load"))
        .await?;

        let mut warnings = Vec::new();
        async {
            match self
                .collaborators
                .ratings
                .drop_stay(ctx, &existing.accommodation_id, &guest.id)
                .await
            {
                Ok(()) => debug!("Rating record dropped"),
                Err(err) => {
                    warn!(error = %err, "Rating record was not dropped");
                    warnings.push(format!(
                        "{} service could not drop the rating record.",
                        service_label(err.dependency())
                    ));
                }
            }
        }
        .instrument(info_span!("reservation.cancel.drop_rating"))
        .await;

        let canceled = async {
            let canceled = self
                .storage
                .reservations
                .cancel(&guest.id, reservation_id, today)
                .await?;
            info!(guest_id = %guest.id, "Reservation canceled");
            Ok::<_, ReservationError>(canceled)
        }
        .instrument(info_span!("reservation.cancel.mark_canceled"))
        .await?;

        let stay = canceled.stay();
        async {
            match self.storage.ledger.release(&canceled.accommodation_id, &stay).await {
                Ok(()) => {
                    debug!(nights = stay.len_days(), "Nights released");
                    Ok(())
                }
                Err(err) => {
                    error!(error = %err, "Ledger release failed after cancellation");
                    Err(ReservationError::after_commit(
                        reservation_id,
                        ReservationError::InternalError("Failed to release the booked dates.".to_string()),
                    ))
                }
            }
        }
        .instrument(info_span!("reservation.cancel.release_nights"))
        .await?;

        async {
            let notified = match self.fetch_accommodation(ctx, bearer, &canceled.accommodation_id).await {
                Ok(accommodation) => {
                    self.notify(ctx, bearer, &accommodation.host_id, |email, host_name| {
                        HostNotification::cancellation(
                            &accommodation.host_id,
                            email,
                            host_name,
                            &accommodation.name,
                            &guest.username,
                        )
                    })
                    .await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = notified {
                warn!(error = %err, "Host was not notified of the cancellation");
                warnings.push(format!("Host was not notified: {}", err));
            }
        }
        .instrument(info_span!("reservation.cancel.notify_host"))
        .await;

        self.record_event(
            ReservationEvent::cancelled(&guest.id, &canceled.accommodation_id),
            reservation_id,
            "Failed to record cancellation event.",
        )
        .instrument(info_span!("reservation.cancel.record_event"))
        .await?;

        Ok(CancelOutcome {
            reservation: canceled,
            warnings,
        })
    }

    /// Active reservations of the calling guest. An empty list is reported
    /// as `NotFound`.
    pub async fn list_active(
        &self,
        ctx: &RequestContext,
        bearer: &str,
    ) -> Result<Vec<Reservation>, ReservationError> {
        let guest = self
            .authenticate(
                ctx,
                bearer,
                UserRole::Guest,
                "Permission denied. Only guests can view their reservations",
            )
            .await?;
        let reservations = self.storage.reservations.list_active(&guest.id).await?;
        if reservations.is_empty() {
            return Err(ReservationError::NotFound("No reservations found.".to_string()));
        }
        Ok(reservations)
    }

    pub async fn upcoming_count(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        accommodation_id: &str,
    ) -> Result<u64, ReservationError> {
        self.authenticate(
            ctx,
            bearer,
            UserRole::Host,
            "Permission denied. Only hosts can view upcoming reservations",
        )
        .await?;
        let today = self.clock.today();
        Ok(self
            .storage
            .reservations
            .count_upcoming_by_accommodation(accommodation_id, today)
            .await?)
    }

    pub async fn host_total(&self, host_id: &str) -> Result<u64, ReservationError> {
        Ok(self.storage.reservations.count_active_by_host(host_id).await?)
    }

    pub async fn host_cancelled_percentage(&self, host_id: &str) -> Result<f64, ReservationError> {
        Ok(self.storage.reservations.cancelled_ratio(host_id).await?)
    }

    pub async fn host_total_duration(&self, host_id: &str) -> Result<i64, ReservationError> {
        Ok(self.storage.reservations.total_stay_duration_days(host_id).await?)
    }

    pub async fn check_availability(
        &self,
        accommodation_id: &str,
        req: CheckAvailabilityRequest,
    ) -> Result<(), ReservationError> {
        let stay = require_stay(req.check_in_date, req.check_out_date, self.max_stay_nights)?;
        if self.storage.ledger.is_available(accommodation_id, &stay).await? {
            Ok(())
        } else {
            Err(ReservationError::Unavailable(
                "Accommodation is not available for the requested dates.".to_string(),
            ))
        }
    }

    /// Set one nightly price over a range. Only the owning host may do this.
    pub async fn set_prices(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        accommodation_id: &str,
        req: SetPriceRequest,
    ) -> Result<(), ReservationError> {
        let host = self
            .authenticate(
                ctx,
                bearer,
                UserRole::Host,
                "Permission denied. Only hosts can set prices",
            )
            .await?;
        let stay = require_stay(req.start_date, req.end_date, self.max_stay_nights)?;
        let Some(price) = req.price else {
            return Err(ReservationError::validation("price", "Field price is required"));
        };

        let accommodation = self.fetch_accommodation(ctx, bearer, accommodation_id).await?;
        if accommodation.host_id != host.id {
            return Err(ReservationError::Forbidden(
                "Permission denied. You do not own this accommodation".to_string(),
            ));
        }

        self.storage.ledger.set_price(accommodation_id, &stay, price).await?;
        info!(accommodation_id, nights = stay.len_days(), price, "Nightly price set");
        Ok(())
    }
}
