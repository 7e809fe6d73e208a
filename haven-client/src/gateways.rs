use std::sync::Arc;

use async_trait::async_trait;
use haven_core::{
    AccommodationGateway, AccommodationSummary, AuthGateway, GatewayError, HostContact,
    HostNotification, NotificationGateway, RatingGateway, RequestContext, Reservation,
    UserIdentity, UserRole,
};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;

use crate::client::ResilientClient;

pub const AUTH: &str = "auth";
pub const ACCOMMODATION: &str = "accommodation";
pub const NOTIFICATION: &str = "notification";
pub const RATING: &str = "rating";

/// Base URLs of the collaborating services, e.g. `https://auth-server:8080/api`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEndpoints {
    pub auth: String,
    pub accommodation: String,
    pub notification: String,
    pub rating: String,
}

impl ServiceEndpoints {
    /// Every service behind one base URL. Handy for a single mock server.
    pub fn single(base: &str) -> Self {
        Self {
            auth: base.to_string(),
            accommodation: base.to_string(),
            notification: base.to_string(),
            rating: base.to_string(),
        }
    }
}

/// Appends `segments` to `base`, each percent-encoded as exactly one path
/// segment, so ids taken from requests cannot climb out of the route or add
/// a query string.
fn endpoint(base: &str, dependency: &str, segments: &[&str]) -> Result<String, GatewayError> {
    let invalid = |reason: String| GatewayError::Unavailable {
        dependency: dependency.to_string(),
        reason,
    };
    let mut url = Url::parse(base).map_err(|e| invalid(format!("invalid base url {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("base url {} cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

#[derive(Deserialize)]
struct CurrentUserEnvelope {
    user: CurrentUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUser {
    id: String,
    user_role: UserRole,
    #[serde(default)]
    username: String,
}

#[derive(Deserialize)]
struct UserContactEnvelope {
    user: UserContact,
}

#[derive(Deserialize)]
struct UserContact {
    #[serde(default)]
    id: Option<String>,
    email: String,
    #[serde(default)]
    username: String,
}

#[derive(Deserialize)]
struct AccommodationPayload {
    accommodation_name: String,
    #[serde(default)]
    accommodation_location: String,
    host_id: String,
    #[serde(default)]
    accommodation_min_guests: i64,
    accommodation_max_guests: i64,
}

fn clamp_guests(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// HTTP implementations of every collaborator trait over one [`ResilientClient`].
#[derive(Clone)]
pub struct HttpServices {
    client: Arc<ResilientClient>,
    endpoints: ServiceEndpoints,
}

impl HttpServices {
    pub fn new(client: Arc<ResilientClient>, endpoints: ServiceEndpoints) -> Self {
        Self { client, endpoints }
    }
}

#[async_trait]
impl AuthGateway for HttpServices {
    async fn current_user(
        &self,
        ctx: &RequestContext,
        bearer: &str,
    ) -> Result<UserIdentity, GatewayError> {
        let url = endpoint(&self.endpoints.auth, AUTH, &["users", "currentUser"])?;
        let response = self
            .client
            .call(ctx, AUTH, Method::GET, &url, Some(bearer), None)
            .await?
            .expect_status(200)?;
        let envelope: CurrentUserEnvelope = response.json()?;
        Ok(UserIdentity {
            id: envelope.user.id,
            role: envelope.user.user_role,
            username: envelope.user.username,
        })
    }

    async fn user_contact(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        user_id: &str,
    ) -> Result<HostContact, GatewayError> {
        let url = endpoint(&self.endpoints.auth, AUTH, &["users", "getById", user_id])?;
        let response = self
            .client
            .call(ctx, AUTH, Method::GET, &url, Some(bearer), None)
            .await?
            .expect_status(200)?;
        let envelope: UserContactEnvelope = response.json()?;
        Ok(HostContact {
            id: envelope.user.id.unwrap_or_else(|| user_id.to_string()),
            email: envelope.user.email,
            username: envelope.user.username,
        })
    }
}

#[async_trait]
impl AccommodationGateway for HttpServices {
    async fn accommodation(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        accommodation_id: &str,
    ) -> Result<AccommodationSummary, GatewayError> {
        let url = endpoint(
            &self.endpoints.accommodation,
            ACCOMMODATION,
            &["accommodations", "get", accommodation_id],
        )?;
        let response = self
            .client
            .call(ctx, ACCOMMODATION, Method::GET, &url, Some(bearer), None)
            .await?
            .expect_status(200)?;
        let payload: AccommodationPayload = response.json()?;
        Ok(AccommodationSummary {
            id: accommodation_id.to_string(),
            name: payload.accommodation_name,
            location: payload.accommodation_location,
            host_id: payload.host_id,
            min_guests: clamp_guests(payload.accommodation_min_guests),
            max_guests: clamp_guests(payload.accommodation_max_guests),
        })
    }
}

#[async_trait]
impl NotificationGateway for HttpServices {
    async fn notify_host(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        notification: &HostNotification,
    ) -> Result<(), GatewayError> {
        let url = endpoint(&self.endpoints.notification, NOTIFICATION, &["notifications", "create"])?;
        let body = serde_json::to_value(notification).map_err(|e| GatewayError::Decode {
            dependency: NOTIFICATION.to_string(),
            reason: e.to_string(),
        })?;
        self.client
            .call(ctx, NOTIFICATION, Method::POST, &url, Some(bearer), Some(&body))
            .await?
            .expect_status(201)?;
        Ok(())
    }
}

#[async_trait]
impl RatingGateway for HttpServices {
    async fn register_stay(
        &self,
        ctx: &RequestContext,
        reservation: &Reservation,
    ) -> Result<(), GatewayError> {
        let url = endpoint(&self.endpoints.rating, RATING, &["rating", "createReservation"])?;
        let body = serde_json::to_value(reservation).map_err(|e| GatewayError::Decode {
            dependency: RATING.to_string(),
            reason: e.to_string(),
        })?;
        self.client
            .call(ctx, RATING, Method::POST, &url, None, Some(&body))
            .await?
            .expect_success()?;
        Ok(())
    }

    async fn drop_stay(
        &self,
        ctx: &RequestContext,
        accommodation_id: &str,
        guest_id: &str,
    ) -> Result<(), GatewayError> {
        let url = endpoint(&self.endpoints.rating, RATING, &["rating", "deleteReservation"])?;
        let body = json!({ "accommodationId": accommodation_id, "guestId": guest_id });
        self.client
            .call(ctx, RATING, Method::DELETE, &url, None, Some(&body))
            .await?
            .expect_success()?;
        Ok(())
    }
}
