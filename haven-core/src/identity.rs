use async_trait::async_trait;

use crate::context::RequestContext;
use crate::gateway::GatewayError;
use crate::model::{HostContact, UserIdentity};

/// Client side of the auth service.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Resolve the caller behind a bearer token (`GET /users/currentUser`).
    async fn current_user(
        &self,
        ctx: &RequestContext,
        bearer: &str,
    ) -> Result<UserIdentity, GatewayError>;

    /// Contact details for a user id (`GET /users/getById/{id}`).
    async fn user_contact(
        &self,
        ctx: &RequestContext,
        bearer: &str,
        user_id: &str,
    ) -> Result<HostContact, GatewayError>;
}
