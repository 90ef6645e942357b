//! Session endpoints: login, register, profile, refresh, logout.

use std::sync::Arc;

use crate::client::{Body, SessionClient};
use crate::envelope::Envelope;
use crate::error::ClientError;
use crate::query::Params;
use crate::types::{Credentials, Registration};

/// `/auth/*` endpoints. The backend answers login and register by setting the
/// `access_token` / `refresh_token` cookie pair.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: Arc<SessionClient>,
}

impl AuthApi {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Envelope, ClientError> {
        self.client.post("/auth/login", Body::json(credentials)?).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<Envelope, ClientError> {
        self.client.post("/auth/register", Body::json(registration)?).await
    }

    /// `{ok, user}` for a live session, 401 otherwise.
    pub async fn profile(&self) -> Result<Envelope, ClientError> {
        self.client.get("/auth/profile", Params::new()).await
    }

    /// Explicit refresh. A 401 here is final; it never triggers another refresh.
    pub async fn refresh(&self) -> Result<Envelope, ClientError> {
        self.client.post("/auth/refresh", None).await
    }

    pub async fn logout(&self) -> Result<Envelope, ClientError> {
        self.client.post("/auth/logout", None).await
    }
}
