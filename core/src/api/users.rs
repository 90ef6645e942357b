//! User directory, admin user management and the signed-in user's avatar.

use std::sync::Arc;

use crate::client::{Body, SessionClient};
use crate::envelope::Envelope;
use crate::error::ClientError;
use crate::http::MultipartForm;
use crate::query::Params;
use crate::types::{ListQuery, NewUser, UserPatch};

#[derive(Debug, Clone)]
pub struct UsersApi {
    client: Arc<SessionClient>,
}

impl UsersApi {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }

    /// Directory visible to every signed-in user.
    pub async fn list_public(&self, query: &ListQuery) -> Result<Envelope, ClientError> {
        self.client.get("/usuarios/public", query.to_params()).await
    }

    pub async fn list_admin(&self, query: &ListQuery) -> Result<Envelope, ClientError> {
        self.client.get("/usuarios/admin", query.to_params()).await
    }

    pub async fn create(&self, user: &NewUser) -> Result<Envelope, ClientError> {
        self.client.post("/usuarios/admin", Body::json(user)?).await
    }

    pub async fn update_partial(&self, id: u64, patch: &UserPatch) -> Result<Envelope, ClientError> {
        self.client.patch(&format!("usuarios/admin/{id}"), Body::json(patch)?).await
    }

    pub async fn upload_avatar(&self, form: MultipartForm) -> Result<Envelope, ClientError> {
        self.client.post("usuarios/me/avatar", Body::from(form)).await
    }

    pub async fn remove(&self, id: u64) -> Result<Envelope, ClientError> {
        self.client.delete(&format!("usuarios/admin/{id}"), Params::new()).await
    }
}
