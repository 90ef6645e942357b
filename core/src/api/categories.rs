//! Category CRUD under `/categorias`.

use std::sync::Arc;

use crate::client::{Body, SessionClient};
use crate::envelope::Envelope;
use crate::error::ClientError;
use crate::query::Params;
use crate::types::{CategoryInput, ListQuery};

#[derive(Debug, Clone)]
pub struct CategoriesApi {
    client: Arc<SessionClient>,
}

impl CategoriesApi {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }

    pub async fn create(&self, category: &CategoryInput) -> Result<Envelope, ClientError> {
        self.client.post("/categorias", Body::json(category)?).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Envelope, ClientError> {
        self.client.get("/categorias", query.to_params()).await
    }

    pub async fn patch(&self, id: u64, category: &CategoryInput) -> Result<Envelope, ClientError> {
        self.client.patch(&format!("/categorias/{id}"), Body::json(category)?).await
    }

    pub async fn remove(&self, id: u64) -> Result<Envelope, ClientError> {
        self.client.delete(&format!("/categorias/{id}"), Params::new()).await
    }
}
