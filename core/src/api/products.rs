//! Product CRUD under `/productos`.

use std::sync::Arc;

use crate::client::{Body, SessionClient};
use crate::envelope::Envelope;
use crate::error::ClientError;
use crate::query::Params;
use crate::types::{ListQuery, NewProduct, ProductPatch};

#[derive(Debug, Clone)]
pub struct ProductsApi {
    client: Arc<SessionClient>,
}

impl ProductsApi {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }

    pub async fn create(&self, product: &NewProduct) -> Result<Envelope, ClientError> {
        self.client.post("/productos", Body::json(product)?).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Envelope, ClientError> {
        self.client.get("/productos", query.to_params()).await
    }

    pub async fn patch(&self, id: u64, patch: &ProductPatch) -> Result<Envelope, ClientError> {
        self.client.patch(&format!("/productos/{id}"), Body::json(patch)?).await
    }

    pub async fn remove(&self, id: u64) -> Result<Envelope, ClientError> {
        self.client.delete(&format!("/productos/{id}"), Params::new()).await
    }
}
