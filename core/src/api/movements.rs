//! Stock movement history under `/movimientos` and its CSV export link.

use std::sync::Arc;

use crate::client::SessionClient;
use crate::envelope::Envelope;
use crate::error::ClientError;
use crate::types::ListQuery;

/// Stock movement history. Read-only from the admin front end.
#[derive(Debug, Clone)]
pub struct MovementsApi {
    client: Arc<SessionClient>,
}

impl MovementsApi {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }

    pub async fn history(&self, query: &ListQuery) -> Result<Envelope, ClientError> {
        self.client.get("/movimientos", query.to_params()).await
    }

    /// Download link for the CSV export. Fetched by the browser with its own
    /// cookies, so it is only a URL here.
    pub fn export_csv_url(&self) -> String {
        format!("{}/movimientos/export", self.client.base_url())
    }
}
