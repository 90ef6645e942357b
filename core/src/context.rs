//! Application context: the one client instance and everything built on it.

use std::sync::Arc;

use crate::api::{AuthApi, CategoriesApi, MovementsApi, ProductsApi, UsersApi};
use crate::client::SessionClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::services::{CategoriesService, MovementsService, ProductsService, UsersAdminService, UsersService};
use crate::session::AuthService;
use crate::transport::{ReqwestTransport, Transport};

/// Built once at startup and passed to whatever needs the backend. Every API
/// wrapper shares the same `SessionClient`, and therefore the same refresh
/// coordination.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub client: Arc<SessionClient>,
    pub auth: Arc<AuthService>,
    pub products: ProductsApi,
    pub categories: CategoriesApi,
    pub movements: MovementsApi,
    pub users: UsersApi,
}

impl AppContext {
    /// Build the context over a cookie-keeping `reqwest` transport.
    pub fn init(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(config)?;
        Self::with_transport(&config.base_url, Arc::new(transport))
    }

    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        let client = Arc::new(SessionClient::new(base_url, transport)?);
        Ok(Self {
            auth: Arc::new(AuthService::new(AuthApi::new(Arc::clone(&client)))),
            products: ProductsApi::new(Arc::clone(&client)),
            categories: CategoriesApi::new(Arc::clone(&client)),
            movements: MovementsApi::new(Arc::clone(&client)),
            users: UsersApi::new(Arc::clone(&client)),
            client,
        })
    }

    pub fn products_service(&self) -> ProductsService {
        ProductsService::new(self.products.clone())
    }

    pub fn categories_service(&self) -> CategoriesService {
        CategoriesService::new(self.categories.clone())
    }

    pub fn movements_service(&self) -> MovementsService {
        MovementsService::new(self.movements.clone())
    }

    pub fn users_service(&self) -> UsersService {
        UsersService::new(self.users.clone())
    }

    pub fn users_admin_service(&self) -> UsersAdminService {
        UsersAdminService::new(self.users.clone())
    }
}
