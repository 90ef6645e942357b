//! List/CRUD services for the admin pages.
//!
//! Each service owns a `PagedList` and the matching API wrapper, and turns
//! envelopes into `ServiceError` codes the pages can show. A 401 that survives
//! the client's refresh shows up as the endpoint's generic failure code; pages
//! check the session through `AuthService` before loading.

use serde_json::Value;

use crate::api::{CategoriesApi, MovementsApi, ProductsApi, UsersApi};
use crate::envelope::Envelope;
use crate::error::ServiceError;
use crate::http::MultipartForm;
use crate::paging::{ListCodes, PagedList};
use crate::types::{CategoryInput, NewProduct, NewUser, OrderDir, ProductPatch, UserPatch};

const DEFAULT_LIMIT: u32 = 10;

/// `Rejected` with the backend's code when it is one of `known`, else `fallback`.
fn rejected(envelope: &Envelope, known: &[&'static str], fallback: &'static str) -> ServiceError {
    let code = envelope
        .error_code()
        .and_then(|code| known.iter().copied().find(|k| *k == code))
        .unwrap_or(fallback);
    ServiceError::Rejected(code)
}

fn ensure_ok(envelope: &Envelope, fallback: &'static str) -> Result<(), ServiceError> {
    if envelope.ok {
        Ok(())
    } else {
        Err(ServiceError::Rejected(fallback))
    }
}

#[derive(Debug)]
pub struct ProductsService {
    api: ProductsApi,
    list: PagedList,
}

impl ProductsService {
    const LIST: ListCodes = ListCodes {
        failed: "PRODUCTS_LIST_FAILED",
        invalid: "PRODUCTS_LIST_INVALID_RESPONSE",
    };

    pub fn new(api: ProductsApi) -> Self {
        Self {
            api,
            list: PagedList::new("createdAt", OrderDir::Desc, DEFAULT_LIMIT),
        }
    }

    pub fn list(&self) -> &PagedList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut PagedList {
        &mut self.list
    }

    pub async fn load_page(&mut self, page: u32) -> Result<(), ServiceError> {
        let api = &self.api;
        self.list
            .load(page, Self::LIST, |query| async move { api.list(&query).await })
            .await
    }

    pub async fn create(&self, product: &NewProduct) -> Result<(), ServiceError> {
        let envelope = self.api.create(product).await?;
        if envelope.ok {
            return Ok(());
        }
        Err(rejected(&envelope, &["PRODUCT_NAME_TOO_SHORT"], "PRODUCT_CREATE_FAILED"))
    }

    pub async fn patch(&self, id: u64, patch: &ProductPatch) -> Result<(), ServiceError> {
        let envelope = self.api.patch(id, patch).await?;
        ensure_ok(&envelope, "PRODUCT_UPDATE_FAILED")
    }

    pub async fn remove(&self, id: u64) -> Result<(), ServiceError> {
        let envelope = self.api.remove(id).await?;
        if envelope.error_code() == Some("PRODUCT_IN_USE") {
            return Err(ServiceError::Rejected("PRODUCT_HAS_MOVEMENTS"));
        }
        ensure_ok(&envelope, "PRODUCT_DELETE_FAILED")
    }
}

#[derive(Debug)]
pub struct CategoriesService {
    api: CategoriesApi,
    list: PagedList,
}

impl CategoriesService {
    const LIST: ListCodes = ListCodes {
        failed: "CATEGORIES_LIST_FAILED",
        invalid: "CATEGORIES_LIST_INVALID_RESPONSE",
    };

    pub fn new(api: CategoriesApi) -> Self {
        Self {
            api,
            list: PagedList::new("createdAt", OrderDir::Desc, DEFAULT_LIMIT),
        }
    }

    pub fn list(&self) -> &PagedList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut PagedList {
        &mut self.list
    }

    pub async fn load_page(&mut self, page: u32) -> Result<(), ServiceError> {
        let api = &self.api;
        self.list
            .load(page, Self::LIST, |query| async move { api.list(&query).await })
            .await
    }

    pub async fn create(&self, category: &CategoryInput) -> Result<(), ServiceError> {
        let envelope = self.api.create(category).await?;
        ensure_ok(&envelope, "CATEGORY_CREATE_FAILED")
    }

    pub async fn patch(&self, id: u64, category: &CategoryInput) -> Result<(), ServiceError> {
        if id == 0 {
            return Err(ServiceError::Validation("CATEGORIA_UPDATE_INVALID_ID"));
        }
        let envelope = self.api.patch(id, category).await?;
        ensure_ok(&envelope, "CATEGORY_UPDATE_FAILED")
    }

    pub async fn remove(&self, id: u64) -> Result<(), ServiceError> {
        if id == 0 {
            return Err(ServiceError::Validation("CATEGORIA_DELETE_INVALID_ID"));
        }
        let envelope = self.api.remove(id).await?;
        ensure_ok(&envelope, "CATEGORY_DELETE_FAILED")
    }
}

#[derive(Debug)]
pub struct MovementsService {
    api: MovementsApi,
    list: PagedList,
}

impl MovementsService {
    const LIST: ListCodes = ListCodes {
        failed: "MOVIMIENTOS_LIST_FAILED",
        invalid: "MOVIMIENTOS_LIST_INVALID_RESPONSE",
    };

    pub fn new(api: MovementsApi) -> Self {
        Self {
            api,
            list: PagedList::new("fecha", OrderDir::Desc, DEFAULT_LIMIT),
        }
    }

    pub fn list(&self) -> &PagedList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut PagedList {
        &mut self.list
    }

    pub async fn load_page(&mut self, page: u32) -> Result<(), ServiceError> {
        let api = &self.api;
        self.list
            .load(page, Self::LIST, |query| async move { api.history(&query).await })
            .await
    }

    pub fn export_csv_url(&self) -> String {
        self.api.export_csv_url()
    }
}

/// Public user directory and the signed-in user's own avatar.
#[derive(Debug)]
pub struct UsersService {
    api: UsersApi,
    list: PagedList,
}

impl UsersService {
    const LIST: ListCodes = ListCodes {
        failed: "USERS_LIST_FAILED",
        invalid: "USERS_LIST_INVALID_RESPONSE",
    };

    pub fn new(api: UsersApi) -> Self {
        Self {
            api,
            list: PagedList::new("createdAt", OrderDir::Desc, DEFAULT_LIMIT),
        }
    }

    pub fn list(&self) -> &PagedList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut PagedList {
        &mut self.list
    }

    pub async fn load_page(&mut self, page: u32) -> Result<(), ServiceError> {
        let api = &self.api;
        self.list
            .load(page, Self::LIST, |query| async move { api.list_public(&query).await })
            .await
    }

    /// Upload a new avatar. Returns the backend payload.
    pub async fn upload_avatar(&self, form: MultipartForm) -> Result<Option<Value>, ServiceError> {
        if form.is_empty() {
            return Err(ServiceError::Validation("FILE_REQUIRED"));
        }
        let envelope = self.api.upload_avatar(form).await?;
        ensure_ok(&envelope, "USERS_AVATAR_FAILED")?;
        Ok(envelope.data)
    }
}

/// User administration. Admin-only on the backend.
#[derive(Debug)]
pub struct UsersAdminService {
    api: UsersApi,
    list: PagedList,
}

impl UsersAdminService {
    const LIST: ListCodes = ListCodes {
        failed: "USERS_LIST_ADMIN_FAILED",
        invalid: "USERS_LIST_INVALID_RESPONSE",
    };

    pub fn new(api: UsersApi) -> Self {
        Self {
            api,
            list: PagedList::new("createdAt", OrderDir::Desc, DEFAULT_LIMIT),
        }
    }

    pub fn list(&self) -> &PagedList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut PagedList {
        &mut self.list
    }

    pub async fn load_page(&mut self, page: u32) -> Result<(), ServiceError> {
        let api = &self.api;
        self.list
            .load(page, Self::LIST, |query| async move { api.list_admin(&query).await })
            .await
    }

    pub async fn create(&self, user: &NewUser) -> Result<(), ServiceError> {
        let envelope = self.api.create(user).await?;
        if envelope.ok {
            return Ok(());
        }
        Err(rejected(
            &envelope,
            &["EMAIL_INVALID", "EMAIL_TAKEN", "PASSWORD_WEAK"],
            "USER_CREATE_FAILED",
        ))
    }

    pub async fn update_partial(&self, id: u64, patch: &UserPatch) -> Result<(), ServiceError> {
        let envelope = self.api.update_partial(id, patch).await?;
        if envelope.ok {
            return Ok(());
        }
        Err(rejected(&envelope, &["EMAIL_TAKEN"], "USER_PATCH_FAILED"))
    }

    pub async fn remove(&self, id: u64) -> Result<(), ServiceError> {
        let envelope = self.api.remove(id).await?;
        if envelope.error_code() == Some("USER_IN_USE") {
            return Err(ServiceError::Rejected("USER_IN_USE"));
        }
        ensure_ok(&envelope, "USER_DELETE_FAILED")
    }
}
