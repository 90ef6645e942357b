//! Thin wrappers that bind the backend's endpoints to `SessionClient` verbs.
//!
//! Every call returns the raw `Envelope`; interpreting `ok`, `status` and
//! `data.error` is left to the services in `crate::services` and
//! `crate::session`.

mod auth;
mod categories;
mod movements;
mod products;
mod users;

pub use auth::AuthApi;
pub use categories::CategoriesApi;
pub use movements::MovementsApi;
pub use products::ProductsApi;
pub use users::UsersApi;
