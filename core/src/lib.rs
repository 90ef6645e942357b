//! Client core for the inventory admin backend.
//!
//! # Overview
//! `SessionClient` sends requests to a fixed base URL, lets the transport's
//! cookie jar carry the session, and returns every answer as an `Envelope`
//! (`{ok, status, data}`). When the access cookie has expired it performs a
//! single coordinated refresh and retries the failed request once.
//!
//! # Design
//! - The network sits behind the `Transport` trait; `ReqwestTransport` is the
//!   real one, tests plug in scripted transports.
//! - Only construction and path errors are raised before sending; transport
//!   failures become `ClientError::Network`; everything the backend answers is
//!   an envelope.
//! - `api` wrappers map endpoints to verbs; `session` and `services` turn
//!   envelopes into domain results and error codes.
//! - `AppContext` builds one shared client at startup instead of a global.

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod http;
pub mod paging;
pub mod query;
pub mod services;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{Body, RequestOptions, SessionClient};
pub use config::ClientConfig;
pub use context::AppContext;
pub use envelope::Envelope;
pub use error::{ClientError, ServiceError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
pub use query::{Params, QueryValue};
pub use session::{Access, AuthService};
pub use transport::{ReqwestTransport, Transport};
