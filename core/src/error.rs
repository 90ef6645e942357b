//! Error types for the inventory client.
//!
//! # Design
//! `ClientError` covers everything that stops a request from being attempted
//! or completed at the transport level. Anything the backend answers, 4xx and
//! 5xx included, is returned as an `Envelope` instead. `ServiceError` sits one
//! layer up and carries the stable upper-snake codes the domain services hand
//! to their callers.

use thiserror::Error;

/// Errors raised by `SessionClient` and its transports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The base URL is missing or empty. Raised at construction.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// The request path is empty.
    #[error("invalid request path: {0:?}")]
    InvalidPath(String),

    /// DNS, connect, timeout or body-read failure on any attempt.
    #[error("network error: {0}")]
    Network(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Errors returned by the domain services (`AuthService`, `ProductsService`, ...).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected locally, before any request was sent.
    #[error("{0}")]
    Validation(&'static str),

    /// The backend answered with a non-success envelope.
    #[error("{0}")]
    Rejected(&'static str),

    /// The backend answered with success but the payload had the wrong shape.
    #[error("{0}")]
    InvalidResponse(&'static str),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ServiceError {
    /// Stable code for this failure, e.g. `EMAIL_TAKEN` or `NETWORK_ERROR`.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(code)
            | ServiceError::Rejected(code)
            | ServiceError::InvalidResponse(code) => code,
            ServiceError::Client(ClientError::Config(_)) => "API_BASE_URL_REQUIRED",
            ServiceError::Client(ClientError::InvalidPath(_)) => "API_PATH_REQUIRED",
            ServiceError::Client(ClientError::Network(_)) => "NETWORK_ERROR",
            ServiceError::Client(ClientError::Serialization(_)) => "SERIALIZATION_ERROR",
        }
    }
}
