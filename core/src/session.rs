//! In-memory session cache and access guards.
//!
//! # Design
//! The session itself is a pair of HttpOnly cookies the client never reads.
//! `AuthService` only remembers who the backend last said the user is, so
//! pages can check roles without a round-trip. Nothing is persisted.

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::AuthApi;
use crate::envelope::Envelope;
use crate::error::ServiceError;
use crate::types::{Credentials, Registration, User};

const MIN_PASSWORD_LEN: usize = 10;

/// Outcome of an access check. Acting on it (redirecting) is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted(User),
    /// No session; send the user to the login page.
    Login,
    /// Signed in but lacking the required role.
    Forbidden,
}

#[derive(Debug)]
pub struct AuthService {
    api: AuthApi,
    current: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new(api: AuthApi) -> Self {
        Self {
            api,
            current: RwLock::new(None),
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ServiceError> {
        let registration = validate_registration(name, email, password)?;

        let envelope = self.api.register(&registration).await?;
        if !envelope.ok {
            return Err(ServiceError::Rejected(register_failure(&envelope)));
        }
        let user = session_user(&envelope)
            .ok_or(ServiceError::InvalidResponse("REGISTER_RESPONSE_INVALID"))?
            .map_err(ServiceError::InvalidResponse)?;
        *self.current.write().await = Some(user.clone());
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::Validation("LOGIN_CREDENTIALS_REQUIRED"));
        }
        if !email.contains('@') {
            return Err(ServiceError::Validation("USER_INVALID_EMAIL"));
        }

        let credentials = Credentials {
            email,
            password: password.to_string(),
        };
        let envelope = self.api.login(&credentials).await?;
        if !envelope.ok {
            return Err(ServiceError::Rejected(login_failure(&envelope)));
        }
        let user = session_user(&envelope)
            .ok_or(ServiceError::InvalidResponse("LOGIN_RESPONSE_INVALID"))?
            .map_err(ServiceError::InvalidResponse)?;
        *self.current.write().await = Some(user.clone());
        Ok(user)
    }

    /// Cached user, or whoever `/auth/profile` says is signed in. Any failure
    /// (network, 401, malformed payload) means "no session". A login that
    /// lands while the profile request is out wins over its answer.
    pub async fn load_session(&self) -> Option<User> {
        if let Some(user) = self.current_user().await {
            return Some(user);
        }

        let user = match self.api.profile().await {
            Ok(envelope) if envelope.is_unauthorized() => None,
            Ok(envelope) => match session_user(&envelope) {
                Some(Ok(user)) => Some(user),
                Some(Err(code)) => {
                    warn!(code, "profile returned an invalid user");
                    None
                }
                None => None,
            },
            Err(err) => {
                debug!(error = %err, "profile request failed");
                None
            }
        };
        let mut current = self.current.write().await;
        if current.is_none() {
            *current = user;
        }
        current.clone()
    }

    /// Ask the backend to drop the cookies. The local session is cleared even
    /// if that request fails.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            debug!(error = %err, "logout request failed");
        }
        *self.current.write().await = None;
    }

    pub async fn require_auth(&self) -> Access {
        match self.load_session().await {
            Some(user) => Access::Granted(user),
            None => Access::Login,
        }
    }

    pub async fn require_admin(&self) -> Access {
        match self.load_session().await {
            Some(user) if user.is_admin() => Access::Granted(user),
            Some(_) => Access::Forbidden,
            None => Access::Login,
        }
    }
}

fn validate_registration(name: &str, email: &str, password: &str) -> Result<Registration, ServiceError> {
    let name = name.trim();
    let email = email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') || email.chars().count() < 5 {
        return Err(ServiceError::Validation("USER_INVALID_EMAIL"));
    }
    if name.chars().count() < 3 {
        return Err(ServiceError::Validation("USER_INVALID_NAME"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation("PASSWORD_TOO_SHORT"));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_upper || !has_digit {
        return Err(ServiceError::Validation("PASSWORD_WEAK"));
    }

    Ok(Registration {
        name: name.to_string(),
        email,
        password: password.to_string(),
    })
}

/// Backend codes win over bare statuses: a 400 carrying an unknown code is a
/// generic failure, not a bad request.
fn register_failure(envelope: &Envelope) -> &'static str {
    match (envelope.error_code(), envelope.status) {
        (Some("EMAIL_INVALID"), _) => "EMAIL_INVALID",
        (Some("EMAIL_TAKEN"), _) => "EMAIL_TAKEN",
        (Some("PASSWORD_WEAK"), _) => "PASSWORD_WEAK",
        (Some("REGISTER_BAD_REQUEST"), _) | (None, 400) => "REGISTER_BAD_REQUEST",
        (Some("AUTH_REPO_UNAVAILABLE"), _) | (None, 503) => "AUTH_SERVICE_UNAVAILABLE",
        _ => "REGISTER_FAILED",
    }
}

fn login_failure(envelope: &Envelope) -> &'static str {
    match (envelope.error_code(), envelope.status) {
        (Some("INVALID_CREDENTIALS"), _) | (None, 401) => "INVALID_CREDENTIALS",
        (None, 400) => "LOGIN_BAD_REQUEST",
        (None, 503) => "AUTH_SERVICE_UNAVAILABLE",
        _ => "LOGIN_FAILED",
    }
}

/// `user` from an `{ok: true, user}` payload. `None` when the payload has
/// another shape; `Some(Err(code))` when the user object fails validation.
fn session_user(envelope: &Envelope) -> Option<Result<User, &'static str>> {
    let data = envelope.data.as_ref()?;
    if data.get("ok").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    let user = data.get("user").filter(|user| !user.is_null())?;
    Some(User::from_dto(user).map_err(|e| e.code()))
}
