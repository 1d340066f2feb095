// web-server/src/auth/mod.rs
//! Email + one-time code login.
//!
//! A code is mailed on request, held in a [`CredentialStore`] for ten minutes
//! and exchanged exactly once for a signed 30-day session token.

pub mod mailer;
pub mod policy;
pub mod store;
pub mod verification;

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use common::models::session::SESSION_TTL_SECS;
use thiserror::Error;

use crate::error::ApiError;
pub use mailer::{DisabledSender, Notification, NotificationSender, NotifyError, SmtpMailer};
pub use policy::AllowList;
pub use store::{CredentialStore, MemoryCredentialStore, StoreError};
pub use verification::VerificationService;

/// Cookie holding the session token
pub const AUTH_COOKIE: &str = "auth_token";

/// Session cookie living as long as the token inside it
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(SESSION_TTL_SECS))
        .finish()
}

/// Cookie that makes the browser forget the session
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("This email is not in the allowed list, please contact {contact} to add it")]
    NotAllowed { contact: String },

    #[error("Do not repeat requests")]
    Throttled,

    #[error("Verification code does not exist or has expired, please re-obtain")]
    CodeNotFound,

    #[error("Verification code has expired, please re-obtain")]
    CodeExpired,

    #[error("Verification code is incorrect")]
    CodeIncorrect,

    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl AuthError {
    /// Failures the user cannot fix by changing their input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Store(_) | AuthError::Notify(_) | AuthError::Token(_) | AuthError::Encoding(_)
        )
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail
            | AuthError::CodeNotFound
            | AuthError::CodeExpired
            | AuthError::CodeIncorrect => ApiError::Validation(err.to_string()),
            AuthError::NotAllowed { .. } => ApiError::Forbidden(err.to_string()),
            AuthError::Throttled => ApiError::RateLimited(err.to_string()),
            AuthError::Store(_)
            | AuthError::Notify(_)
            | AuthError::Token(_)
            | AuthError::Encoding(_) => {
                tracing::error!("Authentication backend failure: {}", err);
                ApiError::Internal("Server error".to_string())
            }
        }
    }
}
