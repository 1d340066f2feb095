// common/src/models/session.rs
use serde::{Deserialize, Serialize};

/// Session lifetime: 30 days
pub const SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Roles a session can carry. Every login currently mints `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// Claims carried by the signed session token stored in the `auth_token` cookie.
///
/// There is no server-side session record: a token is valid exactly when its
/// signature checks out and `exp` has not passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub role: Role,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Expires at, Unix seconds
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(email: &str, issued_at: i64) -> Self {
        Self {
            email: email.to_string(),
            role: Role::User,
            iat: issued_at,
            exp: issued_at + SESSION_TTL_SECS,
        }
    }
}
