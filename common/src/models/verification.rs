// common/src/models/verification.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long an issued code stays valid
pub const CODE_TTL: Duration = Duration::from_secs(10 * 60);

/// A fresh code blocks re-issuance for its first 9 minutes; only the final
/// minute of its validity (or its expiry) lets a new one through.
pub const RESEND_LOCKOUT: Duration = Duration::from_secs(9 * 60);

/// One-time login code as stored under `verification:<email>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub code: String,
    /// Absolute expiry, Unix milliseconds
    pub expires: i64,
}

impl VerificationRecord {
    pub fn issued_at(code: String, now_millis: i64) -> Self {
        Self {
            code,
            expires: now_millis + CODE_TTL.as_millis() as i64,
        }
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis > self.expires
    }

    pub fn allows_resend(&self, now_millis: i64) -> bool {
        let issued = self.expires - CODE_TTL.as_millis() as i64;
        now_millis >= issued + RESEND_LOCKOUT.as_millis() as i64
    }
}
