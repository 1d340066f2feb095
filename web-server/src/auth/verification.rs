// web-server/src/auth/verification.rs
use std::sync::Arc;

use common::models::verification::{VerificationRecord, CODE_TTL};
use common::{generate_session_token, Clock, Config};

use super::mailer::{Notification, NotificationSender};
use super::policy::{is_valid_email, AllowList};
use super::store::{verification_key, CredentialStore};
use super::AuthError;
use crate::utils::code::generate_verification_code;

/// Issues one-time login codes and exchanges them for session tokens
pub struct VerificationService {
    store: Arc<dyn CredentialStore>,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    allow_list: AllowList,
    jwt_secret: Vec<u8>,
    site_title: String,
    devops_contact: String,
}

impl VerificationService {
    pub fn new(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sender,
            clock,
            allow_list: AllowList::new(config.auth.allowed_emails.iter().cloned()),
            jwt_secret: config.auth.jwt_secret.as_bytes().to_vec(),
            site_title: config.site_title.clone(),
            devops_contact: config.auth.devops_contact.clone(),
        }
    }

    fn check_email(&self, email: &str) -> Result<(), AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if !self.allow_list.permits(email) {
            tracing::warn!("Rejected login attempt for {}: not in allow-list", email);
            return Err(AuthError::NotAllowed {
                contact: self.devops_contact.clone(),
            });
        }
        Ok(())
    }

    async fn load_record(&self, email: &str) -> Result<Option<VerificationRecord>, AuthError> {
        let Some(raw) = self.store.get(&verification_key(email)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Discarding unreadable verification record for {}: {}", email, e);
                Ok(None)
            }
        }
    }

    /// Generate, store and mail a fresh code for `email`.
    ///
    /// An existing record blocks a new code until it enters its final minute.
    pub async fn request_code(&self, email: &str) -> Result<(), AuthError> {
        self.check_email(email)?;

        let now = self.clock.now_millis();
        if let Some(existing) = self.load_record(email).await? {
            if !existing.allows_resend(now) {
                tracing::warn!("Throttled code request for {}", email);
                return Err(AuthError::Throttled);
            }
        }

        let code = generate_verification_code();
        let record = VerificationRecord::issued_at(code.clone(), now);
        self.store
            .put(&verification_key(email), serde_json::to_string(&record)?, CODE_TTL)
            .await?;

        let notification = Notification::verification_code(email, &code, &self.site_title);
        if let Err(e) = self.sender.send(notification).await {
            // an undelivered code must not hold the resend window shut
            self.store.delete(&verification_key(email)).await?;
            return Err(e.into());
        }

        tracing::info!("Verification code sent to {}", email);
        Ok(())
    }

    /// Exchange a code for a signed session token. A matching code is consumed.
    pub async fn login(&self, email: &str, code: &str) -> Result<String, AuthError> {
        self.check_email(email)?;

        let record = self.load_record(email).await?.ok_or(AuthError::CodeNotFound)?;

        let now = self.clock.now_millis();
        if record.is_expired(now) {
            self.store.delete(&verification_key(email)).await?;
            return Err(AuthError::CodeExpired);
        }

        if record.code != code {
            tracing::warn!("Incorrect verification code for {}", email);
            return Err(AuthError::CodeIncorrect);
        }

        self.store.delete(&verification_key(email)).await?;

        let token = generate_session_token(email, now / 1000, &self.jwt_secret)?;
        tracing::info!("Login successful for {}", email);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use common::{validate_session_token, ManualClock};

    use crate::auth::mailer::NotifyError;
    use crate::auth::store::MemoryCredentialStore;

    const SECRET: &str = "unit-test-secret";

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Notification>>,
        fail: AtomicBool,
    }

    impl RecordingSender {
        fn last_code(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let subject = &sent.last().expect("a mail was sent").subject;
            subject.rsplit(' ').next().unwrap().to_string()
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(NotifyError::Transport("relay down".into()));
            }
            self.sent.lock().unwrap().push(notification);
            Ok(())
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<MemoryCredentialStore>,
        sender: Arc<RecordingSender>,
        service: VerificationService,
    }

    fn fixture(allowed: &[&str], sender: RecordingSender) -> Fixture {
        let mut config = Config::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.auth.allowed_emails = allowed.iter().map(|s| s.to_string()).collect();

        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryCredentialStore::new(clock.clone()));
        let sender = Arc::new(sender);
        let service = VerificationService::new(&config, store.clone(), sender.clone(), clock.clone());
        Fixture { clock, store, sender, service }
    }

    #[actix_web::test]
    async fn test_not_allow_listed_leaves_store_untouched() {
        let f = fixture(&["a@x.com"], RecordingSender::default());

        assert!(matches!(f.service.request_code("b@x.com").await, Err(AuthError::NotAllowed { .. })));
        assert!(matches!(f.service.login("b@x.com", "123456").await, Err(AuthError::NotAllowed { .. })));
        assert!(f.store.is_empty());
        assert_eq!(f.sender.count(), 0);
    }

    #[actix_web::test]
    async fn test_invalid_email_rejected() {
        let f = fixture(&[], RecordingSender::default());
        assert!(matches!(f.service.request_code("nope").await, Err(AuthError::InvalidEmail)));
        assert!(matches!(f.service.login("nope", "123456").await, Err(AuthError::InvalidEmail)));
    }

    #[actix_web::test]
    async fn test_code_is_single_use() {
        let f = fixture(&["a@x.com"], RecordingSender::default());
        f.service.request_code("a@x.com").await.unwrap();
        let code = f.sender.last_code();
        assert_eq!(code.len(), 6);

        let token = f.service.login("a@x.com", &code).await.unwrap();
        let claims = validate_session_token(&token, SECRET.as_bytes()).unwrap();
        assert_eq!(claims.email, "a@x.com");

        assert!(matches!(f.service.login("a@x.com", &code).await, Err(AuthError::CodeNotFound)));
    }

    #[actix_web::test]
    async fn test_wrong_code_keeps_record() {
        let f = fixture(&[], RecordingSender::default());
        f.service.request_code("a@x.com").await.unwrap();
        let code = f.sender.last_code();
        let wrong = if code == "999999" { "100000" } else { "999999" };

        assert!(matches!(f.service.login("a@x.com", wrong).await, Err(AuthError::CodeIncorrect)));
        assert!(matches!(f.service.login("a@x.com", wrong).await, Err(AuthError::CodeIncorrect)));
        assert!(f.service.login("a@x.com", &code).await.is_ok());
    }

    #[actix_web::test]
    async fn test_login_without_code() {
        let f = fixture(&[], RecordingSender::default());
        assert!(matches!(f.service.login("a@x.com", "123456").await, Err(AuthError::CodeNotFound)));
    }

    #[actix_web::test]
    async fn test_expired_code_rejected() {
        let f = fixture(&[], RecordingSender::default());
        f.service.request_code("a@x.com").await.unwrap();
        let code = f.sender.last_code();

        f.clock.advance(Duration::from_secs(10 * 60 + 1));
        assert!(matches!(f.service.login("a@x.com", &code).await, Err(AuthError::CodeNotFound)));
    }

    #[actix_web::test]
    async fn test_stale_record_past_its_expires_field_is_deleted() {
        let f = fixture(&[], RecordingSender::default());
        let now = f.clock.now_millis();
        let stale = VerificationRecord { code: "123456".to_string(), expires: now - 1 };
        f.store
            .put(&verification_key("a@x.com"), serde_json::to_string(&stale).unwrap(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(f.service.login("a@x.com", "123456").await, Err(AuthError::CodeExpired)));
        assert!(f.store.is_empty());
    }

    #[actix_web::test]
    async fn test_resend_throttled_until_final_minute() {
        let f = fixture(&[], RecordingSender::default());
        f.service.request_code("a@x.com").await.unwrap();
        let first = f.sender.last_code();

        assert!(matches!(f.service.request_code("a@x.com").await, Err(AuthError::Throttled)));
        f.clock.advance(Duration::from_secs(8 * 60 + 59));
        assert!(matches!(f.service.request_code("a@x.com").await, Err(AuthError::Throttled)));
        assert_eq!(f.sender.count(), 1);

        f.clock.advance(Duration::from_secs(1));
        f.service.request_code("a@x.com").await.unwrap();
        assert_eq!(f.sender.count(), 2);

        // the new code replaced the old one
        let second = f.sender.last_code();
        if first != second {
            assert!(matches!(f.service.login("a@x.com", &first).await, Err(AuthError::CodeIncorrect)));
        }
        assert!(f.service.login("a@x.com", &second).await.is_ok());
    }

    #[actix_web::test]
    async fn test_resend_allowed_after_expiry() {
        let f = fixture(&[], RecordingSender::default());
        f.service.request_code("a@x.com").await.unwrap();
        f.clock.advance(Duration::from_secs(11 * 60));
        f.service.request_code("a@x.com").await.unwrap();
        assert_eq!(f.sender.count(), 2);
    }

    #[actix_web::test]
    async fn test_unreadable_record_treated_as_absent() {
        let f = fixture(&[], RecordingSender::default());
        f.store
            .put(&verification_key("a@x.com"), "{garbage".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(f.service.login("a@x.com", "123456").await, Err(AuthError::CodeNotFound)));
        assert!(f.service.request_code("a@x.com").await.is_ok());
    }

    #[actix_web::test]
    async fn test_notification_failure_is_internal() {
        let f = fixture(&[], RecordingSender { fail: AtomicBool::new(true), ..Default::default() });
        let err = f.service.request_code("a@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::Notify(_)));
        assert!(err.is_internal());
    }

    #[actix_web::test]
    async fn test_failed_delivery_does_not_throttle_retry() {
        let f = fixture(&[], RecordingSender { fail: AtomicBool::new(true), ..Default::default() });
        assert!(matches!(f.service.request_code("a@x.com").await, Err(AuthError::Notify(_))));
        assert!(f.store.is_empty());

        f.sender.fail.store(false, Ordering::SeqCst);
        f.service.request_code("a@x.com").await.unwrap();
        assert_eq!(f.sender.count(), 1);

        let code = f.sender.last_code();
        assert!(f.service.login("a@x.com", &code).await.is_ok());
    }
}
