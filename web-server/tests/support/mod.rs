// web-server/tests/support/mod.rs
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use common::{generate_session_token, Config, ManualClock, ServerDescriptor};
use gpu_dashboard::access_log::AccessRecorder;
use gpu_dashboard::auth::{MemoryCredentialStore, Notification, NotificationSender, NotifyError, VerificationService};
use gpu_dashboard::proxy::Aggregator;
use tempfile::TempDir;

pub const SECRET: &str = "integration-secret";
pub const BYPASS: &str = "ops-bypass-token";

/// Keeps every mail instead of delivering it
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSender {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Code from the subject line of the latest mail
    pub fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let subject = &sent.last().expect("no mail was sent").subject;
        subject.rsplit(' ').next().unwrap().to_string()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub struct TestContext {
    pub config: Config,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryCredentialStore>,
    pub sender: Arc<RecordingSender>,
    pub dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with(|_| {})
    }

    pub fn with(customize: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(static_dir.join("index.html"), "<html>dashboard</html>").unwrap();
        std::fs::write(static_dir.join("login.html"), "<html>login</html>").unwrap();

        let mut config = Config::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.auth.bypass_token = Some(BYPASS.to_string());
        config.auth.devops_contact = "ops@x.com".to_string();
        config.smtp.host = "smtp.invalid".to_string();
        config.static_files.path = static_dir;
        config.access_log.path = dir.path().join("log").join("access.csv");
        config.access_log.timezone = "UTC".to_string();
        customize(&mut config);

        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryCredentialStore::new(clock.clone()));

        Self {
            config,
            clock,
            store,
            sender: Arc::new(RecordingSender::default()),
            dir,
        }
    }

    pub fn verification(&self) -> VerificationService {
        VerificationService::new(&self.config, self.store.clone(), self.sender.clone(), self.clock.clone())
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.config.servers.clone()).unwrap()
    }

    pub fn recorder(&self) -> AccessRecorder {
        AccessRecorder::new(self.access_log_path(), self.config.access_log_timezone().unwrap())
    }

    pub fn access_log_path(&self) -> PathBuf {
        self.config.access_log.path.clone()
    }

    pub fn session_token(&self, email: &str) -> String {
        generate_session_token(email, Utc::now().timestamp(), SECRET.as_bytes()).unwrap()
    }
}

pub fn servers(entries: &[(&str, String, Option<&str>)]) -> BTreeMap<String, ServerDescriptor> {
    entries
        .iter()
        .map(|(id, url, token)| {
            (
                id.to_string(),
                ServerDescriptor {
                    url: url.clone(),
                    token: token.map(str::to_string),
                },
            )
        })
        .collect()
}

/// The full dashboard app behind the session gate
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {{
        let ctx = &$ctx;
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(ctx.config.clone()))
                .app_data(actix_web::web::Data::new(ctx.verification()))
                .app_data(actix_web::web::Data::new(ctx.aggregator()))
                .app_data(actix_web::web::Data::new(ctx.recorder()))
                .wrap(gpu_dashboard::middleware::SessionGate::new(&ctx.config))
                .configure(|cfg| gpu_dashboard::configure(cfg, &ctx.config)),
        )
        .await
    }};
}
