// web-server/src/main.rs
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Clock, Config, SystemClock};
use gpu_dashboard::access_log::AccessRecorder;
use gpu_dashboard::auth::{
    DisabledSender, MemoryCredentialStore, NotificationSender, SmtpMailer, VerificationService,
};
use gpu_dashboard::middleware::SessionGate;
use gpu_dashboard::proxy::Aggregator;

const STORE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load and validate configuration; refuse to start on anything malformed
    let config = Config::load().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let server_addr = config.web_server_addr.clone();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryCredentialStore::new(clock.clone()));

    let sender: Arc<dyn NotificationSender> = if config.smtp.host.is_empty() {
        tracing::warn!("No SMTP relay configured, verification mail is disabled");
        Arc::new(DisabledSender)
    } else {
        let mailer = SmtpMailer::new(&config.smtp, &config.site_title)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        Arc::new(mailer)
    };

    let verification = VerificationService::new(&config, store.clone(), sender, clock);

    let aggregator = Aggregator::new(config.servers.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let timezone = config
        .access_log_timezone()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let recorder = AccessRecorder::new(config.access_log.path.clone(), timezone);
    if let Err(e) = recorder.init_file().await {
        tracing::warn!("Access log {} not ready yet: {}", recorder.path().display(), e);
    }

    // Expired codes are already invisible; this only reclaims their memory
    let purge_store = store.clone();
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(STORE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_store.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired verification codes", purged);
            }
        }
    });

    tracing::info!(
        "Starting GPU Dashboard on {} ({} servers, login {})",
        server_addr,
        aggregator.server_count(),
        if config.auth.no_need_login { "disabled" } else { "required" }
    );

    let config_data = web::Data::new(config);
    let verification_data = web::Data::new(verification);
    let aggregator_data = web::Data::new(aggregator);
    let recorder_data = web::Data::new(recorder);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(verification_data.clone())
            .app_data(aggregator_data.clone())
            .app_data(recorder_data.clone())
            .wrap(SessionGate::new(&config_data))
            .configure(|cfg| gpu_dashboard::configure(cfg, &config_data))
    })
    .bind(&server_addr)?
    .run()
    .await
}
