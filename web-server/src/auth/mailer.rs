// web-server/src/auth/mailer.rs
use async_trait::async_trait;
use common::SmtpConfig;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mailbox {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("mail delivery is not configured")]
    Disabled,
}

/// Outbound message for a single recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Notification {
    /// Login code mail
    pub fn verification_code(to: &str, code: &str, site_title: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("{} code: {}", site_title, code),
            text: format!(
                "Your {} login verification code is: {}, valid for 10 minutes.",
                site_title, code
            ),
            html: format!(
                "<h2>{title} Login Verification</h2>\
                 <p>Hello, your login {title} verification code is: {code}</p>\
                 <p>This verification code is valid for 10 minutes. \
                 If this is not your operation, please ignore this email.</p>",
                title = site_title,
                code = code
            ),
        }
    }
}

/// Delivers notifications. Failures are reported, never retried.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// SMTP delivery. `secure` selects implicit TLS; otherwise STARTTLS is required.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, site_title: &str) -> Result<Self, NotifyError> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let mut builder = builder.port(config.port);
        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(config.user.clone(), config.pass.clone()));
        }

        let from = Mailbox::new(Some(site_title.to_string()), parse_address(&config.user)?);

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn parse_address(address: &str) -> Result<lettre::Address, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl NotificationSender for SmtpMailer {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let to = Mailbox::new(None, parse_address(&notification.to)?);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject)
            .multipart(MultiPart::alternative_plain_html(notification.text, notification.html))
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        tracing::debug!("Verification mail handed to SMTP relay");
        Ok(())
    }
}

/// Sender used when no SMTP relay is configured (open mode only).
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSender;

#[async_trait]
impl NotificationSender for DisabledSender {
    async fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Disabled)
    }
}
