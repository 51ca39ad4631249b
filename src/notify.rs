//! Mail delivery of the run log
//!
//! [`NotificationSender`] builds the one message of a run and hands it to a
//! [`MailTransport`]. Production uses [`SmtpMailer`]; tests swap in their own
//! transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{MailConfig, ENV_EMAIL_HOST, ENV_EMAIL_PASS, ENV_EMAIL_RECIPIENT, ENV_EMAIL_USER};
use crate::error::MailError;
use crate::runlog::RunLog;

pub const SENDER_NAME: &str = "Git Automation";
pub const SUBJECT: &str = "Git Automation Status Log";
pub const BODY: &str = "Attached is the status summary of the Git automation script.";
pub const ATTACHMENT_NAME: &str = "automation.log";

/// Something that can deliver a built message
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), MailError>;
}

/// SMTP delivery over implicit TLS
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let host = require(&self.config.host, ENV_EMAIL_HOST)?;
        let username = require(&self.config.username, ENV_EMAIL_USER)?;
        let password = require(&self.config.password, ENV_EMAIL_PASS)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(self.config.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(transport)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        let transport = self.transport()?;
        debug!(
            "Sending mail via {}:{}",
            self.config.host.as_deref().unwrap_or_default(),
            self.config.port
        );
        transport.send(message).await?;
        Ok(())
    }
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, MailError> {
    value.as_deref().ok_or(MailError::MissingSetting(name))
}

/// Mails the run log to the configured recipient
pub struct NotificationSender {
    config: MailConfig,
    transport: Box<dyn MailTransport>,
    log: Arc<RunLog>,
}

impl NotificationSender {
    pub fn new(config: MailConfig, transport: Box<dyn MailTransport>, log: Arc<RunLog>) -> Self {
        Self {
            config,
            transport,
            log,
        }
    }

    /// Make exactly one attempt to mail the log file.
    ///
    /// The outcome is written to the run log either way. A console-only run
    /// log has no file to attach, which counts as a failed attempt.
    pub async fn send_log(&self, log_path: Option<&Path>) -> Result<(), MailError> {
        let result = self.try_send(log_path).await;

        match &result {
            Ok(()) => self.log.log("Mail sent successfully."),
            Err(e) => {
                warn!("Mail delivery failed: {}", e);
                self.log.log(format!("Error sending mail: {}", e));
            }
        }

        result
    }

    async fn try_send(&self, log_path: Option<&Path>) -> Result<(), MailError> {
        let log_path = log_path.ok_or(MailError::NoLogFile)?;
        let contents = tokio::fs::read(log_path)
            .await
            .map_err(|source| MailError::ReadLog {
                path: log_path.to_path_buf(),
                source,
            })?;

        let message = build_message(&self.config, contents)?;
        self.transport.send(message).await
    }
}

/// Build the run-log message with the log bytes attached
pub fn build_message(config: &MailConfig, log_contents: Vec<u8>) -> Result<Message, MailError> {
    let sender = require(&config.username, ENV_EMAIL_USER)?;
    let recipient = require(&config.recipient, ENV_EMAIL_RECIPIENT)?;

    let from = Mailbox::new(Some(SENDER_NAME.to_string()), sender.parse()?);
    let to: Mailbox = recipient.parse()?;

    let attachment = Attachment::new(ATTACHMENT_NAME.to_string())
        .body(log_contents, ContentType::parse("application/octet-stream")?);

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(SUBJECT)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY.to_string()))
                .singlepart(attachment),
        )?;

    Ok(message)
}
