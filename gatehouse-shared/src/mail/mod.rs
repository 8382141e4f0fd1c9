/// Outgoing mail
///
/// Lifecycle operations hand an [`OutgoingMail`] to a [`Mailer`]. A delivery
/// failure never rolls back the state change that prompted the mail; the
/// operation reports it as a field failure instead.
///
/// # Transports
///
/// - [`smtp::SmtpMailer`]: lettre's async SMTP transport
/// - [`outbox::OutboxMailer`]: keeps messages in memory and logs them; used in
///   development and tests
///
/// Message bodies are rendered by [`templates`].

use async_trait::async_trait;
use serde::Deserialize;

pub mod outbox;
pub mod smtp;
pub mod templates;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// A sender or recipient address could not be parsed
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    /// The message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    /// The relay could not be reached or deferred the message
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The relay refused the message
    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// A message ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html_body: String) -> Self {
        Self {
            to: vec![to.into()],
            reply_to: None,
            subject: subject.into(),
            html_body,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Mail transport selection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    Smtp,
    Outbox,
}

/// Mail settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub transport: MailTransport,

    /// Sender mailbox, e.g. `Gatehouse <noreply@example.com>`
    pub sender: String,

    /// Recipients of contact form messages
    pub admins: Vec<String>,

    pub smtp: smtp::SmtpSettings,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            transport: MailTransport::Outbox,
            sender: "Gatehouse <noreply@localhost>".to_string(),
            admins: vec!["admin@localhost".to_string()],
            smtp: smtp::SmtpSettings::default(),
        }
    }
}
