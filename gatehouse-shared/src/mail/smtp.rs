/// SMTP delivery through lettre
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::mail::{smtp::{SmtpMailer, SmtpSettings}, Mailer, OutgoingMail};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = SmtpMailer::new(&SmtpSettings::default(), "Gatehouse <noreply@localhost>")?;
/// mailer
///     .send(OutgoingMail::new("demo@example.com", "Hello", "<p>Hi</p>".to_string()))
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Deserialize;

use super::{MailError, Mailer, OutgoingMail};

/// SMTP relay settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,

    /// Upgrade the connection with STARTTLS
    pub starttls: bool,

    /// Empty disables authentication
    pub username: String,
    pub password: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            starttls: false,
            username: String::new(),
            password: String::new(),
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("sender", &self.sender.to_string())
            .finish()
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

impl SmtpMailer {
    /// Builds a pooled transport for the relay
    ///
    /// No connection is made until the first message is sent.
    ///
    /// # Errors
    ///
    /// Returns `MailError::InvalidAddress` for a bad sender and
    /// `MailError::Build` if the TLS setup for the relay fails.
    pub fn new(settings: &SmtpSettings, sender: &str) -> Result<Self, MailError> {
        let sender = parse_mailbox(sender)?;

        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| MailError::Build(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };

        let mut builder = builder.port(settings.port);
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML);

        for recipient in &mail.to {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        if let Some(reply_to) = &mail.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }

        builder
            .body(mail.html_body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(&mail)?;

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(to = ?mail.to, subject = %mail.subject, "Mail sent");
                Ok(())
            }
            Err(e) if e.is_permanent() => {
                tracing::error!(to = ?mail.to, error = %e, "Mail rejected");
                Err(MailError::Rejected(e.to_string()))
            }
            Err(e) => {
                tracing::error!(to = ?mail.to, error = %e, "Mail delivery failed");
                Err(MailError::Transient(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(&SmtpSettings::default(), "Gatehouse <noreply@localhost>").unwrap()
    }

    #[tokio::test]
    async fn test_builds_html_message_with_reply_to() {
        let mut mail = OutgoingMail::new("demo@example.com", "Hello", "<p>Hi</p>".to_string());
        mail.reply_to = Some("visitor@example.com".to_string());

        let message = mailer().build_message(&mail).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("Reply-To: visitor@example.com"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mail = OutgoingMail::new("not an address", "Hello", String::new());
        assert!(matches!(
            mailer().build_message(&mail),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_sender() {
        let result = SmtpMailer::new(&SmtpSettings::default(), "nobody");
        assert!(matches!(result, Err(MailError::InvalidAddress(_))));
    }
}
