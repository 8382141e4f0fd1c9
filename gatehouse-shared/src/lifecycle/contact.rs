use chrono::Utc;

use crate::mail::templates::{self, ContactMessage};
use crate::validation::{check, ContactForm};

use super::{LifecycleController, LifecycleResult, Outcome};

pub(crate) const CONTACT_THANKS: &str = "Thanks for your message. We'll get back to you shortly.";

impl LifecycleController {
    /// Forwards a visitor's message to the admins
    ///
    /// Open to everyone, signed in or not. On success the payload is the
    /// acknowledgement to show the visitor.
    pub async fn contact(&self, form: ContactForm) -> LifecycleResult<String> {
        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        let sent_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mail = templates::contact(
            &self.settings.app_name,
            &self.settings.admins,
            ContactMessage {
                full_name: form.full_name.trim(),
                email: form.email.trim(),
                subject: form.subject.trim(),
                message: &form.message,
                sent_at: &sent_at,
            },
        );

        if let Some(errors) = self.deliver(mail, form.email.trim()).await {
            return Ok(Outcome::Fail(errors));
        }

        tracing::info!(from = %form.email.trim(), "Contact message forwarded");

        Ok(Outcome::Success(CONTACT_THANKS.to_string()))
    }
}
