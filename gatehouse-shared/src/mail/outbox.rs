/// In-memory outbox
///
/// Records messages instead of delivering them, and logs them so local
/// developers can follow confirmation links. Only the most recent
/// [`OUTBOX_CAPACITY`] messages are kept. It can be told to fail deliveries
/// to exercise the mail-failure paths.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use super::{MailError, Mailer, OutgoingMail};

/// Messages kept by a default outbox
pub const OUTBOX_CAPACITY: usize = 100;

#[derive(Debug)]
pub struct OutboxMailer {
    sent: Mutex<VecDeque<OutgoingMail>>,
    capacity: usize,
    failing: AtomicBool,
}

impl Default for OutboxMailer {
    fn default() -> Self {
        Self::with_capacity(OUTBOX_CAPACITY)
    }
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox that keeps at most `capacity` messages, dropping the oldest
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sent: Mutex::new(VecDeque::with_capacity(capacity.min(OUTBOX_CAPACITY))),
            capacity: capacity.max(1),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes subsequent deliveries fail with `MailError::Transient`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Retained messages, oldest first
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recently delivered message
    pub fn last(&self) -> Option<OutgoingMail> {
        self.sent.lock().ok().and_then(|sent| sent.back().cloned())
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            tracing::warn!(to = ?mail.to, subject = %mail.subject, "Outbox refused mail");
            return Err(MailError::Transient("outbox is failing deliveries".to_string()));
        }

        tracing::info!(
            to = ?mail.to,
            reply_to = ?mail.reply_to,
            subject = %mail.subject,
            body = %mail.html_body,
            "Mail queued in outbox"
        );

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| MailError::Transient("outbox lock poisoned".to_string()))?;
        if sent.len() >= self.capacity {
            sent.pop_front();
        }
        sent.push_back(mail);

        Ok(())
    }
}
