/// Server-side session records
///
/// The plaintext session token only ever lives in the client's cookie or
/// bearer header; the server keeps its SHA-256 hash. Deleting the row is what
/// logs a token out.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY,
///     account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     fresh_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SessionRecord {
    /// Session ID
    pub id: Uuid,

    /// Account the session is bound to
    pub account_id: Uuid,

    /// SHA-256 hex of the session token
    pub token_hash: String,

    pub created_at: DateTime<Utc>,

    /// Last login or re-authentication
    pub fresh_at: DateTime<Utc>,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Creates a fresh session record for an account
    pub fn new(account_id: Uuid, token_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            token_hash,
            created_at: now,
            fresh_at: now,
            expires_at: now + ttl,
        }
    }

    /// Checks whether the session is past its absolute expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Checks whether the last credential check is within the re-auth window
    pub fn is_fresh(&self, now: DateTime<Utc>, reauth_window: Duration) -> bool {
        now - self.fresh_at < reauth_window
    }
}
