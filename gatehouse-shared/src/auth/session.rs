/// Session authority
///
/// Owns the mapping from session tokens to identities. A request presents at
/// most one token; the authority resolves it to an [`Identity`], and it is the
/// only place sessions are created, refreshed or destroyed.
///
/// # Rules
///
/// - Only active accounts may establish a session
/// - Logging in as the account already signed in rotates the session; logging
///   in as a different account while signed in is refused
/// - A session is fresh for `reauth_window` after login or re-authentication;
///   after that it still resolves, but sensitive operations require `reauth`
/// - Logging out is idempotent
/// - Expired sessions are deleted when presented and swept on every login
///
/// Credential verification happens before the authority is asked to log an
/// account in; the authority trusts its caller on that point.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::identity::{Identity, Principal};
use super::session_token::{generate_session_token, hash_session_token, validate_session_token_format};
use crate::models::{account::Account, session::SessionRecord};
use crate::store::{SessionRepository, StoreError};

/// Session lifetime settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Absolute session lifetime in hours
    pub ttl_hours: i64,

    /// How long after a credential check a session stays fresh, in minutes
    pub reauth_window_minutes: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_hours: 24 * 14,
            reauth_window_minutes: 30,
        }
    }
}

impl SessionSettings {
    fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }

    fn reauth_window(&self) -> Duration {
        Duration::minutes(self.reauth_window_minutes)
    }
}

/// Error type for session transitions
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The account is not active
    #[error("Account is not active")]
    AccountInactive,

    /// A session for a different account is already established
    #[error("Already signed in as another account")]
    AlreadyAuthenticated,

    /// The operation needs an authenticated requester
    #[error("Not signed in")]
    NotAuthenticated,

    /// Re-authentication was attempted for a different account
    #[error("Session belongs to another account")]
    AccountMismatch,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly issued session
///
/// The plaintext token is only available here; hand it to the client and drop it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub record: SessionRecord,
}

impl IssuedSession {
    pub fn principal(&self) -> Principal {
        Principal::new(self.record.account_id, self.record.id, true)
    }
}

#[derive(Clone)]
pub struct SessionAuthority {
    sessions: Arc<dyn SessionRepository>,
    settings: SessionSettings,
}

impl std::fmt::Debug for SessionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthority")
            .field("settings", &self.settings)
            .finish()
    }
}

impl SessionAuthority {
    pub fn new(sessions: Arc<dyn SessionRepository>, settings: SessionSettings) -> Self {
        Self { sessions, settings }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Resolves a presented token to an identity
    ///
    /// Missing, malformed, unknown and expired tokens all resolve to
    /// `Identity::Anonymous`. Expired sessions are deleted on sight.
    ///
    /// # Errors
    ///
    /// Only store failures are errors.
    pub async fn current_identity(&self, token: Option<&str>) -> Result<Identity, StoreError> {
        let token = match token {
            Some(token) if validate_session_token_format(token) => token,
            _ => return Ok(Identity::Anonymous),
        };

        let session = match self.sessions.find_session(&hash_session_token(token)).await? {
            Some(session) => session,
            None => return Ok(Identity::Anonymous),
        };

        let now = Utc::now();
        if session.is_expired(now) {
            tracing::debug!(session_id = %session.id, "Session expired");
            self.sessions.delete_session(session.id).await?;
            return Ok(Identity::Anonymous);
        }

        let fresh = session.is_fresh(now, self.settings.reauth_window());
        Ok(Identity::Authenticated(Principal::new(
            session.account_id,
            session.id,
            fresh,
        )))
    }

    /// Establishes a session for an account whose credential has been verified
    ///
    /// If the requester already holds a session for this account, that session
    /// is replaced.
    ///
    /// # Errors
    ///
    /// - `SessionError::AccountInactive` if the account is not active
    /// - `SessionError::AlreadyAuthenticated` if the requester is signed in as
    ///   another account
    pub async fn login(&self, requester: &Identity, account: &Account) -> Result<IssuedSession, SessionError> {
        if !account.status.can_login() {
            return Err(SessionError::AccountInactive);
        }

        if let Some(principal) = requester.principal() {
            if principal.account_id() != account.id {
                return Err(SessionError::AlreadyAuthenticated);
            }
            self.sessions.delete_session(principal.session_id()).await?;
        }

        self.purge_expired().await?;

        let (token, token_hash) = generate_session_token();
        let record = SessionRecord::new(account.id, token_hash, self.settings.ttl());
        self.sessions.insert_session(&record).await?;

        tracing::info!(account_id = %account.id, session_id = %record.id, "Session established");

        Ok(IssuedSession { token, record })
    }

    /// Marks the requester's session fresh again
    ///
    /// `account` must be the account bound to the session, with its credential
    /// already verified.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotAuthenticated` for anonymous requesters or a session
    ///   that vanished meanwhile
    /// - `SessionError::AccountMismatch` if `account` is not the session's account
    pub async fn reauth(&self, requester: &Identity, account: &Account) -> Result<Principal, SessionError> {
        let principal = requester.principal().ok_or(SessionError::NotAuthenticated)?;

        if principal.account_id() != account.id {
            return Err(SessionError::AccountMismatch);
        }

        if !self.sessions.refresh_session(principal.session_id(), Utc::now()).await? {
            return Err(SessionError::NotAuthenticated);
        }

        tracing::debug!(account_id = %account.id, "Session re-authenticated");

        Ok(Principal::new(principal.account_id(), principal.session_id(), true))
    }

    /// Ends the requester's session; a no-op for anonymous requesters
    pub async fn logout(&self, requester: &Identity) -> Result<(), StoreError> {
        if let Some(principal) = requester.principal() {
            if self.sessions.delete_session(principal.session_id()).await? {
                tracing::info!(account_id = %principal.account_id(), "Session ended");
            }
        }
        Ok(())
    }

    /// Deletes every expired session; returns how many were removed
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let purged = self.sessions.delete_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions purged");
        }
        Ok(purged)
    }

    /// Ends every session of an account
    pub async fn revoke_all(&self, account_id: Uuid) -> Result<u64, StoreError> {
        let revoked = self.sessions.delete_account_sessions(account_id).await?;
        if revoked > 0 {
            tracing::info!(account_id = %account_id, revoked, "Sessions revoked");
        }
        Ok(revoked)
    }
}
