/// Persistence seams
///
/// The lifecycle controller and the session authority talk to storage only
/// through [`AccountRepository`] and [`SessionRepository`]. Two backends
/// implement both:
///
/// - [`postgres::PgStore`]: sqlx on PostgreSQL, used in production
/// - [`memory::MemoryStore`]: process-local maps, used for development and tests
///
/// Both enforce username and email uniqueness (email case-insensitively) and
/// report violations as [`StoreError::Conflict`]. An account and its profile
/// are always written together.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{account::Account, session::SessionRecord};

pub mod memory;
pub mod postgres;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field is already taken
    #[error("{field} is already taken")]
    Conflict { field: &'static str },

    /// The record to update does not exist
    #[error("Record not found")]
    NotFound,

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Accounts together with their profiles
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Inserts a new account and its profile
    ///
    /// # Errors
    ///
    /// `StoreError::Conflict` if the username or email is taken.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Overwrites every mutable field of the account and its profile
    ///
    /// `id` and `created_time` are never changed.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the account does not exist, `StoreError::Conflict`
    /// if the new username or email belongs to another account.
    async fn update_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Looks up an account by username or email
    async fn find_by_login(&self, login: &str) -> Result<Option<Account>, StoreError>;

    /// Looks up the account with this email whose pending activation key is `key`
    async fn find_by_activation(&self, email: &str, key: &str) -> Result<Option<Account>, StoreError>;

    /// All accounts, oldest first
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Checks that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Server-side session records
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError>;

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Moves the session's `fresh_at` to `fresh_at`; returns false if it no longer exists
    async fn refresh_session(
        &self,
        session_id: Uuid,
        fresh_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool, StoreError>;

    /// Deletes one session; returns false if it was already gone
    async fn delete_session(&self, session_id: Uuid) -> Result<bool, StoreError>;

    /// Deletes every session bound to the account; returns how many were removed
    async fn delete_account_sessions(&self, account_id: Uuid) -> Result<u64, StoreError>;

    /// Deletes every session expired at `now`; returns how many were removed
    async fn delete_expired_sessions(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError>;
}
