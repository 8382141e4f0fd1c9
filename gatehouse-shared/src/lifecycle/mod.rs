/// Account lifecycle
///
/// The [`LifecycleController`] implements every account operation: register,
/// login and logout, re-authentication, profile and password changes,
/// deactivation, password recovery, activation and the contact form.
///
/// # Outcomes and errors
///
/// Operations return `Result<Outcome<T>, LifecycleError>`:
///
/// - `Ok(Outcome::Success(payload))`: the operation happened
/// - `Ok(Outcome::Fail(field_errors))`: a business rule refused it (bad
///   input, unknown token, taken username, mail that couldn't be sent)
/// - `Err(LifecycleError::Authz(_))`: the requester may not do this at all
/// - `Err(_)` otherwise: an internal fault
///
/// When an operation sends mail after changing state, a delivery failure is
/// reported as a `Fail` but the state change is kept.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use gatehouse_shared::auth::{
///     credential::{CredentialParams, CredentialStore},
///     identity::Identity,
///     session::{SessionAuthority, SessionSettings},
/// };
/// use gatehouse_shared::lifecycle::{LifecycleController, LifecycleSettings, Outcome};
/// use gatehouse_shared::mail::outbox::OutboxMailer;
/// use gatehouse_shared::store::memory::MemoryStore;
/// use gatehouse_shared::validation::RegisterForm;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let controller = LifecycleController::new(
///     store.clone(),
///     SessionAuthority::new(store, SessionSettings::default()),
///     CredentialStore::new(CredentialParams::minimal())?,
///     Arc::new(OutboxMailer::new()),
///     LifecycleSettings::default(),
/// );
///
/// let form = RegisterForm {
///     username: "demo".to_string(),
///     email: "demo@example.com".to_string(),
///     password: "default".to_string(),
///     password_again: "default".to_string(),
/// };
/// let outcome = controller.register(&Identity::Anonymous, form).await?;
/// assert!(matches!(outcome, Outcome::Success(_)));
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{
    authorization::{require_authenticated, AuthzError},
    credential::{CredentialError, CredentialStore},
    identity::Identity,
    session::{SessionAuthority, SessionError},
};
use crate::mail::{Mailer, OutgoingMail};
use crate::models::account::Account;
use crate::store::{AccountRepository, StoreError};
use crate::validation::{field_error, FieldErrors};

mod account_ops;
mod contact;
mod recovery_ops;
mod session_ops;

pub use session_ops::LoginResult;

/// Result of a lifecycle operation that was allowed to run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Fail(FieldErrors),
}

impl<T> Outcome<T> {
    /// A failure on a single field
    pub fn fail(field: &str, message: impl Into<String>) -> Self {
        Outcome::Fail(field_error(field, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Fail(errors) => Outcome::Fail(errors),
        }
    }

    pub fn into_result(self) -> Result<T, FieldErrors> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Fail(errors) => Err(errors),
        }
    }
}

/// Error type for lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<SessionError> for LifecycleError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyAuthenticated => AuthzError::AlreadyAuthenticated.into(),
            SessionError::NotAuthenticated | SessionError::AccountInactive => {
                AuthzError::NotAuthenticated.into()
            }
            SessionError::AccountMismatch => AuthzError::NotOwner.into(),
            SessionError::Store(e) => e.into(),
        }
    }
}

pub type LifecycleResult<T> = Result<Outcome<T>, LifecycleError>;

/// Names and addresses used in outgoing mail
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Product name used in subjects and bodies
    pub app_name: String,

    /// Base URL of the client application; confirmation links point here
    pub domain: String,

    /// Recipients of contact form messages
    pub admins: Vec<String>,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            app_name: "Gatehouse".to_string(),
            domain: "http://localhost:9000".to_string(),
            admins: vec!["admin@localhost".to_string()],
        }
    }
}

pub(crate) const NO_USER_FOUND: &str = "Sorry, no user found.";

pub struct LifecycleController {
    accounts: Arc<dyn AccountRepository>,
    sessions: SessionAuthority,
    credentials: CredentialStore,
    mailer: Arc<dyn Mailer>,
    settings: LifecycleSettings,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("sessions", &self.sessions)
            .field("credentials", &self.credentials)
            .field("settings", &self.settings)
            .finish()
    }
}

impl LifecycleController {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        sessions: SessionAuthority,
        credentials: CredentialStore,
        mailer: Arc<dyn Mailer>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            accounts,
            sessions,
            credentials,
            mailer,
            settings,
        }
    }

    /// The session authority, for resolving request identities
    pub fn sessions(&self) -> &SessionAuthority {
        &self.sessions
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Checks that the account store is reachable
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.accounts.ping().await
    }

    /// The account behind the requester's session
    ///
    /// A session whose account has disappeared is treated as no session.
    async fn requester_account(&self, requester: &Identity) -> Result<Account, LifecycleError> {
        let principal = require_authenticated(requester)?;
        self.accounts
            .find_account(principal.account_id())
            .await?
            .ok_or_else(|| AuthzError::NotAuthenticated.into())
    }

    async fn load_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.accounts.find_account(id).await
    }

    /// Persists an account, turning uniqueness conflicts into field errors
    async fn save(&self, account: &Account, is_new: bool) -> Result<Option<FieldErrors>, StoreError> {
        let result = if is_new {
            self.accounts.insert_account(account).await
        } else {
            self.accounts.update_account(account).await
        };

        match result {
            Ok(()) => Ok(None),
            Err(StoreError::Conflict { field }) => Ok(Some(conflict_error(field))),
            Err(e) => Err(e),
        }
    }

    /// Sends mail, mapping a delivery failure to a field error on `email`
    async fn deliver(&self, mail: OutgoingMail, recipient: &str) -> Option<FieldErrors> {
        match self.mailer.send(mail).await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(email = %recipient, error = %e, "Failed to send mail");
                Some(field_error("email", format!("Couldn't send email to {}.", recipient)))
            }
        }
    }
}

fn conflict_error(field: &str) -> FieldErrors {
    match field {
        "username" => field_error("username", "This username is already taken."),
        "email" => field_error("email", "This email is already registered."),
        other => field_error(other, "This value is already in use."),
    }
}
