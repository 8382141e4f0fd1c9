/// Authorization checks
///
/// # Permission Model
///
/// 1. **Anonymous-only**: registration, password recovery and confirmation
///    links require that nobody is signed in
/// 2. **Owner**: an account may change only itself; password changes and
///    deactivation additionally need a fresh session
/// 3. **Role**: admin and staff may read every account
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::authorization::require_anonymous;
/// use gatehouse_shared::auth::identity::Identity;
///
/// assert!(require_anonymous(&Identity::Anonymous).is_ok());
/// ```

use uuid::Uuid;

use super::identity::{Identity, Principal};
use crate::models::account::{Account, AccountRole};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No session
    #[error("You must be signed in to access this page.")]
    NotAuthenticated,

    /// The session is too old for a sensitive operation
    #[error("To protect your account, please reauthenticate to access this page.")]
    ReauthRequired,

    /// Signed in, but the operation is for anonymous requesters
    #[error("You are already signed in.")]
    AlreadyAuthenticated,

    /// The target account is not the requester's
    #[error("Not authorized to access this resource")]
    NotOwner,

    /// Requester's role is insufficient
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: AccountRole,
        actual: AccountRole,
    },
}

/// Requires that nobody is signed in
pub fn require_anonymous(identity: &Identity) -> Result<(), AuthzError> {
    if identity.is_authenticated() {
        return Err(AuthzError::AlreadyAuthenticated);
    }
    Ok(())
}

/// Requires a session, fresh or not
pub fn require_authenticated(identity: &Identity) -> Result<&Principal, AuthzError> {
    identity.principal().ok_or(AuthzError::NotAuthenticated)
}

/// Requires a session bound to `account_id`
pub fn require_owner(identity: &Identity, account_id: Uuid) -> Result<&Principal, AuthzError> {
    let principal = require_authenticated(identity)?;
    if principal.account_id() != account_id {
        return Err(AuthzError::NotOwner);
    }
    Ok(principal)
}

/// Requires a fresh session bound to `account_id`
///
/// Ownership is checked first, so a stale session acting on someone else's
/// account is told it is not the owner rather than asked to re-authenticate.
pub fn require_fresh_owner(identity: &Identity, account_id: Uuid) -> Result<&Principal, AuthzError> {
    let principal = require_owner(identity, account_id)?;
    if !principal.is_fresh() {
        return Err(AuthzError::ReauthRequired);
    }
    Ok(principal)
}

/// Checks if `viewer` has at least the `required` role
pub fn require_role(viewer: &Account, required: AccountRole) -> Result<(), AuthzError> {
    if !viewer.role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: viewer.role,
        });
    }
    Ok(())
}
