/// Persistent records for Gatehouse
///
/// # Models
///
/// - `account`: Accounts with role, status, credential and pending activation key
/// - `profile`: Profile detail owned 1:1 by an account
/// - `session`: Server-side session records backing the session authority
///
/// # Example
///
/// ```
/// use gatehouse_shared::models::account::{Account, AccountStatus, NewAccount};
///
/// let account = Account::from_new(NewAccount::member(
///     "demo",
///     "demo@example.com",
///     "$argon2id$...".to_string(),
/// ));
/// assert_eq!(account.status, AccountStatus::Active);
/// assert!(account.activation_key.is_none());
/// ```

pub mod account;
pub mod profile;
pub mod session;
