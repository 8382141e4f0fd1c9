/// Account model
///
/// An account is the identity a person signs in with. It carries the role,
/// the lifecycle status, the Argon2id credential and, while an emailed
/// confirmation is pending, a single-use activation key.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE account_role AS ENUM ('admin', 'staff', 'user');
/// CREATE TYPE account_status AS ENUM ('inactive', 'new', 'active');
///
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY,
///     username VARCHAR(32) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash TEXT NOT NULL,
///     role account_role NOT NULL DEFAULT 'user',
///     status account_status NOT NULL DEFAULT 'inactive',
///     activation_key VARCHAR(36),
///     created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Profile detail lives in `account_profiles` and is loaded together with the
/// account (see [`super::profile`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::Profile;

/// Account roles, most privileged first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Full administrative access
    Admin,

    /// Staff member; may read every account
    Staff,

    /// Regular account
    User,
}

impl AccountRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Admin => "admin",
            AccountRole::Staff => "staff",
            AccountRole::User => "user",
        }
    }

    /// Ordinal of the role: admin = 0, staff = 1, user = 2
    pub fn ordinal(&self) -> u8 {
        match self {
            AccountRole::Admin => 0,
            AccountRole::Staff => 1,
            AccountRole::User => 2,
        }
    }

    /// Admin and staff may read the full account list
    pub fn can_list_accounts(&self) -> bool {
        matches!(self, AccountRole::Admin | AccountRole::Staff)
    }

    /// Checks if this role is at least as privileged as `required`
    pub fn has_permission(&self, required: &AccountRole) -> bool {
        self.ordinal() <= required.ordinal()
    }
}

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Deactivated; login triggers a reactivation email instead
    Inactive,

    /// Registered but not yet confirmed
    New,

    /// May log in
    Active,
}

impl AccountStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Inactive => "inactive",
            AccountStatus::New => "new",
            AccountStatus::Active => "active",
        }
    }

    /// Only active accounts may establish a session
    pub fn can_login(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

/// Account record
///
/// Deliberately not `Serialize`: the credential must never leave the server.
/// Use [`AccountView`] or [`SessionView`] for responses.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID (UUID v4)
    pub id: Uuid,

    /// Unique username
    pub username: String,

    /// Unique email address (compared case-insensitively)
    pub email: String,

    /// Argon2id PHC string; empty when no credential has been set
    pub password_hash: String,

    /// Account role
    pub role: AccountRole,

    /// Lifecycle status
    pub status: AccountStatus,

    /// Pending confirmation token, if any
    pub activation_key: Option<String>,

    /// When the account was created; never changes
    pub created_time: DateTime<Utc>,

    /// Profile detail
    #[sqlx(flatten)]
    pub profile: Profile,
}

/// Input for creating a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,

    /// Argon2id hash (NOT plaintext password!)
    pub password_hash: String,

    pub role: AccountRole,
    pub status: AccountStatus,
    pub profile: Profile,
}

impl NewAccount {
    /// A regular, immediately active account with an empty profile
    pub fn member(username: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash,
            role: AccountRole::User,
            status: AccountStatus::Active,
            profile: Profile::default(),
        }
    }
}

impl Account {
    /// Materializes a new account with a fresh ID and creation time
    pub fn from_new(data: NewAccount) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            status: data.status,
            activation_key: None,
            created_time: Utc::now(),
            profile: data.profile,
        }
    }

    /// Opens a confirmation window, replacing any pending key
    ///
    /// Returns the new key.
    pub fn issue_activation_key(&mut self) -> String {
        let key = Uuid::new_v4().to_string();
        self.activation_key = Some(key.clone());
        key
    }

    /// Closes the confirmation window
    pub fn clear_activation_key(&mut self) {
        self.activation_key = None;
    }

    /// Public representation of the account
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            created_time: self.created_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            first_name: self.profile.first_name.clone(),
            last_name: self.profile.last_name.clone(),
            gender: self.profile.gender.clone(),
            dob: self.profile.dob.map(|dob| dob.format("%Y-%m-%d").to_string()),
            phone: self.profile.phone.clone(),
            bio: self.profile.bio.clone(),
            url: self.profile.url.clone(),
        }
    }

    /// Session representation for a requester holding a session on this account
    pub fn session_view(&self) -> SessionView {
        SessionView {
            auth: true,
            id: Some(self.id),
            username: Some(self.username.clone()),
            email: Some(self.email.clone()),
            status: Some(self.status),
        }
    }

    /// Session representation for this account when no session was issued
    pub fn unauthenticated_view(&self) -> SessionView {
        SessionView {
            auth: false,
            ..self.session_view()
        }
    }
}

/// Account as exposed over the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_time: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
}

/// Session state as exposed over the API
///
/// Anonymous requesters see only `{"auth": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub auth: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
}

impl SessionView {
    /// The view of an anonymous requester
    pub fn anonymous() -> Self {
        Self {
            auth: false,
            id: None,
            username: None,
            email: None,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn demo() -> Account {
        Account::from_new(NewAccount::member("demo", "demo@example.com", "hash".to_string()))
    }

    #[test]
    fn test_member_defaults() {
        let account = demo();
        assert_eq!(account.role, AccountRole::User);
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.activation_key.is_none());
        assert_eq!(account.profile, Profile::default());
    }

    #[test]
    fn test_role_privileges() {
        assert!(AccountRole::Admin.can_list_accounts());
        assert!(AccountRole::Staff.can_list_accounts());
        assert!(!AccountRole::User.can_list_accounts());

        assert!(AccountRole::Admin.has_permission(&AccountRole::Staff));
        assert!(AccountRole::Staff.has_permission(&AccountRole::Staff));
        assert!(!AccountRole::User.has_permission(&AccountRole::Staff));
    }

    #[test]
    fn test_only_active_can_login() {
        assert!(AccountStatus::Active.can_login());
        assert!(!AccountStatus::Inactive.can_login());
        assert!(!AccountStatus::New.can_login());
    }

    #[test]
    fn test_new_activation_key_replaces_previous() {
        let mut account = demo();
        let first = account.issue_activation_key();
        let second = account.issue_activation_key();

        assert_ne!(first, second);
        assert_eq!(account.activation_key.as_deref(), Some(second.as_str()));

        account.clear_activation_key();
        assert!(account.activation_key.is_none());
    }

    #[test]
    fn test_view_formats_dates() {
        let mut account = demo();
        account.profile.dob = NaiveDate::from_ymd_opt(1985, 1, 17);

        let view = account.view();
        assert_eq!(view.dob.as_deref(), Some("1985-01-17"));
        assert_eq!(view.created_time.len(), "2025-01-01 00:00:00".len());
    }

    #[test]
    fn test_view_never_exposes_credential() {
        let json = serde_json::to_string(&demo().view()).unwrap();
        assert!(!json.contains("hash"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_session_views() {
        let account = demo();

        let json = serde_json::to_value(account.session_view()).unwrap();
        assert_eq!(json["auth"], true);
        assert_eq!(json["username"], "demo");
        assert_eq!(json["status"], "active");

        let json = serde_json::to_value(SessionView::anonymous()).unwrap();
        assert_eq!(json, serde_json::json!({ "auth": false }));

        let view = account.unauthenticated_view();
        assert!(!view.auth);
        assert_eq!(view.username.as_deref(), Some("demo"));
    }
}
