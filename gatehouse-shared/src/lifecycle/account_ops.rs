use uuid::Uuid;

use crate::auth::{
    authorization::{require_anonymous, require_fresh_owner, require_owner, require_role},
    identity::Identity,
};
use crate::mail::templates;
use crate::models::account::{Account, AccountRole, AccountStatus, AccountView, NewAccount};
use crate::validation::{check, ChangePasswordForm, FieldErrors, ProfileForm, RegisterForm};

use super::{conflict_error, LifecycleController, LifecycleResult, Outcome, NO_USER_FOUND};

impl LifecycleController {
    /// Creates an active regular account with an empty profile
    ///
    /// Does not sign the new account in.
    pub async fn register(&self, requester: &Identity, form: RegisterForm) -> LifecycleResult<AccountView> {
        require_anonymous(requester)?;

        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        let username = form.username.trim();
        let email = form.email.trim();

        let mut taken = FieldErrors::new();
        if self.accounts.find_by_username(username).await?.is_some() {
            taken.extend(conflict_error("username"));
        }
        if self.accounts.find_by_email(email).await?.is_some() {
            taken.extend(conflict_error("email"));
        }
        if !taken.is_empty() {
            return Ok(Outcome::Fail(taken));
        }

        let mut account = Account::from_new(NewAccount::member(username, email, String::new()));
        self.credentials.set_credential(&mut account, &form.password)?;

        // A concurrent registration can still win the race
        if let Some(errors) = self.save(&account, true).await? {
            return Ok(Outcome::Fail(errors));
        }

        tracing::info!(account_id = %account.id, username = %account.username, "Account registered");

        Ok(Outcome::Success(account.view()))
    }

    /// Reads one account
    ///
    /// Requesters may read their own account; admin and staff may read any.
    pub async fn get_account(&self, requester: &Identity, id: Uuid) -> LifecycleResult<AccountView> {
        let viewer = self.requester_account(requester).await?;

        let account = if viewer.id == id {
            viewer
        } else {
            require_role(&viewer, AccountRole::Staff)?;
            match self.load_account(id).await? {
                Some(account) => account,
                None => return Ok(Outcome::fail("id", NO_USER_FOUND)),
            }
        };

        Ok(Outcome::Success(account.view()))
    }

    /// Lists accounts visible to the requester
    ///
    /// Admin and staff see every account; anyone else sees a list holding
    /// only their own.
    pub async fn list_accounts(&self, requester: &Identity) -> LifecycleResult<Vec<AccountView>> {
        let viewer = self.requester_account(requester).await?;

        if !viewer.role.can_list_accounts() {
            return Ok(Outcome::Success(vec![viewer.view()]));
        }

        let accounts = self.accounts.list_accounts().await?;
        Ok(Outcome::Success(accounts.iter().map(Account::view).collect()))
    }

    /// Replaces the identity and profile fields of the requester's account
    ///
    /// Omitted optional fields are cleared.
    pub async fn update_profile(
        &self,
        requester: &Identity,
        id: Uuid,
        form: ProfileForm,
    ) -> LifecycleResult<AccountView> {
        require_owner(requester, id)?;

        let form = form.normalized();
        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        let mut account = match self.load_account(id).await? {
            Some(account) => account,
            None => return Ok(Outcome::fail("id", NO_USER_FOUND)),
        };

        let dob = form.dob_date();
        account.username = form.username;
        account.email = form.email;
        account.profile.first_name = form.first_name;
        account.profile.last_name = form.last_name;
        account.profile.gender = form.gender;
        account.profile.dob = dob;
        account.profile.phone = form.phone;
        account.profile.bio = form.bio;
        account.profile.url = form.url;

        if let Some(errors) = self.save(&account, false).await? {
            return Ok(Outcome::Fail(errors));
        }

        tracing::info!(account_id = %account.id, "Profile updated");

        Ok(Outcome::Success(account.view()))
    }

    /// Sets a new password; needs a fresh session on the account
    pub async fn change_password(
        &self,
        requester: &Identity,
        id: Uuid,
        form: ChangePasswordForm,
    ) -> LifecycleResult<()> {
        require_fresh_owner(requester, id)?;

        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        let mut account = match self.load_account(id).await? {
            Some(account) => account,
            None => return Ok(Outcome::fail("id", NO_USER_FOUND)),
        };

        self.credentials.set_credential(&mut account, &form.password)?;
        if let Some(errors) = self.save(&account, false).await? {
            return Ok(Outcome::Fail(errors));
        }

        tracing::info!(account_id = %account.id, "Password changed");

        Ok(Outcome::Success(()))
    }

    /// Deactivates the requester's account and ends all its sessions
    ///
    /// Needs a fresh session. A receipt is mailed afterwards; if that fails
    /// the account stays deactivated and the failure is reported.
    pub async fn deactivate(&self, requester: &Identity, id: Uuid) -> LifecycleResult<()> {
        require_fresh_owner(requester, id)?;

        let mut account = match self.load_account(id).await? {
            Some(account) => account,
            None => return Ok(Outcome::fail("id", NO_USER_FOUND)),
        };

        account.status = AccountStatus::Inactive;
        if let Some(errors) = self.save(&account, false).await? {
            return Ok(Outcome::Fail(errors));
        }
        self.sessions.revoke_all(account.id).await?;

        tracing::info!(account_id = %account.id, "Account deactivated");

        let url = templates::login_url(&self.settings.domain);
        let mail = templates::deactivation_receipt(
            &self.settings.app_name,
            &account.email,
            &account.username,
            &url,
        );
        if let Some(errors) = self.deliver(mail, &account.email).await {
            return Ok(Outcome::Fail(errors));
        }

        Ok(Outcome::Success(()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{login_form, Harness};
    use super::*;
    use crate::auth::authorization::AuthzError;
    use crate::auth::identity::SessionState;
    use crate::auth::session::SessionSettings;
    use crate::lifecycle::LifecycleError;
    use crate::store::AccountRepository;

    fn register_form(username: &str, email: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: email.to_string(),
            password: "default".to_string(),
            password_again: "default".to_string(),
        }
    }

    fn profile_form(username: &str, email: &str) -> ProfileForm {
        ProfileForm {
            username: username.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    fn password_form(password: &str) -> ChangePasswordForm {
        ChangePasswordForm {
            password: password.to_string(),
            password_again: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_active_member() {
        let h = Harness::new();
        let account = h.register("demo", "demo@example.com").await;

        assert_eq!(account.role, AccountRole::User);
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.password_hash.starts_with("$argon2id$"));
        assert!(account.activation_key.is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username_and_email() {
        let h = Harness::new();
        h.register("demo", "demo@example.com").await;

        let outcome = h
            .controller
            .register(&Identity::Anonymous, register_form("demo", "DEMO@example.com"))
            .await
            .unwrap();

        let errors = outcome.into_result().unwrap_err();
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("email"));
        assert_eq!(h.store.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_reports_form_errors() {
        let h = Harness::new();
        let outcome = h
            .controller
            .register(&Identity::Anonymous, RegisterForm::default())
            .await
            .unwrap();

        let errors = outcome.into_result().unwrap_err();
        assert_eq!(errors["username"], vec!["This field is required.".to_string()]);
    }

    #[tokio::test]
    async fn test_register_requires_anonymous() {
        let h = Harness::new();
        h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let result = h
            .controller
            .register(&identity, register_form("other", "other@example.com"))
            .await;
        assert!(matches!(
            result,
            Err(LifecycleError::Authz(AuthzError::AlreadyAuthenticated))
        ));
    }

    #[tokio::test]
    async fn test_get_account_permissions() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let other = h.register("other", "other@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let view = h.controller.get_account(&identity, demo.id).await.unwrap();
        assert_eq!(view.into_result().unwrap().username, "demo");

        let result = h.controller.get_account(&identity, other.id).await;
        assert!(matches!(
            result,
            Err(LifecycleError::Authz(AuthzError::InsufficientRole { .. }))
        ));

        let result = h.controller.get_account(&Identity::Anonymous, demo.id).await;
        assert!(matches!(
            result,
            Err(LifecycleError::Authz(AuthzError::NotAuthenticated))
        ));
    }

    #[tokio::test]
    async fn test_staff_reads_and_lists_everyone() {
        let h = Harness::new();
        let mut staff = h.register("staff", "staff@example.com").await;
        staff.role = AccountRole::Staff;
        h.store.update_account(&staff).await.unwrap();
        let demo = h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("staff", "default").await;

        let view = h.controller.get_account(&identity, demo.id).await.unwrap();
        assert_eq!(view.into_result().unwrap().id, demo.id);

        let missing = h.controller.get_account(&identity, Uuid::new_v4()).await.unwrap();
        assert_eq!(missing, Outcome::fail("id", NO_USER_FOUND));

        let all = h.controller.list_accounts(&identity).await.unwrap().into_result().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_member_lists_only_self() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        h.register("other", "other@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let list = h.controller.list_accounts(&identity).await.unwrap().into_result().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, demo.id);
    }

    #[tokio::test]
    async fn test_update_profile_overwrites_fields() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let form = ProfileForm {
            first_name: Some("Demo".to_string()),
            dob: Some("1985-01-17".to_string()),
            bio: Some("Hello".to_string()),
            ..profile_form("demo_2", "demo2@example.com")
        };
        let view = h
            .controller
            .update_profile(&identity, demo.id, form)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(view.username, "demo_2");
        assert_eq!(view.first_name.as_deref(), Some("Demo"));
        assert_eq!(view.dob.as_deref(), Some("1985-01-17"));
        assert_eq!(view.created_time, demo.view().created_time);

        // Omitted optional fields are cleared
        let view = h
            .controller
            .update_profile(&identity, demo.id, profile_form("demo_2", "demo2@example.com"))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(view.first_name, None);
        assert_eq!(view.bio, None);
    }

    #[tokio::test]
    async fn test_update_profile_conflicts_and_ownership() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let other = h.register("other", "other@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let outcome = h
            .controller
            .update_profile(&identity, demo.id, profile_form("other", "demo@example.com"))
            .await
            .unwrap();
        assert!(outcome.into_result().unwrap_err().contains_key("username"));

        let result = h
            .controller
            .update_profile(&identity, other.id, profile_form("other", "other@example.com"))
            .await;
        assert!(matches!(result, Err(LifecycleError::Authz(AuthzError::NotOwner))));
    }

    #[tokio::test]
    async fn test_change_password() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let outcome = h
            .controller
            .change_password(&identity, demo.id, password_form("newpass1"))
            .await
            .unwrap();
        assert!(outcome.is_success());

        let old = h
            .controller
            .login(&Identity::Anonymous, login_form("demo", "default"))
            .await
            .unwrap();
        assert!(!old.is_success());
        h.login("demo", "newpass1").await;
    }

    #[tokio::test]
    async fn test_change_password_validates_form() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let form = ChangePasswordForm {
            password: "newpass1".to_string(),
            password_again: "newpass2".to_string(),
        };
        let outcome = h.controller.change_password(&identity, demo.id, form).await.unwrap();
        assert_eq!(
            outcome.into_result().unwrap_err()["password_again"],
            vec!["Passwords don't match.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sensitive_operations_need_fresh_session() {
        let h = Harness::with_sessions(SessionSettings {
            reauth_window_minutes: 0,
            ..SessionSettings::default()
        });
        let demo = h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("demo", "default").await;
        assert_eq!(identity.state(), SessionState::NeedsReauth);

        let result = h
            .controller
            .change_password(&identity, demo.id, password_form("newpass1"))
            .await;
        assert!(matches!(result, Err(LifecycleError::Authz(AuthzError::ReauthRequired))));

        let result = h.controller.deactivate(&identity, demo.id).await;
        assert!(matches!(result, Err(LifecycleError::Authz(AuthzError::ReauthRequired))));

        // Profile edits only need ownership
        let outcome = h
            .controller
            .update_profile(&identity, demo.id, profile_form("demo", "demo@example.com"))
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_deactivate_ends_sessions_and_sends_receipt() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let (identity, issued) = h.login("demo", "default").await;

        let outcome = h.controller.deactivate(&identity, demo.id).await.unwrap();
        assert!(outcome.is_success());

        assert_eq!(h.account(demo.id).await.status, AccountStatus::Inactive);
        let after = h
            .controller
            .sessions()
            .current_identity(Some(&issued.token))
            .await
            .unwrap();
        assert_eq!(after, Identity::Anonymous);

        let mail = h.outbox.last().expect("receipt should be sent");
        assert_eq!(mail.subject, "Your Gatehouse account is now deactivated");

        // Logging in now only mails a reactivation link
        let result = h
            .controller
            .login(&Identity::Anonymous, login_form("demo", "default"))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert!(result.issued.is_none());
    }

    #[tokio::test]
    async fn test_deactivate_keeps_status_when_mail_fails() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("demo", "default").await;
        h.outbox.set_failing(true);

        let outcome = h.controller.deactivate(&identity, demo.id).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::fail("email", "Couldn't send email to demo@example.com.")
        );
        assert_eq!(h.account(demo.id).await.status, AccountStatus::Inactive);
    }
}
