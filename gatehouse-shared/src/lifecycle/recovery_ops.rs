use crate::auth::{authorization::require_anonymous, identity::Identity};
use crate::mail::templates;
use crate::models::account::{AccountStatus, AccountView};
use crate::validation::{check, ActivateForm, ChangePasswordForm, RecoverPasswordForm};

use super::{LifecycleController, LifecycleResult, Outcome, NO_USER_FOUND};

impl LifecycleController {
    /// Resolves a mailed confirmation link to its account
    ///
    /// Clients use this to show who a reset or reactivation link is for.
    pub async fn lookup_pending(
        &self,
        requester: &Identity,
        email: &str,
        key: &str,
    ) -> LifecycleResult<AccountView> {
        require_anonymous(requester)?;

        match self.accounts.find_by_activation(email, key).await? {
            Some(account) => Ok(Outcome::Success(account.view())),
            None => Ok(Outcome::fail("id", NO_USER_FOUND)),
        }
    }

    /// Mails a password reset link
    ///
    /// Any earlier pending link stops working.
    pub async fn request_password_reset(
        &self,
        requester: &Identity,
        form: RecoverPasswordForm,
    ) -> LifecycleResult<()> {
        require_anonymous(requester)?;

        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        let mut account = match self.accounts.find_by_email(form.email.trim()).await? {
            Some(account) => account,
            None => {
                return Ok(Outcome::fail(
                    "email",
                    "Sorry, no user found for that email address.",
                ))
            }
        };

        let key = account.issue_activation_key();
        if let Some(errors) = self.save(&account, false).await? {
            return Ok(Outcome::Fail(errors));
        }

        tracing::info!(account_id = %account.id, "Password reset requested");

        let url = templates::password_reset_url(&self.settings.domain, &account.email, &key);
        let mail = templates::password_reset(&self.settings.app_name, &account.email, &account.username, &url);
        if let Some(errors) = self.deliver(mail, &account.email).await {
            return Ok(Outcome::Fail(errors));
        }

        Ok(Outcome::Success(()))
    }

    /// Sets a new password through a mailed reset link
    ///
    /// The link is consumed and every session of the account ends.
    pub async fn confirm_password_reset(
        &self,
        requester: &Identity,
        email: &str,
        key: &str,
        form: ChangePasswordForm,
    ) -> LifecycleResult<()> {
        require_anonymous(requester)?;

        let mut account = match self.accounts.find_by_activation(email, key).await? {
            Some(account) => account,
            None => {
                return Ok(Outcome::fail(
                    "id",
                    "Password couldn't be changed. Perhaps you already changed it?",
                ))
            }
        };

        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        self.credentials.set_credential(&mut account, &form.password)?;
        account.clear_activation_key();
        if let Some(errors) = self.save(&account, false).await? {
            return Ok(Outcome::Fail(errors));
        }
        self.sessions.revoke_all(account.id).await?;

        tracing::info!(account_id = %account.id, "Password reset");

        Ok(Outcome::Success(()))
    }

    /// Reactivates an account through a mailed link
    pub async fn activate(
        &self,
        requester: &Identity,
        email: &str,
        key: &str,
        form: ActivateForm,
    ) -> LifecycleResult<()> {
        require_anonymous(requester)?;

        let mut account = match self.accounts.find_by_activation(email, key).await? {
            Some(account) => account,
            None => {
                return Ok(Outcome::fail(
                    "id",
                    "Account couldn't be activated. Perhaps you already activated it?",
                ))
            }
        };

        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        account.status = AccountStatus::Active;
        account.clear_activation_key();
        if let Some(errors) = self.save(&account, false).await? {
            return Ok(Outcome::Fail(errors));
        }

        tracing::info!(account_id = %account.id, "Account activated");

        Ok(Outcome::Success(()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{login_form, Harness};
    use super::*;
    use crate::auth::authorization::AuthzError;
    use crate::lifecycle::LifecycleError;
    use crate::models::account::Account;
    use crate::store::AccountRepository;

    fn recover(email: &str) -> RecoverPasswordForm {
        RecoverPasswordForm {
            email: email.to_string(),
        }
    }

    fn new_password(password: &str) -> ChangePasswordForm {
        ChangePasswordForm {
            password: password.to_string(),
            password_again: password.to_string(),
        }
    }

    fn activate_form() -> ActivateForm {
        ActivateForm {
            status: "active".to_string(),
        }
    }

    async fn requested_key(h: &Harness, account: &Account) -> String {
        let outcome = h
            .controller
            .request_password_reset(&Identity::Anonymous, recover(&account.email))
            .await
            .unwrap();
        assert!(outcome.is_success());
        h.account(account.id).await.activation_key.expect("key should be issued")
    }

    #[tokio::test]
    async fn test_reset_mails_link_with_key() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let key = requested_key(&h, &demo).await;

        let mail = h.outbox.last().expect("mail should be sent");
        assert_eq!(mail.subject, "Recover your password");
        assert_eq!(mail.to, vec!["demo@example.com".to_string()]);
        assert!(mail.html_body.contains(&format!(
            "#accounts/password/reset/confirm/demo%40example.com/{}/",
            key
        )));
    }

    #[tokio::test]
    async fn test_reset_unknown_email() {
        let h = Harness::new();
        let outcome = h
            .controller
            .request_password_reset(&Identity::Anonymous, recover("nobody@example.com"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::fail("email", "Sorry, no user found for that email address.")
        );
        assert!(h.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reset_reports_mail_failure() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        h.outbox.set_failing(true);

        let outcome = h
            .controller
            .request_password_reset(&Identity::Anonymous, recover("demo@example.com"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::fail("email", "Couldn't send email to demo@example.com.")
        );
        // The key stays issued even though the mail did not go out
        assert!(h.account(demo.id).await.activation_key.is_some());
    }

    #[tokio::test]
    async fn test_second_request_supersedes_first_key() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let first = requested_key(&h, &demo).await;
        let second = requested_key(&h, &demo).await;
        assert_ne!(first, second);

        let stale = h
            .controller
            .lookup_pending(&Identity::Anonymous, "demo@example.com", &first)
            .await
            .unwrap();
        assert_eq!(stale, Outcome::fail("id", NO_USER_FOUND));

        let view = h
            .controller
            .lookup_pending(&Identity::Anonymous, "demo@example.com", &second)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(view.id, demo.id);
    }

    #[tokio::test]
    async fn test_confirm_reset_consumes_key_and_ends_sessions() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let (_, issued) = h.login("demo", "default").await;
        let key = requested_key(&h, &demo).await;

        let outcome = h
            .controller
            .confirm_password_reset(&Identity::Anonymous, "demo@example.com", &key, new_password("newpass1"))
            .await
            .unwrap();
        assert!(outcome.is_success());

        assert!(h.account(demo.id).await.activation_key.is_none());
        let after = h
            .controller
            .sessions()
            .current_identity(Some(&issued.token))
            .await
            .unwrap();
        assert_eq!(after, Identity::Anonymous);
        h.login("demo", "newpass1").await;

        // The key is single-use
        let again = h
            .controller
            .confirm_password_reset(&Identity::Anonymous, "demo@example.com", &key, new_password("newpass2"))
            .await
            .unwrap();
        assert_eq!(
            again,
            Outcome::fail("id", "Password couldn't be changed. Perhaps you already changed it?")
        );
    }

    #[tokio::test]
    async fn test_confirm_reset_validates_form_and_keeps_key() {
        let h = Harness::new();
        let demo = h.register("demo", "demo@example.com").await;
        let key = requested_key(&h, &demo).await;

        let outcome = h
            .controller
            .confirm_password_reset(
                &Identity::Anonymous,
                "demo@example.com",
                &key,
                ChangePasswordForm::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.into_result().unwrap_err()["password"],
            vec!["New password is required".to_string()]
        );
        assert_eq!(h.account(demo.id).await.activation_key, Some(key));
    }

    #[tokio::test]
    async fn test_recovery_requires_anonymous() {
        let h = Harness::new();
        h.register("demo", "demo@example.com").await;
        let (identity, _) = h.login("demo", "default").await;

        let result = h
            .controller
            .request_password_reset(&identity, recover("demo@example.com"))
            .await;
        assert!(matches!(
            result,
            Err(LifecycleError::Authz(AuthzError::AlreadyAuthenticated))
        ));

        let result = h.controller.lookup_pending(&identity, "demo@example.com", "key").await;
        assert!(matches!(
            result,
            Err(LifecycleError::Authz(AuthzError::AlreadyAuthenticated))
        ));
    }

    #[tokio::test]
    async fn test_reactivation_round_trip() {
        let h = Harness::new();
        let mut demo = h.register("demo", "demo@example.com").await;
        demo.status = AccountStatus::Inactive;
        h.store.update_account(&demo).await.unwrap();

        h.controller
            .login(&Identity::Anonymous, login_form("demo", "default"))
            .await
            .unwrap();
        let key = h.account(demo.id).await.activation_key.expect("key should be issued");

        let outcome = h
            .controller
            .activate(&Identity::Anonymous, "demo@example.com", &key, activate_form())
            .await
            .unwrap();
        assert!(outcome.is_success());

        let account = h.account(demo.id).await;
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.activation_key.is_none());
        h.login("demo", "default").await;

        let again = h
            .controller
            .activate(&Identity::Anonymous, "demo@example.com", &key, activate_form())
            .await
            .unwrap();
        assert_eq!(
            again,
            Outcome::fail("id", "Account couldn't be activated. Perhaps you already activated it?")
        );
    }

    #[tokio::test]
    async fn test_activate_requires_status_field() {
        let h = Harness::new();
        let mut demo = h.register("demo", "demo@example.com").await;
        let key = demo.issue_activation_key();
        h.store.update_account(&demo).await.unwrap();

        let outcome = h
            .controller
            .activate(&Identity::Anonymous, "demo@example.com", &key, ActivateForm::default())
            .await
            .unwrap();
        assert!(outcome.into_result().unwrap_err().contains_key("status"));
    }
}
