use crate::auth::{authorization::require_authenticated, identity::Identity, session::IssuedSession};
use crate::mail::templates;
use crate::models::account::{Account, SessionView};
use crate::validation::{check, LoginForm};

use super::{LifecycleController, LifecycleResult, Outcome};

const WRONG_CREDENTIALS: &str = "Wrong email/password.";

/// Result of a successful login
///
/// `issued` is `None` when the credential was right but the account is not
/// active; a reactivation link has been mailed instead.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session: SessionView,
    pub issued: Option<IssuedSession>,
}

impl LifecycleController {
    /// Looks up an account by username or email and checks its password
    ///
    /// Unknown logins still pay for a hash verification.
    async fn authenticate(&self, form: &LoginForm) -> Result<Option<Account>, super::LifecycleError> {
        match self.accounts.find_by_login(form.email.trim()).await? {
            Some(account) if self.credentials.verify_credential(&account, &form.password) => {
                Ok(Some(account))
            }
            Some(account) => {
                tracing::debug!(account_id = %account.id, "Wrong password");
                Ok(None)
            }
            None => {
                self.credentials.verify_unknown(&form.password);
                Ok(None)
            }
        }
    }

    /// Logs in with a username or email and a password
    ///
    /// An inactive account gets a reactivation link by mail instead of a
    /// session, and the response carries its unauthenticated view.
    pub async fn login(&self, requester: &Identity, form: LoginForm) -> LifecycleResult<LoginResult> {
        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        let mut account = match self.authenticate(&form).await? {
            Some(account) => account,
            None => return Ok(Outcome::fail("email", WRONG_CREDENTIALS)),
        };

        if account.status.can_login() {
            let issued = self.sessions.login(requester, &account).await?;
            return Ok(Outcome::Success(LoginResult {
                session: account.session_view(),
                issued: Some(issued),
            }));
        }

        let key = account.issue_activation_key();
        if let Some(errors) = self.save(&account, false).await? {
            return Ok(Outcome::Fail(errors));
        }

        tracing::info!(account_id = %account.id, status = account.status.as_str(), "Reactivation requested");

        let url = templates::reactivation_url(&self.settings.domain, &account.email, &key);
        let mail = templates::reactivation(&self.settings.app_name, &account.email, &account.username, &url);
        if let Some(errors) = self.deliver(mail, &account.email).await {
            return Ok(Outcome::Fail(errors));
        }

        Ok(Outcome::Success(LoginResult {
            session: account.unauthenticated_view(),
            issued: None,
        }))
    }

    /// The requester's session state
    pub async fn current_session(&self, requester: &Identity) -> LifecycleResult<SessionView> {
        let view = match requester.account_id() {
            Some(id) => self
                .load_account(id)
                .await?
                .map(|account| account.session_view())
                .unwrap_or_else(SessionView::anonymous),
            None => SessionView::anonymous(),
        };
        Ok(Outcome::Success(view))
    }

    /// Confirms the password of the signed-in account, making the session fresh
    pub async fn reauth(&self, requester: &Identity, form: LoginForm) -> LifecycleResult<SessionView> {
        let principal = require_authenticated(requester)?;

        if let Err(errors) = check(&form) {
            return Ok(Outcome::Fail(errors));
        }

        let account = match self.authenticate(&form).await? {
            Some(account) if account.id == principal.account_id() => account,
            _ => return Ok(Outcome::fail("email", WRONG_CREDENTIALS)),
        };

        self.sessions.reauth(requester, &account).await?;
        Ok(Outcome::Success(account.session_view()))
    }

    /// Ends the requester's session; anonymous requesters succeed too
    pub async fn logout(&self, requester: &Identity) -> LifecycleResult<SessionView> {
        self.sessions.logout(requester).await?;
        Ok(Outcome::Success(SessionView::anonymous()))
    }
}
