/// Account endpoints
///
/// - `GET /users` - List accounts visible to the requester
/// - `POST /users` - Register
/// - `GET /users/:id` - Read an account
/// - `PUT /users/:id` - Change password (body has `password`) or update profile
/// - `DELETE /users/:id` - Deactivate
/// - `GET /users/:email/:activation_key` - Who a mailed link is for
/// - `POST /users/password/reset` - Mail a password reset link
/// - `PUT /users/password/:email/:activation_key` - Set a new password from a link
/// - `PUT /users/activate/:email/:activation_key` - Reactivate from a link
///
/// Sensitive changes (password, deactivation) answer 401 when the session
/// needs re-authentication.

use axum::extract::{Path, State};
use gatehouse_shared::{
    models::account::AccountView,
    validation::{ActivateForm, ChangePasswordForm, ProfileForm, RecoverPasswordForm, RegisterForm},
};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    envelope::Jsend,
    error::{ApiError, ApiResult},
    extract::{JsonForm, Requester},
};

/// Payload of `PUT /users/:id`: the updated account, or `null` after a password change
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AccountUpdate {
    Profile(AccountView),
    Password,
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::NotFound(format!("No account with id {}", id)))
}

fn form_from<T: DeserializeOwned>(body: serde_json::Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        ApiError::WrongData
    })
}

/// List accounts
///
/// Admin and staff see every account, anyone else a list with only their own.
pub async fn list(
    State(state): State<AppState>,
    Requester(requester): Requester,
) -> ApiResult<Jsend<Vec<AccountView>>> {
    Ok(state.controller.list_accounts(&requester).await?.into())
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /users
/// Content-Type: application/json
///
/// {
///   "username": "demo",
///   "email": "demo@example.com",
///   "password": "default",
///   "password_again": "default"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: already signed in
pub async fn register(
    State(state): State<AppState>,
    Requester(requester): Requester,
    JsonForm(form): JsonForm<RegisterForm>,
) -> ApiResult<Jsend<AccountView>> {
    Ok(state.controller.register(&requester, form).await?.into())
}

/// Read one account
pub async fn get(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Path(id): Path<String>,
) -> ApiResult<Jsend<AccountView>> {
    let id = parse_id(&id)?;
    Ok(state.controller.get_account(&requester, id).await?.into())
}

/// Change the password or update the profile
///
/// A body carrying `password` is a password change (fresh session needed);
/// anything else replaces the profile.
pub async fn update(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Path(id): Path<String>,
    JsonForm(body): JsonForm<serde_json::Value>,
) -> ApiResult<Jsend<AccountUpdate>> {
    let id = parse_id(&id)?;

    if body.get("password").is_some() {
        let form: ChangePasswordForm = form_from(body)?;
        let outcome = state.controller.change_password(&requester, id, form).await?;
        return Ok(outcome.map(|()| AccountUpdate::Password).into());
    }

    let form: ProfileForm = form_from(body)?;
    let outcome = state.controller.update_profile(&requester, id, form).await?;
    Ok(outcome.map(AccountUpdate::Profile).into())
}

/// Deactivate the requester's account
pub async fn deactivate(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Path(id): Path<String>,
) -> ApiResult<Jsend<()>> {
    let id = parse_id(&id)?;
    Ok(state.controller.deactivate(&requester, id).await?.into())
}

/// Account a pending confirmation link was issued for
pub async fn lookup_pending(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Path((email, activation_key)): Path<(String, String)>,
) -> ApiResult<Jsend<AccountView>> {
    Ok(state
        .controller
        .lookup_pending(&requester, &email, &activation_key)
        .await?
        .into())
}

/// Mail a password reset link
pub async fn request_password_reset(
    State(state): State<AppState>,
    Requester(requester): Requester,
    JsonForm(form): JsonForm<RecoverPasswordForm>,
) -> ApiResult<Jsend<()>> {
    Ok(state
        .controller
        .request_password_reset(&requester, form)
        .await?
        .into())
}

/// Set a new password through a reset link
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Path((email, activation_key)): Path<(String, String)>,
    JsonForm(form): JsonForm<ChangePasswordForm>,
) -> ApiResult<Jsend<()>> {
    Ok(state
        .controller
        .confirm_password_reset(&requester, &email, &activation_key, form)
        .await?
        .into())
}

/// Reactivate an account through a reactivation link
pub async fn activate(
    State(state): State<AppState>,
    Requester(requester): Requester,
    Path((email, activation_key)): Path<(String, String)>,
    JsonForm(form): JsonForm<ActivateForm>,
) -> ApiResult<Jsend<()>> {
    Ok(state
        .controller
        .activate(&requester, &email, &activation_key, form)
        .await?
        .into())
}
