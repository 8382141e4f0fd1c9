/// Session endpoints
///
/// - `POST /session` - Log in
/// - `GET /session` - Current session state
/// - `PUT /session` - Re-authenticate
/// - `DELETE /session` - Log out
///
/// A successful login sets an HttpOnly session cookie; logout expires it.
/// Non-browser clients can send the cookie's token as `Authorization: Bearer`.

use axum::extract::State;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gatehouse_shared::{
    lifecycle::{LoginResult, Outcome},
    models::account::SessionView,
    validation::LoginForm,
};

use crate::{
    app::AppState,
    config::SessionConfig,
    envelope::Jsend,
    error::ApiResult,
    extract::{JsonForm, Requester},
};

/// Binds a session token to the client
fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .build()
}

/// Expires the session cookie
fn clear_cookie(jar: CookieJar, config: &SessionConfig) -> CookieJar {
    jar.remove(Cookie::build((config.cookie_name.clone(), "")).path("/"))
}

/// Log in with a username or email and a password
///
/// # Endpoint
///
/// ```text
/// POST /session
/// Content-Type: application/json
///
/// { "email": "demo@example.com", "password": "default" }
/// ```
///
/// # Response
///
/// ```json
/// { "status": "success", "data": { "auth": true, "id": "uuid", "username": "demo", "email": "demo@example.com", "status": "active" } }
/// ```
///
/// An inactive account answers `auth: false` and is mailed a reactivation link.
pub async fn login(
    State(state): State<AppState>,
    Requester(requester): Requester,
    jar: CookieJar,
    JsonForm(form): JsonForm<LoginForm>,
) -> ApiResult<(CookieJar, Jsend<SessionView>)> {
    let (jar, outcome) = match state.controller.login(&requester, form).await? {
        Outcome::Success(LoginResult { session, issued }) => {
            let jar = match issued {
                Some(issued) => jar.add(session_cookie(&state.config.session, issued.token)),
                None => jar,
            };
            (jar, Outcome::Success(session))
        }
        Outcome::Fail(errors) => (jar, Outcome::Fail(errors)),
    };

    Ok((jar, outcome.into()))
}

/// Current session state; `{"auth": false}` when signed out
pub async fn current(
    State(state): State<AppState>,
    Requester(requester): Requester,
) -> ApiResult<Jsend<SessionView>> {
    Ok(state.controller.current_session(&requester).await?.into())
}

/// Re-authenticate the current session with its password
pub async fn reauth(
    State(state): State<AppState>,
    Requester(requester): Requester,
    JsonForm(form): JsonForm<LoginForm>,
) -> ApiResult<Jsend<SessionView>> {
    Ok(state.controller.reauth(&requester, form).await?.into())
}

/// Log out; succeeds when already signed out
pub async fn logout(
    State(state): State<AppState>,
    Requester(requester): Requester,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Jsend<SessionView>)> {
    let outcome = state.controller.logout(&requester).await?;
    Ok((clear_cookie(jar, &state.config.session), outcome.into()))
}
