/// Request extractors
///
/// - [`Requester`]: the identity behind the request's session token, read from
///   the session cookie or an `Authorization: Bearer` header. A missing or
///   dead token is not an error; it resolves to `Identity::Anonymous`.
/// - [`JsonForm`]: a JSON body whose parse failures answer 405 "Wrong data.".

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use gatehouse_shared::auth::identity::Identity;

use crate::{app::AppState, error::ApiError};

/// Identity of the requester
#[derive(Debug, Clone, Copy)]
pub struct Requester(pub Identity);

/// Finds the session token on a request; the cookie wins over the header
pub fn session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(cookie_name) {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts, &state.config.session.cookie_name);
        let identity = state
            .controller
            .sessions()
            .current_identity(token.as_deref())
            .await?;
        Ok(Requester(identity))
    }
}

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonForm<T>(pub T);
