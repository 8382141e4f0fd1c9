/// JSend response envelope
///
/// Every lifecycle endpoint answers HTTP 200 with one of:
///
/// ```json
/// { "status": "success", "data": <payload> }
/// { "status": "fail", "data": { "<field>": ["<message>", ...] } }
/// ```

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use gatehouse_shared::{lifecycle::Outcome, validation::FieldErrors};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
enum Envelope<T> {
    Success(T),
    Fail(FieldErrors),
}

/// A lifecycle outcome rendered as a JSend envelope
#[derive(Debug)]
pub struct Jsend<T>(pub Outcome<T>);

impl<T> Jsend<T> {
    pub fn success(data: T) -> Self {
        Jsend(Outcome::Success(data))
    }
}

impl<T> From<Outcome<T>> for Jsend<T> {
    fn from(outcome: Outcome<T>) -> Self {
        Jsend(outcome)
    }
}

impl<T: Serialize> IntoResponse for Jsend<T> {
    fn into_response(self) -> Response {
        let envelope = match self.0 {
            Outcome::Success(data) => Envelope::Success(data),
            Outcome::Fail(errors) => Envelope::Fail(errors),
        };
        Json(envelope).into_response()
    }
}
