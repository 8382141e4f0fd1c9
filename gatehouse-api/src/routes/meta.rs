/// Site-level endpoints
///
/// - `POST /mail` - Contact form; open to everyone

use axum::extract::State;
use gatehouse_shared::validation::ContactForm;

use crate::{
    app::AppState,
    envelope::Jsend,
    error::ApiResult,
    extract::JsonForm,
};

/// Forward a contact message to the admins
///
/// # Endpoint
///
/// ```text
/// POST /mail
/// Content-Type: application/json
///
/// {
///   "full_name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "subject": "Hello",
///   "message": "..."
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "status": "success", "data": "Thanks for your message. We'll get back to you shortly." }
/// ```
pub async fn contact(
    State(state): State<AppState>,
    JsonForm(form): JsonForm<ContactForm>,
) -> ApiResult<Jsend<String>> {
    Ok(state.controller.contact(form).await?.into())
}
