/// HTML bodies and subjects for lifecycle mail
///
/// Every interpolated value is HTML-escaped. Confirmation links point at the
/// client application (`domain`), which routes on the URL fragment; the email
/// and key segments are percent-encoded.

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::OutgoingMail;

/// Link that opens the password reset confirmation page
pub fn password_reset_url(domain: &str, email: &str, key: &str) -> String {
    format!(
        "{}/#accounts/password/reset/confirm/{}/{}/",
        domain.trim_end_matches('/'),
        urlencoding::encode(email),
        urlencoding::encode(key)
    )
}

/// Link that opens the reactivation confirmation page
pub fn reactivation_url(domain: &str, email: &str, key: &str) -> String {
    format!(
        "{}/#accounts/reactivate/{}/{}/",
        domain.trim_end_matches('/'),
        urlencoding::encode(email),
        urlencoding::encode(key)
    )
}

/// Link to the login page
pub fn login_url(domain: &str) -> String {
    format!("{}/#sessions/login/", domain.trim_end_matches('/'))
}

fn layout(app_name: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<body style=\"font-family: sans-serif\">\n{}\n\
         <p>Thanks,<br>The {} team</p>\n</body>\n</html>\n",
        content,
        encode_text(app_name)
    )
}

fn link(url: &str) -> String {
    format!(
        "<p><a href=\"{}\">{}</a></p>",
        encode_double_quoted_attribute(url),
        encode_text(url)
    )
}

pub fn password_reset(app_name: &str, to: &str, username: &str, url: &str) -> OutgoingMail {
    let content = format!(
        "<p>Hi {},</p>\n\
         <p>Someone asked to reset the password of your {} account. \
         If it was you, follow the link below to choose a new one.</p>\n{}\n\
         <p>If you didn't ask for this, you can ignore this email.</p>",
        encode_text(username),
        encode_text(app_name),
        link(url)
    );

    OutgoingMail::new(to, "Recover your password", layout(app_name, &content))
}

pub fn reactivation(app_name: &str, to: &str, username: &str, url: &str) -> OutgoingMail {
    let content = format!(
        "<p>Hi {},</p>\n\
         <p>Your {} account is deactivated. Follow the link below to reactivate it.</p>\n{}",
        encode_text(username),
        encode_text(app_name),
        link(url)
    );

    OutgoingMail::new(
        to,
        format!("{} Account Reactivation", app_name),
        layout(app_name, &content),
    )
}

pub fn deactivation_receipt(app_name: &str, to: &str, username: &str, url: &str) -> OutgoingMail {
    let content = format!(
        "<p>Hi {},</p>\n\
         <p>Your {} account is now deactivated. \
         You can reactivate it at any time by signing in again.</p>\n{}",
        encode_text(username),
        encode_text(app_name),
        link(url)
    );

    OutgoingMail::new(
        to,
        format!("Your {} account is now deactivated", app_name),
        layout(app_name, &content),
    )
}

/// Contact form fields as submitted
#[derive(Debug, Clone, Copy)]
pub struct ContactMessage<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
    pub sent_at: &'a str,
}

/// A contact form message addressed to the admins, replying to the visitor
pub fn contact(app_name: &str, admins: &[String], msg: ContactMessage<'_>) -> OutgoingMail {
    let content = format!(
        "<p><strong>From:</strong> {} &lt;{}&gt;</p>\n\
         <p><strong>Date:</strong> {}</p>\n\
         <p><strong>Subject:</strong> {}</p>\n\
         <p>{}</p>",
        encode_text(msg.full_name),
        encode_text(msg.email),
        encode_text(msg.sent_at),
        encode_text(msg.subject),
        encode_text(msg.message).replace('\n', "<br>")
    );

    OutgoingMail {
        to: admins.to_vec(),
        reply_to: Some(msg.email.to_string()),
        subject: format!("[{}] Message from {}: {}", app_name, msg.full_name, msg.subject),
        html_body: layout(app_name, &content),
    }
}
