/// Form schemas and per-field error maps
///
/// Every lifecycle operation that takes user input takes one of the forms
/// below. Forms deserialize leniently (missing fields become empty) so that a
/// missing field is reported as a field error rather than a parse failure.
///
/// Validation errors are flattened into [`FieldErrors`], a map from field name
/// to messages:
///
/// ```json
/// { "username": ["This field is required."], "password_again": ["Passwords must match."] }
/// ```
///
/// # Example
///
/// ```
/// use gatehouse_shared::validation::{check, RegisterForm};
///
/// let form = RegisterForm {
///     username: "demo".to_string(),
///     email: "demo@example.com".to_string(),
///     password: "default".to_string(),
///     password_again: "default".to_string(),
/// };
/// assert!(check(&form).is_ok());
///
/// let errors = check(&RegisterForm::default()).unwrap_err();
/// assert_eq!(errors["username"], vec!["This field is required.".to_string()]);
/// ```

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Field name to error messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Builds a single-field error map
pub fn field_error(field: &str, message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message.into()]);
    errors
}

/// Validates a form, returning its field errors on failure
pub fn check<T: Validate>(form: &T) -> Result<(), FieldErrors> {
    form.validate().map_err(|e| collect_errors(&e))
}

/// Flattens validator errors into a field map
///
/// A blank required field reports only "This field is required.", not the
/// length or format errors that follow from it.
pub fn collect_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let required: Vec<_> = errs.iter().filter(|e| e.code == "required").collect();
            let shown = if required.is_empty() {
                errs.iter().collect()
            } else {
                required
            };

            let messages = shown.into_iter().map(message_for).collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn message_for(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("Invalid value ({}).", error.code),
    }
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", "This field is required."));
    }
    Ok(())
}

fn new_password_required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", "New password is required"));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    required(username)?;
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(error(
            "username_chars",
            "Username may only contain letters, numbers and underscores.",
        ));
    }
    Ok(())
}

fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    match gender {
        "male" | "female" => Ok(()),
        _ => Err(error("gender", "Gender must be male or female.")),
    }
}

fn validate_date(date: &str) -> Result<(), ValidationError> {
    parse_date(date)
        .map(|_| ())
        .ok_or_else(|| error("date", "Not a valid date value."))
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// New account
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(
        custom(function = "validate_username"),
        length(min = 4, max = 25, message = "Field must be between 4 and 25 characters long.")
    )]
    pub username: String,

    #[validate(
        custom(function = "required"),
        email(message = "That doesn't look like an email.")
    )]
    pub email: String,

    #[validate(
        custom(function = "required"),
        length(min = 6, max = 16, message = "Field must be between 6 and 16 characters long.")
    )]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords must match."))]
    pub password_again: String,
}

/// Login and re-authentication
///
/// `email` accepts a username or an email address.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[serde(alias = "login", alias = "username")]
    #[validate(custom(function = "required"))]
    pub email: String,

    #[validate(
        custom(function = "required"),
        length(min = 6, max = 16, message = "Field must be between 6 and 16 characters long.")
    )]
    pub password: String,
}

/// New password, for password change and reset confirmation
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ChangePasswordForm {
    #[validate(
        custom(function = "new_password_required"),
        length(min = 6, max = 16, message = "Field must be between 6 and 16 characters long.")
    )]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords don't match."))]
    pub password_again: String,
}

/// Password reset request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RecoverPasswordForm {
    #[validate(
        custom(function = "required"),
        email(message = "That doesn't look like an email.")
    )]
    pub email: String,
}

/// Account activation
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ActivateForm {
    #[validate(custom(function = "required"))]
    pub status: String,
}

/// Contact message for the admins
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactForm {
    #[validate(custom(function = "required"))]
    pub full_name: String,

    #[validate(
        custom(function = "required"),
        email(message = "That doesn't look like an email.")
    )]
    pub email: String,

    #[validate(custom(function = "required"))]
    pub subject: String,

    #[validate(
        custom(function = "required"),
        length(max = 1024, message = "Field cannot be longer than 1024 characters.")
    )]
    pub message: String,
}

/// Identity and profile fields
///
/// Every field is written on update; an omitted optional field clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(
        custom(function = "validate_username"),
        length(min = 4, max = 25, message = "Field must be between 4 and 25 characters long.")
    )]
    pub username: String,

    #[validate(
        custom(function = "required"),
        email(message = "Doesn't look like a valid email.")
    )]
    pub email: String,

    #[validate(length(min = 2, max = 25, message = "Field must be between 2 and 25 characters long."))]
    pub first_name: Option<String>,

    #[validate(length(min = 2, max = 25, message = "Field must be between 2 and 25 characters long."))]
    pub last_name: Option<String>,

    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<String>,

    /// `YYYY-MM-DD`
    #[validate(custom(function = "validate_date"))]
    pub dob: Option<String>,

    #[validate(length(max = 42, message = "Field cannot be longer than 42 characters."))]
    pub phone: Option<String>,

    #[validate(length(max = 1024, message = "Field cannot be longer than 1024 characters."))]
    pub bio: Option<String>,

    #[validate(url(message = "Invalid URL."))]
    pub url: Option<String>,
}

impl ProfileForm {
    /// Trims every field and treats blank optional fields as absent
    pub fn normalized(self) -> Self {
        fn opt(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: opt(self.first_name),
            last_name: opt(self.last_name),
            gender: opt(self.gender),
            dob: opt(self.dob),
            phone: opt(self.phone),
            bio: opt(self.bio),
            url: opt(self.url),
        }
    }

    /// Parsed date of birth; `None` if absent or invalid
    pub fn dob_date(&self) -> Option<NaiveDate> {
        self.dob.as_deref().and_then(parse_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, password: &str, again: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_again: again.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(check(&register("demo", "demo@example.com", "default", "default")).is_ok());
        assert!(check(&register("demo_user_1", "demo@example.com", "default", "default")).is_ok());
    }

    #[test]
    fn test_blank_fields_report_required_only() {
        let errors = check(&RegisterForm::default()).unwrap_err();

        assert_eq!(errors["username"], vec!["This field is required.".to_string()]);
        assert_eq!(errors["email"], vec!["This field is required.".to_string()]);
        assert_eq!(errors["password"], vec!["This field is required.".to_string()]);
        assert!(!errors.contains_key("password_again"));
    }

    #[test]
    fn test_username_rules() {
        let errors = check(&register("abc", "demo@example.com", "default", "default")).unwrap_err();
        assert_eq!(
            errors["username"],
            vec!["Field must be between 4 and 25 characters long.".to_string()]
        );

        let errors = check(&register("bad name!", "demo@example.com", "default", "default")).unwrap_err();
        assert!(errors["username"].contains(
            &"Username may only contain letters, numbers and underscores.".to_string()
        ));

        let long = "a".repeat(26);
        assert!(check(&register(&long, "demo@example.com", "default", "default")).is_err());
    }

    #[test]
    fn test_password_rules() {
        let errors = check(&register("demo", "demo@example.com", "short", "short")).unwrap_err();
        assert!(errors.contains_key("password"));

        let errors = check(&register("demo", "demo@example.com", "default", "defaults")).unwrap_err();
        assert_eq!(errors["password_again"], vec!["Passwords must match.".to_string()]);
        assert!(!errors.contains_key("password"));
    }

    #[test]
    fn test_email_format() {
        let errors = check(&register("demo", "not-an-email", "default", "default")).unwrap_err();
        assert_eq!(errors["email"], vec!["That doesn't look like an email.".to_string()]);

        let errors = check(&RecoverPasswordForm {
            email: "nope".to_string(),
        })
        .unwrap_err();
        assert_eq!(errors["email"], vec!["That doesn't look like an email.".to_string()]);
    }

    #[test]
    fn test_change_password_messages() {
        let errors = check(&ChangePasswordForm::default()).unwrap_err();
        assert_eq!(errors["password"], vec!["New password is required".to_string()]);

        let errors = check(&ChangePasswordForm {
            password: "newpass1".to_string(),
            password_again: "newpass2".to_string(),
        })
        .unwrap_err();
        assert_eq!(errors["password_again"], vec!["Passwords don't match.".to_string()]);
    }

    #[test]
    fn test_login_accepts_username_alias() {
        let form: LoginForm =
            serde_json::from_str(r#"{"username": "demo", "password": "default"}"#).unwrap();
        assert_eq!(form.email, "demo");
        assert!(check(&form).is_ok());

        let form: LoginForm = serde_json::from_str("{}").unwrap();
        let errors = check(&form).unwrap_err();
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn test_profile_rules() {
        let form = ProfileForm {
            username: "demo".to_string(),
            email: "demo@example.com".to_string(),
            first_name: Some("D".to_string()),
            gender: Some("other".to_string()),
            dob: Some("17/01/1985".to_string()),
            phone: Some("1".repeat(43)),
            url: Some("not a url".to_string()),
            ..Default::default()
        };

        let errors = check(&form).unwrap_err();
        for field in ["first_name", "gender", "dob", "phone", "url"] {
            assert!(errors.contains_key(field), "expected error for {}", field);
        }
        assert!(!errors.contains_key("username"));
    }

    #[test]
    fn test_profile_normalization() {
        let form = ProfileForm {
            username: " demo ".to_string(),
            email: "demo@example.com".to_string(),
            first_name: Some("   ".to_string()),
            dob: Some("1985-01-17".to_string()),
            url: Some("https://example.com".to_string()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(form.username, "demo");
        assert_eq!(form.first_name, None);
        assert_eq!(form.dob_date(), NaiveDate::from_ymd_opt(1985, 1, 17));
        assert!(check(&form).is_ok());
    }

    #[test]
    fn test_contact_rules() {
        let form = ContactForm {
            full_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: "Hi".to_string(),
            message: "x".repeat(1025),
        };

        let errors = check(&form).unwrap_err();
        assert_eq!(
            errors["message"],
            vec!["Field cannot be longer than 1024 characters.".to_string()]
        );
    }

    #[test]
    fn test_field_error() {
        let errors = field_error("id", "Sorry, no user found.");
        assert_eq!(errors["id"], vec!["Sorry, no user found.".to_string()]);
    }
}
