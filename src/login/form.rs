//! Login form schema and client-side validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const INVALID_EMAIL: &str = "Invalid email address";
pub const PASSWORD_REQUIRED: &str = "Password is required";

// Local part: word characters plus `'+-.`, not ending in `.` or `'`.
// Domain: dot-separated labels not starting with `-`, alphabetic TLD of 2+.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
        .unwrap_or_else(|e| panic!("email pattern is valid: {e}"))
});

/// Raw values as typed into the form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Validated credentials, serialised as the login request body.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-field messages rendered inline under each input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }

    /// Checks every field; all failures are reported together.
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let errors = FieldErrors {
            email: (!is_valid_email(&self.email)).then_some(INVALID_EMAIL),
            password: self.password.is_empty().then_some(PASSWORD_REQUIRED),
        };

        if errors.is_empty() {
            Ok(Credentials { email: self.email.clone(), password: self.password.clone() })
        } else {
            Err(errors)
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL.is_match(email)
}
