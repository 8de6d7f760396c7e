//! Input checks that block a write before it reaches the backend.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{InvoiceError, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InvoiceError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

/// `local@domain.tld` with the character classes sign-up forms usually allow.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern compiles")
});

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn email(value: &str) -> Result<&str> {
    let value = required("Email", value)?;
    if !is_email(value) {
        return Err(InvoiceError::Validation("Invalid email address".to_string()));
    }
    Ok(value)
}

/// Optional contact email: blank passes, anything else must look like an address.
pub fn optional_email(value: &str) -> Result<&str> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(value);
    }
    email(value)
}

pub fn password(value: &str) -> Result<&str> {
    if value.is_empty() {
        return Err(InvoiceError::Validation("Password is required".to_string()));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(InvoiceError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(value)
}
