//! Field rules shared by the input types, plus rendering of
//! [`ValidationErrors`] into a single human-readable message.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Remove all whitespace from a submitted phone number.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Exactly ten ASCII digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("phone", "Phone must be exactly 10 digits"))
    }
}

/// Six ASCII digits.
pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("otp", "OTP must be a 6-digit number"))
    }
}

/// At least one lowercase letter, one uppercase letter and one digit.
/// Length is checked separately against the configured minimum.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if lower && upper && digit {
        Ok(())
    } else {
        Err(invalid(
            "password",
            "Password must contain at least one lowercase letter, one uppercase letter, and one number",
        ))
    }
}

pub fn validate_not_future(date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *date <= Utc::now() {
        Ok(())
    } else {
        Err(invalid("dob", "Date of birth cannot be in the future"))
    }
}

/// Flatten nested validation errors into `"msg; msg"` with a stable
/// ordering.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect(errors, "", &mut messages);
    messages.sort();
    messages.dedup();
    if messages.is_empty() {
        errors.to_string()
    } else {
        messages.join("; ")
    }
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    out.push(match &err.message {
                        Some(message) => message.to_string(),
                        None => format!("{path} is invalid"),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
