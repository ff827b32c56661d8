//! Input validation helpers
//!
//! Centralized text length constants and validation functions.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};

// ── Text length limits ──────────────────────────────────────────────

/// Person and medicine names
pub const MAX_NAME_LEN: usize = 200;

/// Notes, descriptions, reasons (rejection, cancellation, return)
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone, ids, idempotency keys
pub const MAX_SHORT_TEXT_LEN: usize = 128;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Passwords (before hashing)
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// URLs (prescription documents)
pub const MAX_URL_LEN: usize = 2048;

/// Delivery addresses
pub const MAX_ADDRESS_LEN: usize = 500;

/// Line items per order
pub const MAX_ORDER_ITEMS: usize = 100;

// ── Money ───────────────────────────────────────────────────────────

/// Decimal places of stored amounts (`NUMERIC(12, 2)`)
pub const MONEY_SCALE: u32 = 2;

/// Largest storable amount: 9,999,999,999.99
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, MONEY_SCALE);

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::required(field));
    }
    if value.len() > max_len {
        return Err(too_long(field, value.len(), max_len));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(too_long(field, v.len(), max_len));
    }
    Ok(())
}

/// Trimmed value of an optional string, `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Minimal shape check: one `@` with text on both sides and a dot in the domain.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    validate_required_text(email, "email", MAX_EMAIL_LEN)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::validation("email is not a valid address").with_detail("field", "email"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooShort));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(too_long("password", password.len(), MAX_PASSWORD_LEN));
    }
    Ok(())
}

/// Non-negative, at most two decimal places, within the stored column range.
///
/// Trailing zeros do not count towards the scale (`20.500` is accepted).
pub fn validate_money(value: Decimal, field: &str) -> Result<(), AppError> {
    let out_of_range = |reason: &str| {
        AppError::with_message(ErrorCode::ValueOutOfRange, format!("{field} {reason}"))
            .with_detail("field", field)
            .with_detail("value", value.to_string())
    };

    if value < Decimal::ZERO {
        return Err(out_of_range("must not be negative"));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(out_of_range("has more than 2 decimal places"));
    }
    if value > MAX_MONEY {
        return Err(out_of_range("exceeds 9999999999.99"));
    }
    Ok(())
}

fn too_long(field: &str, len: usize, max_len: usize) -> AppError {
    AppError::with_message(
        ErrorCode::ValueOutOfRange,
        format!("{field} is too long ({len} chars, max {max_len})"),
    )
    .with_detail("field", field)
}
