//! Delivery handoff code

/// Number of digits in a delivery OTP
pub const OTP_DIGITS: usize = 4;

/// Strip every non-digit character and require exactly [`OTP_DIGITS`] digits.
///
/// The code is recorded, not verified against an issued value.
/// On failure returns the number of digits found.
pub fn normalize_otp(raw: &str) -> Result<String, usize> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == OTP_DIGITS {
        Ok(digits)
    } else {
        Err(digits.len())
    }
}
