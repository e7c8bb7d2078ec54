//! Parsing utilities for persisted metadata strings
//!
//! Pure parsing functions with no I/O dependencies.

/// Parse an encoding-version tag
///
/// The tag must be a non-empty run of ASCII digits; signs, whitespace and
/// fractional parts are rejected. Values too large for `u64` saturate, since
/// they are still well-formed integers from the future.
pub fn parse_encoding_version(value: &str) -> Option<u64> {
    if value.is_empty() {
        return None;
    }

    let mut result: u64 = 0;
    for byte in value.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        let digit = u64::from(byte - b'0');
        result = result
            .checked_mul(10)
            .and_then(|r| r.checked_add(digit))
            .unwrap_or(u64::MAX);
    }

    Some(result)
}
