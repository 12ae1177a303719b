//! Decoders for semi-structured store replies.
//!
//! - `debug_object`: the `DEBUG OBJECT` status line
//! - `slowlog`: the nested `SLOWLOG GET` array reply

mod debug_object;
mod slowlog;

use thiserror::Error;

pub use debug_object::{DebugObjectResult, parse_debug_object};
pub use slowlog::parse_slowlog;

/// Malformed reply text or shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Fewer than the two leading header tokens.
    #[error("missing header in {0:?}")]
    MissingHeader(String),
    #[error("field without ':' separator: {token:?}")]
    MissingSeparator { token: String },
    #[error("field with more than one ':' separator: {token:?}")]
    MalformedField { token: String },
    #[error("field {field} is not an integer: {value:?}")]
    InvalidInteger { field: String, value: String },
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Loose integer coercion: empty text is zero, `0x`/`0o`/`0b` prefixes pick the radix.
pub(crate) fn weak_u64(field: &str, value: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::InvalidInteger {
        field: field.to_string(),
        value: value.to_string(),
    };

    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty() {
        return if value.is_empty() { Ok(0) } else { Err(invalid()) };
    }

    let (radix, body) = match digits.get(..2) {
        Some("0x") | Some("0X") => (16, &digits[2..]),
        Some("0o") | Some("0O") => (8, &digits[2..]),
        Some("0b") | Some("0B") => (2, &digits[2..]),
        _ => (10, digits),
    };
    u64::from_str_radix(body, radix).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_u64() {
        assert_eq!(weak_u64("n", "42"), Ok(42));
        assert_eq!(weak_u64("n", "+7"), Ok(7));
        assert_eq!(weak_u64("n", ""), Ok(0));
        assert_eq!(weak_u64("n", "0x1f"), Ok(31));
        assert_eq!(weak_u64("n", "0b101"), Ok(5));
        assert!(weak_u64("n", "-1").is_err());
        assert!(weak_u64("n", "3.00").is_err());
        assert!(weak_u64("n", "+").is_err());
        assert!(weak_u64("n", "0x").is_err());
    }
}
