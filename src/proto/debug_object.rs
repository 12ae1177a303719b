//! `DEBUG OBJECT` reply parser.
//!
//! Example reply:
//! `Value at:0x60000377c070 refcount:1 encoding:listpack serializedlength:26 lru:1904357 lru_seconds_idle:6`

use super::{ParseError, weak_u64};

/// Fields of interest from a `DEBUG OBJECT` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugObjectResult {
    pub refcount: u64,
    pub encoding: String,
    pub serialized_length: u64,
    pub lru: u64,
    pub lru_seconds_idle: u64,
}

/// Parses a `DEBUG OBJECT` reply.
///
/// The first two whitespace separated tokens (`Value at:<addr>`) are skipped.
/// Every remaining token must be `name:value`; names other than the five
/// known ones are ignored.
pub fn parse_debug_object(raw: &str) -> Result<DebugObjectResult, ParseError> {
    let mut tokens = raw.split_whitespace();
    if tokens.next().is_none() || tokens.next().is_none() {
        return Err(ParseError::MissingHeader(raw.to_string()));
    }

    let mut result = DebugObjectResult::default();
    for token in tokens {
        let Some((name, value)) = token.split_once(':') else {
            return Err(ParseError::MissingSeparator {
                token: token.to_string(),
            });
        };
        if value.contains(':') {
            return Err(ParseError::MalformedField {
                token: token.to_string(),
            });
        }

        match name {
            "refcount" => result.refcount = weak_u64(name, value)?,
            "encoding" => result.encoding = value.to_string(),
            "serializedlength" => result.serialized_length = weak_u64(name, value)?,
            "lru" => result.lru = weak_u64(name, value)?,
            "lru_seconds_idle" => result.lru_seconds_idle = weak_u64(name, value)?,
            _ => {}
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_debug_object() {
        let raw = "Value at:0x60000377c070 refcount:1 encoding:listpack serializedlength:26 lru:1904357 lru_seconds_idle:6";
        let result = parse_debug_object(raw).unwrap();
        assert_eq!(result.refcount, 1);
        assert_eq!(result.encoding, "listpack");
        assert_eq!(result.serialized_length, 26);
        assert_eq!(result.lru, 1904357);
        assert_eq!(result.lru_seconds_idle, 6);
    }

    #[test]
    fn test_parse_debug_object_ignores_unknown_fields() {
        let raw = "Value at:0x7f1c2a0 refcount:1 encoding:quicklist serializedlength:19 lru:9 lru_seconds_idle:2 ql_nodes:1 ql_avg_node:3.00 ql_listpack_max:-2\n";
        let result = parse_debug_object(raw).unwrap();
        assert_eq!(result.encoding, "quicklist");
        assert_eq!(result.serialized_length, 19);
        assert_eq!(result.lru_seconds_idle, 2);
    }

    #[test]
    fn test_parse_debug_object_missing_fields_default() {
        let result = parse_debug_object("Value at:0x1 encoding:int").unwrap();
        assert_eq!(result.encoding, "int");
        assert_eq!(result.refcount, 0);
        assert_eq!(result.serialized_length, 0);
    }

    #[test]
    fn test_parse_debug_object_token_without_colon() {
        let err = parse_debug_object("Value at:0x1 refcount:1 garbage").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingSeparator {
                token: "garbage".to_string()
            }
        );
    }

    #[test]
    fn test_parse_debug_object_extra_colon() {
        let err = parse_debug_object("Value at:0x1 encoding:a:b").unwrap_err();
        assert!(matches!(err, ParseError::MalformedField { .. }));
    }

    #[test]
    fn test_parse_debug_object_non_numeric() {
        let err = parse_debug_object("Value at:0x1 serializedlength:many").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidInteger {
                field: "serializedlength".to_string(),
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn test_parse_debug_object_missing_header() {
        assert!(matches!(
            parse_debug_object("Value"),
            Err(ParseError::MissingHeader(_))
        ));
        assert!(matches!(
            parse_debug_object(""),
            Err(ParseError::MissingHeader(_))
        ));
    }
}
