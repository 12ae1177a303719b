//! `SLOWLOG GET` reply decoder.
//!
//! Each entry is an array:
//! `[id, unix-seconds, duration-micros, [arg, ...], client-addr, client-name]`.
//! The trailing client fields are missing on servers older than 4.0.

use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::Value;

use super::ParseError;
use crate::model::SlowLogEntry;

/// Decodes a full `SLOWLOG GET` reply, keeping the server's order.
pub fn parse_slowlog(reply: &Value) -> Result<Vec<SlowLogEntry>, ParseError> {
    let Value::Array(items) = reply else {
        return Err(unexpected("slowlog reply", reply));
    };
    items.iter().map(parse_entry).collect()
}

fn parse_entry(item: &Value) -> Result<SlowLogEntry, ParseError> {
    let Value::Array(fields) = item else {
        return Err(unexpected("slowlog entry", item));
    };
    if fields.len() < 4 {
        return Err(ParseError::UnexpectedReply(format!(
            "slowlog entry with {} fields",
            fields.len()
        )));
    }

    let id = non_negative("id", &fields[0])?;
    let secs = non_negative("timestamp", &fields[1])?;
    let micros = non_negative("duration", &fields[2])?;

    let Value::Array(raw_args) = &fields[3] else {
        return Err(unexpected("slowlog args", &fields[3]));
    };
    let args = raw_args
        .iter()
        .map(|arg| text("arg", arg))
        .collect::<Result<Vec<_>, _>>()?;

    let client_addr = fields.get(4).map(|v| text("client addr", v)).transpose()?;
    let client_name = fields.get(5).map(|v| text("client name", v)).transpose()?;

    let time = i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .ok_or_else(|| ParseError::InvalidInteger {
            field: "timestamp".to_string(),
            value: secs.to_string(),
        })?;

    Ok(SlowLogEntry {
        id,
        time,
        duration: Duration::from_micros(micros),
        args,
        client_addr: client_addr.unwrap_or_default(),
        client_name: client_name.unwrap_or_default(),
    })
}

fn non_negative(field: &str, value: &Value) -> Result<u64, ParseError> {
    match value {
        Value::Int(n) => u64::try_from(*n).map_err(|_| ParseError::InvalidInteger {
            field: field.to_string(),
            value: n.to_string(),
        }),
        other => Err(unexpected(field, other)),
    }
}

fn text(field: &str, value: &Value) -> Result<String, ParseError> {
    match value {
        Value::BulkString(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Ok(s.clone()),
        Value::Nil => Ok(String::new()),
        other => Err(unexpected(field, other)),
    }
}

fn unexpected(what: &str, value: &Value) -> ParseError {
    ParseError::UnexpectedReply(format!("{}: {:?}", what, value))
}
