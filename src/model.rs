//! Diagnostic records handed to the output visitors.
//!
//! Records are built per matching key (or per slow-log entry), handed to a
//! [`Visitor`] once and dropped.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::error::DoctorError;
use crate::output::Visitor;

/// Data types whose size the engine knows how to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    String,
    List,
    Hash,
    Set,
    ZSet,
}

impl KeyType {
    /// Name used by `TYPE` replies and the `SCAN ... TYPE` filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::String => "string",
            KeyType::List => "list",
            KeyType::Hash => "hash",
            KeyType::Set => "set",
            KeyType::ZSet => "zset",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = DoctorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(KeyType::String),
            "list" => Ok(KeyType::List),
            "hash" => Ok(KeyType::Hash),
            "set" => Ok(KeyType::Set),
            "zset" => Ok(KeyType::ZSet),
            other => Err(DoctorError::UnsupportedType(other.to_string())),
        }
    }
}

/// A key whose serialized length or element count crossed a threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BigKey {
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub encoding: String,
    #[serde(rename = "serializedlength")]
    pub serialized_length: u64,
    /// Number of elements: STRLEN, LLEN, HLEN, SCARD or ZCARD depending on type.
    pub cardinality: u64,
}

/// A key with a high LFU access counter.
///
/// `OBJECT FREQ` works on every data type, so the type is the raw `TYPE`
/// reply (`stream` included) rather than a [`KeyType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotKey {
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub frequency: u64,
}

/// One entry of the store's slow log, as reported by `SLOWLOG GET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlowLogEntry {
    #[serde(skip_serializing_if = "is_zero")]
    pub id: u64,
    #[serde(serialize_with = "serialize_local_time")]
    pub time: DateTime<Utc>,
    #[serde(
        skip_serializing_if = "Duration::is_zero",
        serialize_with = "serialize_nanos"
    )]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(rename = "clientAddr", skip_serializing_if = "String::is_empty")]
    pub client_addr: String,
    #[serde(rename = "clientName", skip_serializing_if = "String::is_empty")]
    pub client_name: String,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn serialize_local_time<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&local_rfc3339(ts))
}

fn serialize_nanos<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

/// RFC 3339 rendering in the local timezone, shared by JSON and XML output.
pub(crate) fn local_rfc3339(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Closed set of records a diagnosis run can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    BigKey(BigKey),
    HotKey(HotKey),
    SlowLog(SlowLogEntry),
}

impl Entry {
    /// Dispatch to the visitor method for this record kind.
    pub fn accept(&self, visitor: &mut dyn Visitor) -> io::Result<()> {
        match self {
            Entry::BigKey(key) => visitor.visit_big_key(key),
            Entry::HotKey(key) => visitor.visit_hot_key(key),
            Entry::SlowLog(entry) => visitor.visit_slow_log(entry),
        }
    }

    /// Record kind name, also the XML element name.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::BigKey(_) => "bigkey",
            Entry::HotKey(_) => "hotkey",
            Entry::SlowLog(_) => "slowlog",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_round_trip_names() {
        for t in [
            KeyType::String,
            KeyType::List,
            KeyType::Hash,
            KeyType::Set,
            KeyType::ZSet,
        ] {
            assert_eq!(t.as_str().parse::<KeyType>().unwrap(), t);
        }
    }

    #[test]
    fn test_key_type_rejects_unknown() {
        let err = "stream".parse::<KeyType>().unwrap_err();
        assert!(matches!(err, DoctorError::UnsupportedType(ref t) if t == "stream"));
        assert!("none".parse::<KeyType>().is_err());
    }

    #[test]
    fn test_big_key_json_field_names() {
        let key = BigKey {
            key: "user:1".to_string(),
            key_type: KeyType::ZSet,
            encoding: "skiplist".to_string(),
            serialized_length: 4096,
            cardinality: 300,
        };
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(
            json,
            r#"{"key":"user:1","type":"zset","encoding":"skiplist","serializedlength":4096,"cardinality":300}"#
        );
    }

    #[test]
    fn test_slow_log_json_omits_empty_fields() {
        let entry = SlowLogEntry {
            id: 0,
            time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            duration: Duration::ZERO,
            args: Vec::new(),
            client_addr: String::new(),
            client_name: String::new(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("time"));
    }

    #[test]
    fn test_slow_log_json_duration_in_nanos() {
        let entry = SlowLogEntry {
            id: 7,
            time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            duration: Duration::from_micros(1500),
            args: vec!["KEYS".to_string(), "*".to_string()],
            client_addr: "10.0.0.1:51234".to_string(),
            client_name: "worker".to_string(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["duration"], 1_500_000);
        assert_eq!(value["args"][1], "*");
        assert_eq!(value["clientAddr"], "10.0.0.1:51234");
        assert_eq!(value["clientName"], "worker");
        let time = value["time"].as_str().unwrap();
        assert_eq!(
            DateTime::parse_from_rfc3339(time).unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_entry_kind() {
        let hot = Entry::HotKey(HotKey {
            key: "k".to_string(),
            key_type: "string".to_string(),
            frequency: 3,
        });
        assert_eq!(hot.kind(), "hotkey");
    }
}
