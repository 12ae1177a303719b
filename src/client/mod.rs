//! Store client abstraction.
//!
//! The diagnosis engine only needs three primitives from the server: a
//! cursor based keyspace scan, pipelined execution of a fixed set of
//! commands, and slow log retrieval. [`StoreClient`] captures exactly those
//! so the engine runs against a live server ([`RedisClient`]) or an
//! in-memory keyspace ([`MockStore`]) unchanged.

pub mod mock;
mod redis_client;

use crate::cancel::CancelToken;
use crate::error::DoctorError;
use crate::model::{KeyType, SlowLogEntry};

pub use mock::MockStore;
pub use redis_client::RedisClient;

/// One `SCAN` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest<'a> {
    /// Cursor returned by the previous call, `0` to start.
    pub cursor: u64,
    pub pattern: &'a str,
    /// `COUNT` hint; the server may return more or fewer keys.
    pub count: usize,
    pub key_type: Option<KeyType>,
}

/// Result of one `SCAN` call. A `cursor` of `0` means the scan is complete.
///
/// Keys are binary safe and kept as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<Vec<u8>>,
}

/// Commands the engine sends in pipelines, each on one raw key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Type(&'a [u8]),
    StrLen(&'a [u8]),
    LLen(&'a [u8]),
    HLen(&'a [u8]),
    SCard(&'a [u8]),
    ZCard(&'a [u8]),
    DebugObject(&'a [u8]),
    ObjectFreq(&'a [u8]),
}

impl<'a> Command<'a> {
    /// Element count command for a key of the given type.
    pub fn cardinality(key_type: KeyType, key: &'a [u8]) -> Self {
        match key_type {
            KeyType::String => Command::StrLen(key),
            KeyType::List => Command::LLen(key),
            KeyType::Hash => Command::HLen(key),
            KeyType::Set => Command::SCard(key),
            KeyType::ZSet => Command::ZCard(key),
        }
    }

    pub fn key(&self) -> &'a [u8] {
        match *self {
            Command::Type(k)
            | Command::StrLen(k)
            | Command::LLen(k)
            | Command::HLen(k)
            | Command::SCard(k)
            | Command::ZCard(k)
            | Command::DebugObject(k)
            | Command::ObjectFreq(k) => k,
        }
    }

    /// Command name and optional subcommand preceding the key.
    pub fn words(&self) -> (&'static str, Option<&'static str>) {
        match self {
            Command::Type(_) => ("TYPE", None),
            Command::StrLen(_) => ("STRLEN", None),
            Command::LLen(_) => ("LLEN", None),
            Command::HLen(_) => ("HLEN", None),
            Command::SCard(_) => ("SCARD", None),
            Command::ZCard(_) => ("ZCARD", None),
            Command::DebugObject(_) => ("DEBUG", Some("OBJECT")),
            Command::ObjectFreq(_) => ("OBJECT", Some("FREQ")),
        }
    }
}

/// Reply to a pipelined command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Integer(i64),
}

impl Reply {
    pub fn into_status(self) -> Result<String, DoctorError> {
        match self {
            Reply::Status(s) => Ok(s),
            Reply::Integer(n) => Err(DoctorError::Protocol(format!(
                "expected status reply, got integer {}",
                n
            ))),
        }
    }

    pub fn into_count(self) -> Result<u64, DoctorError> {
        match self {
            Reply::Integer(n) => u64::try_from(n)
                .map_err(|_| DoctorError::Protocol(format!("negative count {}", n))),
            Reply::Status(s) => Err(DoctorError::Protocol(format!(
                "expected integer reply, got {:?}",
                s
            ))),
        }
    }
}

/// Primitives the diagnosis engine consumes from the store.
///
/// Every method is one network round trip and must honour `ctx` before
/// (and, where the transport allows, during) the call.
pub trait StoreClient {
    fn scan(&mut self, ctx: &CancelToken, req: &ScanRequest<'_>) -> Result<ScanPage, DoctorError>;

    /// Sends all commands in one round trip.
    ///
    /// Replies come back in request order, one per command. The first error
    /// reply fails the whole pipeline.
    fn pipeline(
        &mut self,
        ctx: &CancelToken,
        commands: &[Command<'_>],
    ) -> Result<Vec<Reply>, DoctorError>;

    /// Up to `count` most recent slow log entries, in server order.
    fn slowlog(&mut self, ctx: &CancelToken, count: usize)
    -> Result<Vec<SlowLogEntry>, DoctorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_dispatch() {
        let key = b"a".as_slice();
        assert_eq!(Command::cardinality(KeyType::String, key), Command::StrLen(key));
        assert_eq!(Command::cardinality(KeyType::List, key), Command::LLen(key));
        assert_eq!(Command::cardinality(KeyType::Hash, key), Command::HLen(key));
        assert_eq!(Command::cardinality(KeyType::Set, key), Command::SCard(key));
        assert_eq!(Command::cardinality(KeyType::ZSet, key), Command::ZCard(key));
    }

    #[test]
    fn test_command_words() {
        let cmd = Command::DebugObject(b"user:1");
        assert_eq!(cmd.words(), ("DEBUG", Some("OBJECT")));
        assert_eq!(cmd.key(), b"user:1");
    }

    #[test]
    fn test_reply_conversions() {
        assert_eq!(Reply::Status("hash".into()).into_status().unwrap(), "hash");
        assert_eq!(Reply::Integer(12).into_count().unwrap(), 12);
        assert!(matches!(
            Reply::Integer(-1).into_count(),
            Err(DoctorError::Protocol(_))
        ));
        assert!(Reply::Integer(1).into_status().is_err());
    }
}
