//! `MockStore` implementation.

use crate::cancel::CancelToken;
use crate::client::{Command, Reply, ScanPage, ScanRequest, StoreClient};
use crate::error::DoctorError;
use crate::fmt::format_key;
use crate::model::{KeyType, SlowLogEntry};

/// A key in the mock keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockKey {
    /// Raw key name; need not be valid UTF-8.
    pub name: Vec<u8>,
    /// `TYPE` reply; may name types the engine does not support (e.g. `stream`).
    pub type_name: String,
    pub encoding: String,
    pub serialized_length: u64,
    /// Value returned by the element count command matching `type_name`.
    pub cardinality: u64,
    /// LFU counter returned by `OBJECT FREQ`.
    pub frequency: u64,
    /// Replaces the generated `DEBUG OBJECT` reply.
    pub debug_reply: Option<String>,
    /// Set once the key expired; it is then invisible to every command.
    pub expired: bool,
}

impl MockKey {
    pub fn new(
        name: impl Into<Vec<u8>>,
        key_type: KeyType,
        cardinality: u64,
        serialized_length: u64,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: key_type.as_str().to_string(),
            encoding: default_encoding(key_type).to_string(),
            serialized_length,
            cardinality,
            frequency: 0,
            debug_reply: None,
            expired: false,
        }
    }

    /// A string key; its cardinality is its byte length.
    pub fn string(name: impl Into<Vec<u8>>, len: u64) -> Self {
        Self::new(name, KeyType::String, len, len)
    }

    /// A key of a type the engine cannot measure.
    pub fn unsupported(name: impl Into<Vec<u8>>, type_name: &str) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.to_string(),
            encoding: "stream".to_string(),
            serialized_length: 0,
            cardinality: 0,
            frequency: 0,
            debug_reply: None,
            expired: false,
        }
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = encoding.to_string();
        self
    }

    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_debug_reply(mut self, reply: &str) -> Self {
        self.debug_reply = Some(reply.to_string());
        self
    }
}

fn default_encoding(key_type: KeyType) -> &'static str {
    match key_type {
        KeyType::String => "raw",
        KeyType::List => "quicklist",
        KeyType::Hash | KeyType::Set => "hashtable",
        KeyType::ZSet => "skiplist",
    }
}

/// Injected failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The connection drops on the `at`-th `SCAN` call (0-based).
    ScanDisconnect { at: usize },
    /// Any pipeline containing `command` fails with an error reply.
    CommandError {
        command: &'static str,
        message: String,
    },
    /// The connection drops on `SLOWLOG GET`.
    SlowLogDisconnect,
    /// The key expires right after a `SCAN` page returned it.
    ExpireAfterScan { key: Vec<u8> },
}

/// Journal entry for one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTrip {
    Scan {
        cursor: u64,
        count: usize,
        key_type: Option<KeyType>,
    },
    /// Rendered commands, e.g. `"SCARD tags:1"`.
    Pipeline(Vec<String>),
    SlowLog(usize),
}

#[derive(Debug, Clone, Default)]
pub struct MockStore {
    keys: Vec<MockKey>,
    /// Newest first, like the server keeps it.
    slowlog: Vec<SlowLogEntry>,
    lfu_policy: bool,
    faults: Vec<Fault>,
    cancel_after: Option<(usize, CancelToken)>,
    journal: Vec<RoundTrip>,
    scans: usize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key; `SCAN` visits keys in insertion order.
    pub fn add_key(&mut self, key: MockKey) {
        self.keys.push(key);
    }

    /// Appends an entry at the old end of the slow log.
    pub fn add_slowlog(&mut self, entry: SlowLogEntry) {
        self.slowlog.push(entry);
    }

    /// Enables `OBJECT FREQ` (an LFU `maxmemory-policy` on a real server).
    pub fn set_lfu_policy(&mut self, enabled: bool) {
        self.lfu_policy = enabled;
    }

    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Cancels `token` once `round_trips` calls have been served.
    pub fn cancel_after(&mut self, round_trips: usize, token: CancelToken) {
        self.cancel_after = Some((round_trips, token));
    }

    pub fn keys(&self) -> &[MockKey] {
        &self.keys
    }

    pub fn round_trips(&self) -> &[RoundTrip] {
        &self.journal
    }

    /// Only the pipelined round trips, in order.
    pub fn pipelines(&self) -> Vec<&[String]> {
        self.journal
            .iter()
            .filter_map(|trip| match trip {
                RoundTrip::Pipeline(cmds) => Some(cmds.as_slice()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, trip: RoundTrip) {
        self.journal.push(trip);
        if let Some((limit, token)) = &self.cancel_after {
            if self.journal.len() >= *limit {
                token.cancel();
            }
        }
    }

    fn find(&self, name: &[u8]) -> Option<(usize, &MockKey)> {
        self.keys
            .iter()
            .enumerate()
            .find(|(_, k)| !k.expired && k.name == name)
    }

    fn reply(&self, command: &Command<'_>) -> Result<Reply, DoctorError> {
        let found = self.find(command.key());
        match command {
            Command::Type(_) => Ok(Reply::Status(
                found.map_or_else(|| "none".to_string(), |(_, k)| k.type_name.clone()),
            )),
            Command::StrLen(_)
            | Command::LLen(_)
            | Command::HLen(_)
            | Command::SCard(_)
            | Command::ZCard(_) => {
                let Some((_, key)) = found else {
                    return Ok(Reply::Integer(0));
                };
                if key.type_name != counted_type(command) {
                    return Err(DoctorError::Command(
                        "WRONGTYPE Operation against a key holding the wrong kind of value"
                            .to_string(),
                    ));
                }
                Ok(Reply::Integer(key.cardinality as i64))
            }
            Command::DebugObject(_) => {
                let Some((idx, key)) = found else {
                    return Err(DoctorError::Command("ERR no such key".to_string()));
                };
                Ok(Reply::Status(key.debug_reply.clone().unwrap_or_else(|| {
                    format!(
                        "Value at:0x7f3a{:08x} refcount:1 encoding:{} serializedlength:{} lru:1904357 lru_seconds_idle:6",
                        idx, key.encoding, key.serialized_length
                    )
                })))
            }
            Command::ObjectFreq(_) => {
                if !self.lfu_policy {
                    return Err(DoctorError::Command(
                        "ERR An LFU maxmemory policy is not selected, access frequency not tracked."
                            .to_string(),
                    ));
                }
                match found {
                    Some((_, key)) => Ok(Reply::Integer(key.frequency as i64)),
                    None => Err(DoctorError::Command("ERR no such key".to_string())),
                }
            }
        }
    }
}

/// Type a cardinality command applies to.
fn counted_type(command: &Command<'_>) -> &'static str {
    match command {
        Command::StrLen(_) => "string",
        Command::LLen(_) => "list",
        Command::HLen(_) => "hash",
        Command::SCard(_) => "set",
        Command::ZCard(_) => "zset",
        _ => "",
    }
}

fn render(command: &Command<'_>) -> String {
    let key = format_key(command.key());
    match command.words() {
        (name, Some(sub)) => format!("{} {} {}", name, sub, key),
        (name, None) => format!("{} {}", name, key),
    }
}

impl StoreClient for MockStore {
    fn scan(&mut self, ctx: &CancelToken, req: &ScanRequest<'_>) -> Result<ScanPage, DoctorError> {
        ctx.check()?;
        self.record(RoundTrip::Scan {
            cursor: req.cursor,
            count: req.count,
            key_type: req.key_type,
        });

        let call = self.scans;
        self.scans += 1;
        if self
            .faults
            .iter()
            .any(|f| matches!(f, Fault::ScanDisconnect { at } if *at == call))
        {
            return Err(DoctorError::Connection(
                "connection reset by peer".to_string(),
            ));
        }

        // The cursor is an offset into the keyspace; COUNT bounds how many
        // slots one call inspects, so pages can be empty before the end.
        let len = self.keys.len();
        let start = usize::try_from(req.cursor).unwrap_or(len).min(len);
        let end = start.saturating_add(req.count.max(1)).min(len);
        let keys: Vec<Vec<u8>> = self.keys[start..end]
            .iter()
            .filter(|k| !k.expired)
            .filter(|k| glob_match(req.pattern, &k.name))
            .filter(|k| req.key_type.is_none_or(|t| k.type_name == t.as_str()))
            .map(|k| k.name.clone())
            .collect();
        let cursor = if end >= len { 0 } else { end as u64 };

        for fault in &self.faults {
            if let Fault::ExpireAfterScan { key } = fault {
                if keys.contains(key) {
                    for k in self.keys.iter_mut().filter(|k| &k.name == key) {
                        k.expired = true;
                    }
                }
            }
        }

        Ok(ScanPage { cursor, keys })
    }

    fn pipeline(
        &mut self,
        ctx: &CancelToken,
        commands: &[Command<'_>],
    ) -> Result<Vec<Reply>, DoctorError> {
        ctx.check()?;
        self.record(RoundTrip::Pipeline(commands.iter().map(render).collect()));

        for fault in &self.faults {
            if let Fault::CommandError { command, message } = fault {
                if commands.iter().any(|c| c.words().0 == *command) {
                    return Err(DoctorError::Command(message.clone()));
                }
            }
        }

        commands.iter().map(|c| self.reply(c)).collect()
    }

    fn slowlog(
        &mut self,
        ctx: &CancelToken,
        count: usize,
    ) -> Result<Vec<SlowLogEntry>, DoctorError> {
        ctx.check()?;
        self.record(RoundTrip::SlowLog(count));
        if self.faults.contains(&Fault::SlowLogDisconnect) {
            return Err(DoctorError::Connection(
                "connection reset by peer".to_string(),
            ));
        }
        Ok(self.slowlog.iter().take(count).cloned().collect())
    }
}

/// Glob matching with the server's `MATCH` rules: `*`, `?`, `[a-z]`,
/// `[^abc]` and `\` escapes. Works byte-wise, like the server.
pub fn glob_match(pattern: &str, text: impl AsRef<[u8]>) -> bool {
    glob(pattern.as_bytes(), text.as_ref())
}

fn glob(p: &[u8], s: &[u8]) -> bool {
    match p.first() {
        None => s.is_empty(),
        Some(b'*') => {
            let rest = &p[1..];
            (0..=s.len()).any(|i| glob(rest, &s[i..]))
        }
        Some(b'?') => !s.is_empty() && glob(&p[1..], &s[1..]),
        Some(b'[') => {
            let Some(&c) = s.first() else {
                return false;
            };
            match char_class(&p[1..], c) {
                Some((matched, rest)) => matched && glob(rest, &s[1..]),
                // Unterminated class: treat '[' literally.
                None => c == b'[' && glob(&p[1..], &s[1..]),
            }
        }
        Some(b'\\') if p.len() > 1 => s.first() == Some(&p[1]) && glob(&p[2..], &s[1..]),
        Some(&c) => s.first() == Some(&c) && glob(&p[1..], &s[1..]),
    }
}

/// Matches `c` against a class body (after `[`). Returns the match result
/// and the pattern past the closing `]`, or `None` if the class never closes.
fn char_class(p: &[u8], c: u8) -> Option<(bool, &[u8])> {
    let (negate, mut i) = if p.first() == Some(&b'^') {
        (true, 1)
    } else {
        (false, 0)
    };
    let mut matched = false;
    loop {
        match p.get(i) {
            None => return None,
            Some(b']') => break,
            Some(b'\\') => {
                let &escaped = p.get(i + 1)?;
                matched |= escaped == c;
                i += 2;
            }
            Some(&lo) => match (p.get(i + 1), p.get(i + 2)) {
                (Some(b'-'), Some(&hi)) if hi != b']' => {
                    let (a, b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                    matched |= a <= c && c <= b;
                    i += 3;
                }
                _ => {
                    matched |= lo == c;
                    i += 1;
                }
            },
        }
    }
    Some((matched != negate, &p[i + 1..]))
}
