//! Diagnosis engine.
//!
//! [`Doctor`] walks the keyspace in batches over a [`StoreClient`] and
//! streams matching records to a [`Visitor`]:
//!
//! ```text
//! SCAN ──► batch of keys ──► TYPE* ──► STRLEN/LLEN/HLEN/SCARD/ZCARD ──► DEBUG OBJECT ──► filter ──► visitor
//!                                 └──────────────► OBJECT FREQ ────────────────────────► filter ──► visitor
//! ```
//!
//! Each arrow after `SCAN` is one pipelined round trip. Replies are aligned
//! with the batch by position. Records reach the visitor as soon as they
//! qualify, so an error mid-run leaves the records of earlier batches in
//! the output.
//!
//! Keys travel as raw bytes and become text only in the emitted records.
//! A key deleted between `SCAN` and `TYPE` answers `none`: hotkey skips it,
//! bigkey cannot measure it and fails.

mod filter;
mod scan;

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, trace};

use crate::cancel::CancelToken;
use crate::client::{Command, Reply, StoreClient};
use crate::error::DoctorError;
use crate::fmt::format_key;
use crate::model::{BigKey, Entry, HotKey, KeyType};
use crate::output::Visitor;
use crate::proto::{DebugObjectResult, parse_debug_object};

pub use filter::{is_big_key, is_hot_key};
pub use scan::KeyScanner;

/// What to diagnose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symptom {
    BigKey,
    HotKey,
    SlowLog,
}

impl Symptom {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symptom::BigKey => "bigkey",
            Symptom::HotKey => "hotkey",
            Symptom::SlowLog => "slowlog",
        }
    }
}

impl fmt::Display for Symptom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symptom {
    type Err = DoctorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bigkey" => Ok(Symptom::BigKey),
            "hotkey" => Ok(Symptom::HotKey),
            "slowlog" => Ok(Symptom::SlowLog),
            other => Err(DoctorError::UnknownSymptom(other.to_string())),
        }
    }
}

/// Per-run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnoseOptions {
    /// `SCAN ... MATCH` glob.
    pub pattern: String,
    /// Restricts the scan to one type and skips the `TYPE` round trip.
    pub key_type: Option<KeyType>,
    /// Serialized length threshold, `0` to disable.
    pub length: u64,
    /// Element count threshold, `0` to disable. Ignored while `length` is set.
    pub cardinality: u64,
    /// LFU counter threshold for hot keys.
    pub frequency: u64,
    /// Keys per batch; also the `SCAN` count hint.
    pub batch: usize,
    /// Maximum number of records per run. For slowlog, the entry count requested.
    pub limit: usize,
}

impl Default for DiagnoseOptions {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            key_type: None,
            length: 0,
            cardinality: 0,
            frequency: 0,
            batch: 10,
            limit: 10,
        }
    }
}

impl DiagnoseOptions {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.batch == 0 {
            return Err(DoctorError::InvalidOption(
                "batch must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keys of one batch and their per-key replies, aligned by index.
///
/// Buffers are cleared, not reallocated, between batches.
#[derive(Debug, Default)]
struct Batch {
    keys: Vec<Vec<u8>>,
    /// `TYPE` replies as sent by the server.
    type_names: Vec<String>,
    /// Parsed `type_names`; bigkey only.
    types: Vec<KeyType>,
    /// Cardinality for bigkey, LFU counter for hotkey.
    counts: Vec<u64>,
    objects: Vec<DebugObjectResult>,
}

impl Batch {
    fn with_capacity(n: usize) -> Self {
        Self {
            keys: Vec::with_capacity(n),
            type_names: Vec::with_capacity(n),
            types: Vec::with_capacity(n),
            counts: Vec::with_capacity(n),
            objects: Vec::with_capacity(n),
        }
    }

    fn clear(&mut self) {
        self.keys.clear();
        self.type_names.clear();
        self.types.clear();
        self.counts.clear();
        self.objects.clear();
    }
}

/// Runs diagnoses against one store client.
pub struct Doctor<C> {
    client: C,
    cancel: CancelToken,
}

impl<C: StoreClient> Doctor<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the token checked before every round trip.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Parses `symptom` and runs it. Returns the number of records emitted.
    ///
    /// An unknown symptom or invalid options fail before any round trip.
    /// The visitor is not finished here; its owner does that once the run
    /// is over, whether it failed or not.
    pub fn diagnose(
        &mut self,
        symptom: &str,
        opts: &DiagnoseOptions,
        visitor: &mut dyn Visitor,
    ) -> Result<usize, DoctorError> {
        let symptom: Symptom = symptom.parse()?;
        self.run(symptom, opts, visitor)
    }

    pub fn run(
        &mut self,
        symptom: Symptom,
        opts: &DiagnoseOptions,
        visitor: &mut dyn Visitor,
    ) -> Result<usize, DoctorError> {
        opts.validate()?;
        info!(
            "Diagnosing {} (pattern={}, type={}, batch={}, limit={})",
            symptom,
            opts.pattern,
            opts.key_type.map_or("any", |t| t.as_str()),
            opts.batch,
            opts.limit
        );

        let emitted = match symptom {
            Symptom::SlowLog => self.slowlog(opts, visitor)?,
            Symptom::BigKey | Symptom::HotKey => self.walk(symptom, opts, visitor)?,
        };

        info!("Diagnosis of {} finished: {} records", symptom, emitted);
        Ok(emitted)
    }

    /// Fetches the whole slow log slice first, so a failed fetch writes nothing.
    fn slowlog(
        &mut self,
        opts: &DiagnoseOptions,
        visitor: &mut dyn Visitor,
    ) -> Result<usize, DoctorError> {
        let entries = self.client.slowlog(&self.cancel, opts.limit)?;
        debug!("SLOWLOG GET {}: {} entries", opts.limit, entries.len());

        let mut emitted = 0;
        for entry in entries {
            emit(visitor, &Entry::SlowLog(entry))?;
            emitted += 1;
        }
        Ok(emitted)
    }

    /// Batch loop shared by bigkey and hotkey.
    fn walk(
        &mut self,
        symptom: Symptom,
        opts: &DiagnoseOptions,
        visitor: &mut dyn Visitor,
    ) -> Result<usize, DoctorError> {
        let mut scanner = KeyScanner::new(&opts.pattern, opts.batch, opts.key_type);
        let mut batch = Batch::with_capacity(opts.batch);
        let mut emitted = 0;
        let mut batches = 0;

        while emitted < opts.limit {
            batch.clear();
            scanner.fill(&mut self.client, &self.cancel, opts.batch, &mut batch.keys)?;
            if batch.keys.is_empty() {
                break;
            }

            let quota = opts.limit - emitted;
            if batch.keys.len() > quota {
                let rest = batch.keys.split_off(quota);
                scanner.push_back(rest);
            }

            self.resolve_types(&mut batch, opts.key_type)?;
            let matched = match symptom {
                Symptom::HotKey => self.hot_keys(&mut batch, opts, visitor)?,
                _ => self.big_keys(&mut batch, opts, visitor)?,
            };

            batches += 1;
            emitted += matched;
            debug!(
                "Batch {}: {} keys, {} matched, {} total",
                batches,
                batch.keys.len(),
                matched,
                emitted
            );
        }

        Ok(emitted)
    }

    fn resolve_types(
        &mut self,
        batch: &mut Batch,
        filter: Option<KeyType>,
    ) -> Result<(), DoctorError> {
        if let Some(key_type) = filter {
            batch.type_names.extend(std::iter::repeat_n(
                key_type.as_str().to_string(),
                batch.keys.len(),
            ));
            return Ok(());
        }

        let commands: Vec<Command<'_>> = batch.keys.iter().map(|k| Command::Type(k)).collect();
        for reply in self.send(&commands)? {
            batch.type_names.push(reply.into_status()?);
        }
        Ok(())
    }

    fn big_keys(
        &mut self,
        batch: &mut Batch,
        opts: &DiagnoseOptions,
        visitor: &mut dyn Visitor,
    ) -> Result<usize, DoctorError> {
        for name in &batch.type_names {
            batch.types.push(name.parse()?);
        }

        let commands: Vec<Command<'_>> = batch
            .keys
            .iter()
            .zip(&batch.types)
            .map(|(key, &key_type)| Command::cardinality(key_type, key))
            .collect();
        for reply in self.send(&commands)? {
            batch.counts.push(reply.into_count()?);
        }

        let commands: Vec<Command<'_>> =
            batch.keys.iter().map(|k| Command::DebugObject(k)).collect();
        for reply in self.send(&commands)? {
            batch.objects.push(parse_debug_object(&reply.into_status()?)?);
        }

        let mut matched = 0;
        let rows = batch
            .keys
            .iter()
            .zip(&batch.types)
            .zip(&batch.counts)
            .zip(&batch.objects);
        for (((key, &key_type), &cardinality), object) in rows {
            if !is_big_key(
                object.serialized_length,
                cardinality,
                opts.length,
                opts.cardinality,
            ) {
                continue;
            }
            let record = Entry::BigKey(BigKey {
                key: format_key(key),
                key_type,
                encoding: object.encoding.clone(),
                serialized_length: object.serialized_length,
                cardinality,
            });
            emit(visitor, &record)?;
            matched += 1;
        }
        Ok(matched)
    }

    fn hot_keys(
        &mut self,
        batch: &mut Batch,
        opts: &DiagnoseOptions,
        visitor: &mut dyn Visitor,
    ) -> Result<usize, DoctorError> {
        let mut live = Vec::with_capacity(batch.keys.len());
        for (i, (key, type_name)) in batch.keys.iter().zip(&batch.type_names).enumerate() {
            if type_name == "none" {
                debug!("Key {} is gone, skipping", format_key(key));
                continue;
            }
            live.push(i);
        }

        let commands: Vec<Command<'_>> = live
            .iter()
            .map(|&i| Command::ObjectFreq(&batch.keys[i]))
            .collect();
        for reply in self.send(&commands)? {
            batch.counts.push(reply.into_count()?);
        }

        let mut matched = 0;
        for (&i, &frequency) in live.iter().zip(&batch.counts) {
            if !is_hot_key(frequency, opts.frequency) {
                continue;
            }
            let record = Entry::HotKey(HotKey {
                key: format_key(&batch.keys[i]),
                key_type: batch.type_names[i].clone(),
                frequency,
            });
            emit(visitor, &record)?;
            matched += 1;
        }
        Ok(matched)
    }

    /// One pipelined round trip; the reply count must match the command count.
    fn send(&mut self, commands: &[Command<'_>]) -> Result<Vec<Reply>, DoctorError> {
        let replies = self.client.pipeline(&self.cancel, commands)?;
        if replies.len() != commands.len() {
            return Err(DoctorError::Protocol(format!(
                "pipeline returned {} replies for {} commands",
                replies.len(),
                commands.len()
            )));
        }
        Ok(replies)
    }
}

fn emit(visitor: &mut dyn Visitor, record: &Entry) -> Result<(), DoctorError> {
    trace!("Emit {}: {:?}", record.kind(), record);
    record.accept(visitor)?;
    Ok(())
}
