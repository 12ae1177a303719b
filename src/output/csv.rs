//! CSV visitor: one row per record, no header.
//!
//! Columns:
//! - bigkey: key, type, encoding, serialized length, cardinality
//! - hotkey: key, type, frequency
//! - slowlog: id, local time, duration, space-joined args, client addr, client name

use std::io::{self, BufWriter, Write};

use super::Visitor;
use crate::fmt::{format_duration, format_local_time};
use crate::model::{BigKey, HotKey, SlowLogEntry};

pub struct CsvVisitor<W: Write> {
    out: BufWriter<W>,
}

impl<W: Write> CsvVisitor<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
        }
    }

    fn write_row(&mut self, fields: &[&str]) -> io::Result<()> {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.out.write_all(b",")?;
            }
            if needs_quotes(field) {
                self.out.write_all(b"\"")?;
                self.out.write_all(field.replace('"', "\"\"").as_bytes())?;
                self.out.write_all(b"\"")?;
            } else {
                self.out.write_all(field.as_bytes())?;
            }
        }
        self.out.write_all(b"\n")
    }
}

/// Quote fields holding a separator, a quote, a line break or leading whitespace.
fn needs_quotes(field: &str) -> bool {
    if field.is_empty() {
        return false;
    }
    field == r"\."
        || field.contains([',', '"', '\r', '\n'])
        || field.starts_with(char::is_whitespace)
}

impl<W: Write> Visitor for CsvVisitor<W> {
    fn visit_big_key(&mut self, key: &BigKey) -> io::Result<()> {
        self.write_row(&[
            &key.key,
            key.key_type.as_str(),
            &key.encoding,
            &key.serialized_length.to_string(),
            &key.cardinality.to_string(),
        ])
    }

    fn visit_hot_key(&mut self, key: &HotKey) -> io::Result<()> {
        self.write_row(&[&key.key, &key.key_type, &key.frequency.to_string()])
    }

    fn visit_slow_log(&mut self, entry: &SlowLogEntry) -> io::Result<()> {
        self.write_row(&[
            &entry.id.to_string(),
            &format_local_time(&entry.time),
            &format_duration(entry.duration),
            &entry.args.join(" "),
            &entry.client_addr,
            &entry.client_name,
        ])
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
