//! Output visitors.
//!
//! Each record kind has one visitor method; each call writes exactly one
//! record (a CSV row, a JSON line, an XML element). Visitors are single
//! pass: the owner calls [`Visitor::finish`] once when the run ends, which
//! flushes buffered rows or closes the XML document.

mod csv;
mod json;
mod xml;

use std::io::{self, Write};

use crate::model::{BigKey, HotKey, SlowLogEntry};

pub use csv::CsvVisitor;
pub use json::JsonVisitor;
pub use xml::XmlVisitor;

/// One method per record kind.
pub trait Visitor {
    fn visit_big_key(&mut self, key: &BigKey) -> io::Result<()>;
    fn visit_hot_key(&mut self, key: &HotKey) -> io::Result<()>;
    fn visit_slow_log(&mut self, entry: &SlowLogEntry) -> io::Result<()>;
    /// Flushes and terminates the output. Records written after this fail
    /// or are not guaranteed to reach the stream.
    fn finish(&mut self) -> io::Result<()>;
}

/// Output format selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Xml,
}

/// Builds the visitor for `format` writing to `out`.
pub fn new_visitor<'a, W: Write + 'a>(format: OutputFormat, out: W) -> Box<dyn Visitor + 'a> {
    match format {
        OutputFormat::Csv => Box::new(CsvVisitor::new(out)),
        OutputFormat::Json => Box::new(JsonVisitor::new(out)),
        OutputFormat::Xml => Box::new(XmlVisitor::new(out)),
    }
}
