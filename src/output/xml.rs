//! XML visitor.
//!
//! Records are children of a `<doctor>` root element, one per line:
//!
//! ```text
//! <doctor>
//! <bigkey><key>cart:1</key><type>hash</type>...</bigkey>
//! <slowlog><id>7</id>...<args><arg>KEYS</arg><arg>*</arg></args>...</slowlog>
//! </doctor>
//! ```
//!
//! The root is opened before the first record and only closed by
//! [`Visitor::finish`]; skipping it leaves the document unterminated.

use std::io::{self, Write};

use super::Visitor;
use crate::model::{BigKey, HotKey, SlowLogEntry, local_rfc3339};

const ROOT: &str = "doctor";

pub struct XmlVisitor<W: Write> {
    out: W,
    opened: bool,
    closed: bool,
}

impl<W: Write> XmlVisitor<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            opened: false,
            closed: false,
        }
    }

    fn open(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::other("xml document already closed"));
        }
        if !self.opened {
            writeln!(self.out, "<{}>", ROOT)?;
            self.opened = true;
        }
        Ok(())
    }

    fn field(&mut self, name: &str, value: &str) -> io::Result<()> {
        write!(self.out, "<{0}>{1}</{0}>", name, escape_xml(value))
    }

    fn record(
        &mut self,
        tag: &str,
        body: impl FnOnce(&mut Self) -> io::Result<()>,
    ) -> io::Result<()> {
        self.open()?;
        write!(self.out, "<{}>", tag)?;
        body(self)?;
        writeln!(self.out, "</{}>", tag)
    }
}

impl<W: Write> Visitor for XmlVisitor<W> {
    fn visit_big_key(&mut self, key: &BigKey) -> io::Result<()> {
        self.record("bigkey", |x| {
            x.field("key", &key.key)?;
            x.field("type", key.key_type.as_str())?;
            x.field("encoding", &key.encoding)?;
            x.field("serializedlength", &key.serialized_length.to_string())?;
            x.field("cardinality", &key.cardinality.to_string())
        })
    }

    fn visit_hot_key(&mut self, key: &HotKey) -> io::Result<()> {
        self.record("hotkey", |x| {
            x.field("key", &key.key)?;
            x.field("type", &key.key_type)?;
            x.field("frequency", &key.frequency.to_string())
        })
    }

    fn visit_slow_log(&mut self, entry: &SlowLogEntry) -> io::Result<()> {
        self.record("slowlog", |x| {
            x.field("id", &entry.id.to_string())?;
            x.field("time", &local_rfc3339(&entry.time))?;
            x.field("duration", &entry.duration.as_nanos().to_string())?;
            write!(x.out, "<args>")?;
            for arg in &entry.args {
                x.field("arg", arg)?;
            }
            write!(x.out, "</args>")?;
            x.field("clientAddr", &entry.client_addr)?;
            x.field("clientName", &entry.client_name)
        })
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.open()?;
        writeln!(self.out, "</{}>", ROOT)?;
        self.closed = true;
        self.out.flush()
    }
}

/// Escapes markup characters; control characters XML cannot carry become U+FFFD.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::model::KeyType;

    fn big_key(name: &str) -> BigKey {
        BigKey {
            key: name.to_string(),
            key_type: KeyType::Hash,
            encoding: "hashtable".to_string(),
            serialized_length: 2048,
            cardinality: 600,
        }
    }

    #[test]
    fn test_document_structure() {
        let mut buf = Vec::new();
        {
            let mut v = XmlVisitor::new(&mut buf);
            v.visit_big_key(&big_key("cart:1")).unwrap();
            v.visit_big_key(&big_key("cart:2")).unwrap();
            v.finish().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "<doctor>");
        assert_eq!(
            lines[1],
            "<bigkey><key>cart:1</key><type>hash</type><encoding>hashtable</encoding><serializedlength>2048</serializedlength><cardinality>600</cardinality></bigkey>"
        );
        assert_eq!(lines[3], "</doctor>");
    }

    #[test]
    fn test_missing_finish_leaves_document_open() {
        let mut buf = Vec::new();
        {
            let mut v = XmlVisitor::new(&mut buf);
            v.visit_big_key(&big_key("cart:1")).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("<doctor>\n"));
        assert!(!text.trim_end().ends_with("</doctor>"));
    }

    #[test]
    fn test_empty_run_is_well_formed() {
        let mut buf = Vec::new();
        XmlVisitor::new(&mut buf).finish().unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "<doctor>\n</doctor>\n");
    }

    #[test]
    fn test_write_after_finish_fails() {
        let mut buf = Vec::new();
        let mut v = XmlVisitor::new(&mut buf);
        v.finish().unwrap();
        assert!(v.visit_big_key(&big_key("late")).is_err());
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_slow_log_element() {
        let time = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut buf = Vec::new();
        {
            let mut v = XmlVisitor::new(&mut buf);
            v.visit_slow_log(&SlowLogEntry {
                id: 9,
                time,
                duration: Duration::from_micros(3),
                args: vec!["SET".to_string(), "<k>".to_string(), "a&b".to_string()],
                client_addr: "127.0.0.1:1".to_string(),
                client_name: String::new(),
            })
            .unwrap();
            v.finish().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let expected = format!(
            "<slowlog><id>9</id><time>{}</time><duration>3000</duration><args><arg>SET</arg><arg>&lt;k&gt;</arg><arg>a&amp;b</arg></args><clientAddr>127.0.0.1:1</clientAddr><clientName></clientName></slowlog>",
            local_rfc3339(&time)
        );
        assert_eq!(text.lines().nth(1), Some(expected.as_str()));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape_xml("bin\u{1}ary"), "bin\u{FFFD}ary");
    }
}
