//! Newline-delimited JSON visitor: one compact object per record.

use std::io::{self, Write};

use serde::Serialize;

use super::Visitor;
use crate::model::{BigKey, HotKey, SlowLogEntry};

pub struct JsonVisitor<W: Write> {
    out: W,
}

impl<W: Write> JsonVisitor<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn encode<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")
    }
}

impl<W: Write> Visitor for JsonVisitor<W> {
    fn visit_big_key(&mut self, key: &BigKey) -> io::Result<()> {
        self.encode(key)
    }

    fn visit_hot_key(&mut self, key: &HotKey) -> io::Result<()> {
        self.encode(key)
    }

    fn visit_slow_log(&mut self, entry: &SlowLogEntry) -> io::Result<()> {
        self.encode(entry)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::model::KeyType;

    #[test]
    fn test_one_object_per_line() {
        let mut buf = Vec::new();
        {
            let mut v = JsonVisitor::new(&mut buf);
            v.visit_big_key(&BigKey {
                key: "a".to_string(),
                key_type: KeyType::Set,
                encoding: "intset".to_string(),
                serialized_length: 10,
                cardinality: 3,
            })
            .unwrap();
            v.visit_slow_log(&SlowLogEntry {
                id: 3,
                time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
                duration: Duration::from_micros(20),
                args: vec!["GET".to_string(), "a".to_string()],
                client_addr: String::new(),
                client_name: String::new(),
            })
            .unwrap();
            v.finish().unwrap();
        }

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"key":"a","type":"set","encoding":"intset","serializedlength":10,"cardinality":3}"#
        );

        let slow: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(slow["id"], 3);
        assert_eq!(slow["duration"], 20_000);
        assert!(slow.get("clientAddr").is_none());
        assert!(slow.get("clientName").is_none());
    }

    #[test]
    fn test_write_failure_surfaces() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut v = JsonVisitor::new(Broken);
        let err = v
            .visit_hot_key(&HotKey {
                key: "k".to_string(),
                key_type: "string".to_string(),
                frequency: 1,
            })
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
