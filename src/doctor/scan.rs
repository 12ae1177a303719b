//! Cursor based key iterator over `SCAN`.

use std::collections::VecDeque;

use crate::cancel::CancelToken;
use crate::client::{ScanRequest, StoreClient};
use crate::error::DoctorError;
use crate::model::KeyType;

/// Pulls keys page by page until the server hands back cursor `0`.
///
/// Pages are buffered, so a batch can be filled from several small pages
/// (including empty ones) and one large page can feed several batches.
pub struct KeyScanner<'a> {
    pattern: &'a str,
    count: usize,
    key_type: Option<KeyType>,
    cursor: u64,
    buffer: VecDeque<Vec<u8>>,
    exhausted: bool,
}

impl<'a> KeyScanner<'a> {
    /// `count` is the `COUNT` hint sent with every `SCAN`.
    pub fn new(pattern: &'a str, count: usize, key_type: Option<KeyType>) -> Self {
        Self {
            pattern,
            count,
            key_type,
            cursor: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Appends up to `n` keys to `out`. Fewer are appended only when the
    /// keyspace is exhausted.
    pub fn fill<C: StoreClient + ?Sized>(
        &mut self,
        client: &mut C,
        ctx: &CancelToken,
        n: usize,
        out: &mut Vec<Vec<u8>>,
    ) -> Result<(), DoctorError> {
        let target = out.len() + n;
        while out.len() < target {
            if let Some(key) = self.buffer.pop_front() {
                out.push(key);
                continue;
            }
            if self.exhausted {
                break;
            }

            let page = client.scan(
                ctx,
                &ScanRequest {
                    cursor: self.cursor,
                    pattern: self.pattern,
                    count: self.count,
                    key_type: self.key_type,
                },
            )?;
            self.cursor = page.cursor;
            self.exhausted = page.cursor == 0;
            self.buffer.extend(page.keys);
        }
        Ok(())
    }

    /// Returns keys to the front of the queue, keeping their order, so the
    /// next `fill` yields them first.
    pub fn push_back(&mut self, keys: Vec<Vec<u8>>) {
        for key in keys.into_iter().rev() {
            self.buffer.push_front(key);
        }
    }

    /// `true` once the server finished the scan and every buffered key was handed out.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockKey, MockStore, RoundTrip};
    use crate::fmt::format_key;

    fn names(keys: &[Vec<u8>]) -> Vec<String> {
        keys.iter().map(|k| format_key(k)).collect()
    }

    fn store(n: usize) -> MockStore {
        let mut store = MockStore::new();
        for i in 0..n {
            store.add_key(MockKey::string(format!("k{}", i), 1));
        }
        store
    }

    #[test]
    fn test_fill_spans_pages() {
        let mut store = store(5);
        let ctx = CancelToken::new();
        let mut scanner = KeyScanner::new("*", 2, None);

        let mut keys = Vec::new();
        scanner.fill(&mut store, &ctx, 3, &mut keys).unwrap();
        assert_eq!(names(&keys), vec!["k0", "k1", "k2"]);

        keys.clear();
        scanner.fill(&mut store, &ctx, 3, &mut keys).unwrap();
        assert_eq!(names(&keys), vec!["k3", "k4"]);
        assert!(scanner.is_exhausted());

        keys.clear();
        scanner.fill(&mut store, &ctx, 3, &mut keys).unwrap();
        assert!(keys.is_empty());
        // No SCAN after the cursor came back to 0.
        assert_eq!(store.round_trips().len(), 3);
    }

    #[test]
    fn test_fill_skips_empty_pages() {
        let mut store = MockStore::new();
        store.add_key(MockKey::string("a:1", 1));
        store.add_key(MockKey::string("b:1", 1));
        store.add_key(MockKey::string("b:2", 1));
        store.add_key(MockKey::string("a:2", 1));

        let mut scanner = KeyScanner::new("a:*", 1, None);
        let mut keys = Vec::new();
        scanner
            .fill(&mut store, &CancelToken::new(), 10, &mut keys)
            .unwrap();
        assert_eq!(names(&keys), vec!["a:1", "a:2"]);
        assert_eq!(store.round_trips().len(), 4);
    }

    #[test]
    fn test_push_back_keeps_order() {
        let mut store = store(4);
        let ctx = CancelToken::new();
        let mut scanner = KeyScanner::new("*", 4, None);

        let mut keys = Vec::new();
        scanner.fill(&mut store, &ctx, 4, &mut keys).unwrap();
        let rest = keys.split_off(1);
        scanner.push_back(rest);

        let mut again = Vec::new();
        scanner.fill(&mut store, &ctx, 2, &mut again).unwrap();
        assert_eq!(names(&again), vec!["k1", "k2"]);
        assert!(!scanner.is_exhausted());
    }

    #[test]
    fn test_scan_request_carries_type_and_count() {
        let mut store = store(1);
        let mut scanner = KeyScanner::new("k*", 7, Some(KeyType::String));
        let mut keys = Vec::new();
        scanner
            .fill(&mut store, &CancelToken::new(), 1, &mut keys)
            .unwrap();
        assert_eq!(
            store.round_trips(),
            &[RoundTrip::Scan {
                cursor: 0,
                count: 7,
                key_type: Some(KeyType::String)
            }]
        );
    }

    #[test]
    fn test_scan_error_propagates() {
        let mut store = store(3);
        store.inject(crate::client::mock::Fault::ScanDisconnect { at: 0 });
        let mut scanner = KeyScanner::new("*", 2, None);
        let mut keys = Vec::new();
        let err = scanner
            .fill(&mut store, &CancelToken::new(), 2, &mut keys)
            .unwrap_err();
        assert!(matches!(err, DoctorError::Connection(_)));
    }
}
