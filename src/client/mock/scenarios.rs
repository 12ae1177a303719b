//! Pre-built keyspaces for tests.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::store::{MockKey, MockStore};
use crate::model::{KeyType, SlowLogEntry};

impl MockStore {
    /// A small application keyspace: sessions, carts, a leaderboard, a
    /// feature flag hash and a job queue, with a couple of oversized keys.
    pub fn typical_keyspace() -> Self {
        let mut store = Self::new();
        store.set_lfu_policy(true);

        store.add_key(MockKey::string("session:1001", 180).with_encoding("embstr").with_frequency(3));
        store.add_key(MockKey::string("session:1002", 210).with_frequency(5));
        store.add_key(
            MockKey::new("cart:1001", KeyType::Hash, 12, 410)
                .with_encoding("listpack")
                .with_frequency(2),
        );
        store.add_key(
            MockKey::new("leaderboard:global", KeyType::ZSet, 250_000, 9_800_000)
                .with_frequency(220),
        );
        store.add_key(
            MockKey::new("flags", KeyType::Hash, 40, 1_200)
                .with_encoding("listpack")
                .with_frequency(180),
        );
        store.add_key(MockKey::new("queue:jobs", KeyType::List, 80_000, 2_400_000).with_frequency(90));
        store.add_key(MockKey::string("blob:avatar:7", 5_242_880).with_frequency(1));
        store.add_key(
            MockKey::new("tags:post:9", KeyType::Set, 7, 64)
                .with_encoding("intset")
                .with_frequency(4),
        );

        store
    }

    /// Set keys with the given cardinalities, named `set:0`, `set:1`, ...
    pub fn with_sets(cardinalities: &[u64]) -> Self {
        let mut store = Self::new();
        for (i, &card) in cardinalities.iter().enumerate() {
            store.add_key(MockKey::new(format!("set:{}", i), KeyType::Set, card, card * 8));
        }
        store
    }

    /// A slow log holding `n` entries, newest (highest id) first.
    pub fn with_slowlog(n: u64) -> Self {
        let mut store = Self::new();
        for id in (0..n).rev() {
            store.add_slowlog(SlowLogEntry {
                id,
                time: DateTime::<Utc>::from_timestamp(1_700_000_000 + id as i64 * 60, 0)
                    .unwrap_or_default(),
                duration: Duration::from_micros(10_000 + id * 1_500),
                args: vec!["HGETALL".to_string(), format!("cart:{}", id)],
                client_addr: format!("10.0.0.{}:52{:03}", id + 1, id),
                client_name: if id % 2 == 0 {
                    "api".to_string()
                } else {
                    String::new()
                },
            });
        }
        store
    }
}
