//! In-memory store for exercising the diagnosis engine without a server.
//!
//! `MockStore` keeps an ordered keyspace, answers `SCAN` with real cursor
//! paging and glob matching, evaluates pipelined commands per key, and
//! records every round trip so tests can check batching and ordering.

mod scenarios;
mod store;

pub use store::{Fault, MockKey, MockStore, RoundTrip, glob_match};
