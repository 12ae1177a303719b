//! redis-doctor - redis diagnosis library.
//!
//! Finds big keys (by serialized length or element count), hot keys (by LFU
//! access counter) and recent slow commands, and streams the findings as
//! CSV, JSON lines or XML.
//!
//! The engine ([`doctor::Doctor`]) talks to the server only through the
//! [`client::StoreClient`] trait, so it runs unchanged against a live server
//! ([`client::RedisClient`]) or an in-memory keyspace ([`client::MockStore`]).

pub mod cancel;
pub mod client;
pub mod config;
pub mod doctor;
pub mod error;
pub mod fmt;
pub mod model;
pub mod output;
pub mod proto;
