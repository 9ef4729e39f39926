//! SQLite-backed partitioned response cache.
//!
//! This module provides the persistent store behind the worker, using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions, each tagged with the cache version it belongs to
//! - One entry per (partition, request key), overwritten in place
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Purging by partition, age or count

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use partitions::PartitionInfo;
