//! Core types and shared functionality for tunecache.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Caching policies and the strategy executors
//! - Worker lifecycle (install/activate) and the request router
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod policy;
pub mod router;
pub mod strategy;
pub mod worker;

pub use cache::{CacheDb, CacheEntry, PartitionInfo};
pub use clients::{ClientHandle, ClientMessage, Clients};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use fetch::{FetchRequest, FetchResponse, Network};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use policy::{Partition, PartitionKind, Policy, PolicyTable, ResourceClass, Strategy, classify};
pub use router::{Disposition, FetchRouter};
pub use strategy::{Outcome, ResponseSource, StrategyContext};
pub use worker::{Worker, WorkerConfig};
