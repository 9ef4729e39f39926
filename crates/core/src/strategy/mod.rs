//! Strategy executors.
//!
//! Each executor decides the order in which the partition and the network
//! are consulted for one request:
//!
//! - [`cache_first`]: fresh entry wins, network only on miss or staleness
//! - [`network_first`]: network wins, fresh entry only on network failure
//! - [`stale_while_revalidate`]: fresh entry wins, network refreshes it in the background
//! - network-only: the cache is never read or written
//!
//! Every successful (2xx) network response is written to the policy's
//! partition. A failed write is logged and otherwise ignored.

mod cache_first;
mod network_first;
mod stale_while_revalidate;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::cache::{CacheDb, CacheEntry};
use crate::fetch::{FetchRequest, FetchResponse, Network};
use crate::policy::{Partition, Policy, Strategy};
use crate::Error;

/// Storage and network shared by every executor.
#[derive(Clone)]
pub struct StrategyContext {
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
}

impl StrategyContext {
    pub fn new(db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { db, network }
    }

    /// Partition lookup that treats storage failures as a miss.
    async fn lookup(&self, partition: &Partition, request: &FetchRequest) -> Option<CacheEntry> {
        match self.db.match_entry(&partition.name, request).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(partition = %partition.name, url = %request.url, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Write a storable response to the partition. Failures are logged only.
    async fn store(&self, partition: &Partition, request: &FetchRequest, response: &FetchResponse) {
        if !response.is_storable() {
            return;
        }
        if let Err(e) = self.db.put_entry(partition, request, response).await {
            tracing::warn!(partition = %partition.name, url = %request.url, error = %e, "cache write failed");
        }
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// Fresh cached entry.
    Cache,
    /// Cached entry past its max-age, used because the network failed.
    StaleCache,
    Network,
    /// Placeholder produced by the router after every other path failed.
    OfflineFallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::StaleCache => "stale-cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflineFallback => "offline-fallback",
        }
    }
}

/// Handle to a detached background refresh.
///
/// Dropping it leaves the task running. Nothing on the request path waits
/// for it; [`Revalidation::wait`] exists for callers that need to observe
/// the refresh, such as tests and shutdown.
#[derive(Debug)]
pub struct Revalidation(JoinHandle<()>);

impl Revalidation {
    pub async fn wait(self) {
        if let Err(e) = self.0.await {
            tracing::warn!(error = %e, "background revalidation task aborted");
        }
    }
}

/// Result of running a strategy.
#[derive(Debug)]
pub struct Outcome {
    pub response: FetchResponse,
    pub source: ResponseSource,
    pub revalidation: Option<Revalidation>,
}

impl Outcome {
    fn new(response: FetchResponse, source: ResponseSource) -> Self {
        Self { response, source, revalidation: None }
    }
}

/// Run the executor for the policy's strategy.
pub async fn execute(ctx: &StrategyContext, policy: &Policy, request: &FetchRequest) -> Result<Outcome, Error> {
    tracing::debug!(
        url = %request.url,
        class = ?policy.class,
        strategy = %policy.strategy,
        partition = %policy.partition.name,
        "executing strategy"
    );

    match policy.strategy {
        Strategy::CacheFirst => cache_first(ctx, policy, request).await,
        Strategy::NetworkFirst => network_first(ctx, policy, request).await,
        Strategy::StaleWhileRevalidate => stale_while_revalidate(ctx, policy, request).await,
        Strategy::NetworkOnly => network_only(ctx, request).await,
    }
}

/// Fetch without touching the cache.
pub async fn network_only(ctx: &StrategyContext, request: &FetchRequest) -> Result<Outcome, Error> {
    let response = ctx.network.fetch(request).await?;
    Ok(Outcome::new(response, ResponseSource::Network))
}

fn is_fresh(entry: &CacheEntry, policy: &Policy) -> bool {
    entry.is_fresh(policy.max_age, Utc::now())
}
