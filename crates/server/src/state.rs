//! Shared state passed to all request handlers.

use std::sync::Arc;

use tunecache_client::{FetchClient, FetchConfig, YoutubeClient, YoutubeConfig};
use tunecache_core::{AppConfig, CacheDb, StrategyContext, Worker, WorkerConfig};
use url::Url;

use crate::error::StartupError;

#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<Worker>,
    pub db: CacheDb,
    /// Network used for passthrough requests and `/proxy`.
    pub fetch: FetchClient,
    pub youtube: YoutubeClient,
    /// Origin relative requests are resolved against.
    pub upstream: Url,
}

impl AppState {
    /// Assemble the worker and HTTP clients from the loaded configuration.
    ///
    /// The worker is returned un-started; call [`Worker::start`] before serving.
    pub fn from_config(config: &AppConfig, db: CacheDb) -> Result<Self, StartupError> {
        let fetch = FetchClient::new(FetchConfig::from_app_config(config))?;
        let youtube = YoutubeClient::new(YoutubeConfig::from_app_config(config))?;
        let worker_config = WorkerConfig::from_app_config(config)?;
        let ctx = StrategyContext::new(db.clone(), Arc::new(fetch.clone()));

        Ok(Self {
            worker: Arc::new(Worker::new(worker_config, ctx)),
            db,
            fetch,
            youtube,
            upstream: config.upstream_url()?,
        })
    }
}
