//! Worker assembly.
//!
//! [`WorkerConfig`] is the immutable configuration the router, executors
//! and lifecycle share; it is built once at startup. [`Worker`] wires them
//! together around one store, one network and one client registry.

use std::sync::Arc;

use url::Url;

use crate::clients::Clients;
use crate::config::{AppConfig, ConfigError};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::policy::PolicyTable;
use crate::router::FetchRouter;
use crate::strategy::StrategyContext;

/// Immutable worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub version: String,
    pub policies: PolicyTable,
    /// Absolute URLs fetched into the primary partition at install time.
    pub precache: Vec<Url>,
    /// Absolute URL of the app shell served to offline navigations.
    pub app_shell: Url,
}

impl WorkerConfig {
    /// Build the configuration, resolving precache paths against `origin`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a precache entry or the app shell
    /// cannot be resolved to a URL.
    pub fn new(
        prefix: &str, version: &str, origin: &Url, precache: &[String], app_shell: &str,
    ) -> Result<Self, ConfigError> {
        let resolve = |field: &str, path: &str| {
            origin
                .join(path)
                .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{path}: {e}") })
        };

        let precache = precache
            .iter()
            .map(|path| resolve("precache", path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: version.to_string(),
            policies: PolicyTable::new(prefix, version),
            precache,
            app_shell: resolve("app_shell", app_shell)?,
        })
    }

    /// Build the worker configuration from the loaded application config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = config.upstream_url()?;
        Self::new(&config.cache_prefix, &config.cache_version, &origin, &config.precache, &config.app_shell)
    }
}

/// Router, lifecycle and client registry for one cache version.
pub struct Worker {
    config: Arc<WorkerConfig>,
    router: FetchRouter,
    lifecycle: Lifecycle,
    clients: Clients,
}

impl Worker {
    pub fn new(config: WorkerConfig, ctx: StrategyContext) -> Self {
        let config = Arc::new(config);
        let clients = Clients::new();
        Self {
            router: FetchRouter::new(config.clone(), ctx.clone()),
            lifecycle: Lifecycle::new(config.clone(), ctx, clients.clone()),
            clients,
            config,
        }
    }

    /// Install then activate. Failures are logged; the worker always ends
    /// up serving requests.
    pub async fn start(&self) -> LifecycleState {
        let report = self.lifecycle.install().await;
        tracing::info!(
            version = %self.config.version,
            precached = report.precached,
            failed = report.failed.len(),
            "install finished"
        );

        match self.lifecycle.activate().await {
            Ok(report) => tracing::info!(
                version = %self.config.version,
                deleted = ?report.deleted,
                notified = report.notified,
                "activation finished"
            ),
            Err(e) => tracing::error!(error = %e, "activation failed"),
        }

        self.lifecycle.state().await
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn router(&self) -> &FetchRouter {
        &self.router
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDb;
    use crate::fetch::FetchResponse;
    use crate::strategy::testing::ScriptedNetwork;

    fn origin() -> Url {
        Url::parse("http://localhost:5173").unwrap()
    }

    #[test]
    fn test_config_resolves_paths() {
        let config =
            WorkerConfig::new("tunecache", "v1", &origin(), &["/".into(), "/manifest.json".into()], "/index.html")
                .unwrap();
        assert_eq!(config.precache[1].as_str(), "http://localhost:5173/manifest.json");
        assert_eq!(config.app_shell.as_str(), "http://localhost:5173/index.html");
        assert_eq!(config.policies.version(), "v1");
    }

    #[test]
    fn test_config_from_app_config() {
        let config = WorkerConfig::from_app_config(&AppConfig::default()).unwrap();
        assert_eq!(config.precache.len(), 3);
        assert_eq!(config.policies.primary().name, "tunecache-static-v1");
    }

    #[tokio::test]
    async fn test_start_reaches_active() {
        let network = Arc::new(
            ScriptedNetwork::new().respond("http://localhost:5173/index.html", FetchResponse::new(200, "<html>")),
        );
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = WorkerConfig::new("tunecache", "v1", &origin(), &["/index.html".into()], "/index.html").unwrap();
        let worker = Worker::new(config, StrategyContext::new(db, network));

        assert_eq!(worker.start().await, LifecycleState::Active);
    }
}
