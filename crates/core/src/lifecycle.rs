//! Worker lifecycle: install and activate.
//!
//! ```text
//! parsed -> installing -> installed -> activating -> active
//! ```
//!
//! Install fills the primary partition with the bootstrap resources and
//! takes over immediately rather than waiting for older clients to go away.
//! Activate deletes every partition outside the current version's
//! allow-list, claims all clients and tells each of them once.
//!
//! Both steps are best-effort: individual failures are logged and reported,
//! never fatal.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::Error;
use crate::clients::{ClientMessage, Clients};
use crate::fetch::FetchRequest;
use crate::strategy::StrategyContext;
use crate::worker::WorkerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub precached: usize,
    /// URLs that could not be fetched or stored.
    pub failed: Vec<String>,
    /// Always set: a new version takes over without waiting for old clients.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub retained: Vec<String>,
    pub claimed: usize,
    pub notified: usize,
}

pub struct Lifecycle {
    config: Arc<WorkerConfig>,
    ctx: StrategyContext,
    clients: Clients,
    state: RwLock<LifecycleState>,
}

impl Lifecycle {
    pub fn new(config: Arc<WorkerConfig>, ctx: StrategyContext, clients: Clients) -> Self {
        Self { config, ctx, clients, state: RwLock::new(LifecycleState::Parsed) }
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    async fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().await;
        let from = *state;
        tracing::debug!(%from, to = %next, "lifecycle transition");
        *state = next;
    }

    /// Open the primary partition and fill it with the bootstrap resources.
    pub async fn install(&self) -> InstallReport {
        self.set_state(LifecycleState::Installing).await;

        let primary = self.config.policies.primary();
        if let Err(e) = self.ctx.db.open_partition(primary).await {
            tracing::warn!(partition = %primary.name, error = %e, "failed to open primary partition");
        }

        let mut report = InstallReport::default();
        for url in &self.config.precache {
            let request = FetchRequest::get(url.clone());
            let stored = match self.ctx.network.fetch(&request).await {
                Ok(response) if response.is_storable() => self.ctx.db.put_entry(primary, &request, &response).await,
                Ok(response) => Err(Error::HttpError(format!("status {}", response.status))),
                Err(e) => Err(e),
            };

            match stored {
                Ok(()) => report.precached += 1,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "precache failed");
                    report.failed.push(url.to_string());
                }
            }
        }

        self.set_state(LifecycleState::Installed).await;
        report.skip_waiting = true;
        tracing::info!(version = %self.config.version, "installed, taking over without waiting");
        report
    }

    /// Retire partitions from other versions, claim clients and notify them.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the worker is installed.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        {
            let mut state = self.state.write().await;
            if *state != LifecycleState::Installed {
                return Err(Error::InvalidState(format!("cannot activate while {}", *state)));
            }
            *state = LifecycleState::Activating;
        }

        let allow_list = self.config.policies.allow_list();
        let names = self.ctx.db.partition_names().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to enumerate partitions");
            Vec::new()
        });

        let mut report = ActivationReport::default();
        for name in names {
            if allow_list.contains(&name) {
                report.retained.push(name);
                continue;
            }
            match self.ctx.db.delete_partition(&name).await {
                Ok(_) => {
                    tracing::info!(partition = %name, "deleted partition from previous version");
                    report.deleted.push(name);
                }
                Err(e) => tracing::warn!(partition = %name, error = %e, "failed to delete partition"),
            }
        }

        report.claimed = self.clients.claim();
        report.notified = self
            .clients
            .broadcast(&ClientMessage::Activated { version: self.config.version.clone() });

        self.set_state(LifecycleState::Active).await;
        Ok(report)
    }
}
