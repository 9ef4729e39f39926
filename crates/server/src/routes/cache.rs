//! Cache administration.
//!
//! Purges entries by age, domain, or count, optionally within one partition.

use axum::Json;
use axum::extract::State;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tunecache_core::{CacheDb, Error, PartitionInfo};

use crate::{ApiError, AppState};

/// Body of `POST /cache/purge`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurgeParams {
    /// Restrict the purge to this partition. Alone, it empties the partition.
    pub partition: Option<String>,

    /// Purge entries stored more than this many days ago.
    pub older_than_days: Option<i64>,

    /// Purge entries whose URL contains this domain.
    pub domain: Option<String>,

    /// Keep only the newest N entries.
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

pub async fn partitions(State(state): State<AppState>) -> Result<Json<Vec<PartitionInfo>>, ApiError> {
    Ok(Json(state.db.list_partitions().await?))
}

pub async fn purge(
    State(state): State<AppState>, Json(params): Json<PurgeParams>,
) -> Result<Json<PurgeOutput>, ApiError> {
    let deleted = purge_impl(&state.db, params).await?;
    tracing::info!(deleted, "cache purged");
    Ok(Json(PurgeOutput { deleted }))
}

pub(crate) async fn purge_impl(db: &CacheDb, params: PurgeParams) -> Result<u64, Error> {
    let PurgeParams { partition, older_than_days, domain, max_entries } = params;
    if partition.is_none() && older_than_days.is_none() && domain.is_none() && max_entries.is_none() {
        return Err(Error::InvalidInput(
            "at least one of partition, older_than_days, domain, or max_entries must be specified".to_string(),
        ));
    }
    let scope = partition.as_deref();

    if let Some(name) = scope
        && older_than_days.is_none()
        && domain.is_none()
        && max_entries.is_none()
    {
        let count = db.count_entries(name).await?;
        db.delete_partition(name).await?;
        return Ok(count);
    }

    let mut deleted_total = 0u64;

    if let Some(days) = older_than_days {
        let cutoff = Duration::try_days(days)
            .filter(|age| *age >= Duration::zero())
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| Error::InvalidInput(format!("older_than_days out of range: {days}")))?;
        deleted_total += db.purge_entries_older_than(scope, cutoff).await?;
    }

    if let Some(domain) = domain {
        deleted_total += db.purge_entries_by_domain(scope, &domain).await?;
    }

    if let Some(max_entries) = max_entries {
        deleted_total += db.purge_oldest_entries(scope, max_entries).await?;
    }

    Ok(deleted_total)
}
