//! Partition bookkeeping.
//!
//! A partition row records the cache version it was created for, so that
//! rollover never has to recover the version by splitting names apart.

use super::connection::CacheDb;
use crate::Error;
use crate::policy::Partition;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Partition metadata with its current entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub name: String,
    pub version: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Create the partition if it does not exist yet.
    ///
    /// Opening an existing partition leaves its entries and metadata untouched.
    pub async fn open_partition(&self, partition: &Partition) -> Result<(), Error> {
        let name = partition.name.clone();
        let version = partition.version.clone();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, version, created_at) VALUES (?1, ?2, ?3)",
                    params![name, version, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every partition currently stored, in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every partition with its version and entry count.
    pub async fn list_partitions(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.version, p.created_at, COUNT(e.key_hash)
                     FROM partitions p
                     LEFT JOIN entries e ON e.partition = p.name
                     GROUP BY p.name
                     ORDER BY p.created_at, p.name",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo {
                            name: row.get(0)?,
                            version: row.get(1)?,
                            created_at: row.get(2)?,
                            entries: u64::try_from(row.get::<_, i64>(3)?).unwrap_or_default(),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let removed = tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }
}
