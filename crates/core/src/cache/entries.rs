//! Cache entry operations.
//!
//! Stores response snapshots keyed by (partition, request key). A put
//! replaces any previous entry for the same key.

use std::time::Duration;

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use crate::fetch::{FetchRequest, FetchResponse};
use crate::policy::Partition;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response and the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub partition: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub response: FetchResponse,
    /// Taken from the response `Date` header, or the time of the put.
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh iff `now - stored_at <= max_age`.
    ///
    /// Entries dated in the future count as fresh.
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.stored_at);
        match age.to_std() {
            Ok(age) => age <= max_age,
            Err(_) => true,
        }
    }
}

/// Timestamps are stored at fixed millisecond precision so that text
/// comparison in SQL orders them correctly.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("stored_at {raw:?}: {e}")))
}

impl CacheDb {
    /// Store `response` for `request` in `partition`, creating the partition lazily.
    pub async fn put_entry(
        &self, partition: &Partition, request: &FetchRequest, response: &FetchResponse,
    ) -> Result<(), Error> {
        let url = request.url.to_string();
        let key_hash = compute_cache_key(&request.method, &url);
        let method = request.method.clone();
        let stored_at = format_ts(response.date().unwrap_or_else(Utc::now));
        let created_at = Utc::now().to_rfc3339();
        let headers_json = serde_json::to_string(&response.headers)?;
        let status = i64::from(response.status);
        let body = response.body.to_vec();
        let name = partition.name.clone();
        let version = partition.version.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, version, created_at) VALUES (?1, ?2, ?3)",
                    params![name, version, created_at],
                )?;
                tx.execute(
                    "INSERT INTO entries (partition, key_hash, method, url, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![name, key_hash, method, url, status, headers_json, body, stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for `request` in the named partition.
    ///
    /// Returns None if there is no entry for that key.
    pub async fn match_entry(&self, partition: &str, request: &FetchRequest) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());

        let row = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT partition, key_hash, method, url, status, headers_json, body, stored_at
                     FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![partition, key_hash], |row| {
                    Ok(RawEntry {
                        partition: row.get(0)?,
                        key_hash: row.get(1)?,
                        method: row.get(2)?,
                        url: row.get(3)?,
                        status: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        stored_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(RawEntry::decode).transpose()
    }

    /// Remove the entry for `request` from the named partition.
    pub async fn delete_entry(&self, partition: &str, request: &FetchRequest) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the named partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(u64::try_from(count).unwrap_or_default())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries stored before `cutoff`, optionally within one partition.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_older_than(&self, partition: Option<&str>, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let partition = partition.map(str::to_string);
        let cutoff = format_ts(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE stored_at < ?1 AND (?2 IS NULL OR partition = ?2)",
                    params![cutoff, partition],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose URL contains `domain`, optionally within one partition.
    pub async fn purge_entries_by_domain(&self, partition: Option<&str>, domain: &str) -> Result<u64, Error> {
        let partition = partition.map(str::to_string);
        let pattern = format!("%{domain}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE url LIKE ?1 AND (?2 IS NULL OR partition = ?2)",
                    params![pattern, partition],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries until count <= max_entries.
    ///
    /// Age is `stored_at`: the response's `Date` header, or the write time
    /// when it has none. Reads do not refresh it, so this is oldest-first
    /// eviction, not least-recently-used.
    ///
    /// With a partition the limit applies to that partition only, otherwise
    /// to the whole store. Returns the number of deleted entries.
    pub async fn purge_oldest_entries(&self, partition: Option<&str>, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.map(str::to_string);
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE (?1 IS NULL OR partition = ?1)",
                    params![partition],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE rowid IN (
                        SELECT rowid FROM entries
                        WHERE (?1 IS NULL OR partition = ?1)
                        ORDER BY stored_at ASC LIMIT ?2
                    )",
                    params![partition, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

/// Row as read from SQLite, before header and timestamp decoding.
struct RawEntry {
    partition: String,
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    fn decode(self) -> Result<CacheEntry, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        Ok(CacheEntry {
            partition: self.partition,
            key_hash: self.key_hash,
            method: self.method,
            url: self.url,
            response: FetchResponse { status, headers, body: Bytes::from(self.body) },
            stored_at: parse_ts(&self.stored_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PartitionKind;
    use url::Url;

    fn partition() -> Partition {
        Partition::new("tunecache", PartitionKind::Runtime, "v1")
    }

    fn request(url: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("https://example.com/app.js");
        let res = FetchResponse::new(200, "console.log(1)").with_header("Content-Type", "text/javascript");

        db.put_entry(&partition(), &req, &res).await.unwrap();

        let entry = db.match_entry("tunecache-runtime-v1", &req).await.unwrap().unwrap();
        assert_eq!(entry.response, res);
        assert_eq!(entry.url, "https://example.com/app.js");
        assert_eq!(entry.method, "GET");
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db
            .match_entry("tunecache-runtime-v1", &request("https://example.com/"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_in_place() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("https://example.com/data.json");

        db.put_entry(&partition(), &req, &FetchResponse::new(200, "old"))
            .await
            .unwrap();
        db.put_entry(&partition(), &req, &FetchResponse::new(200, "new"))
            .await
            .unwrap();

        assert_eq!(db.count_entries("tunecache-runtime-v1").await.unwrap(), 1);
        let entry = db.match_entry("tunecache-runtime-v1", &req).await.unwrap().unwrap();
        assert_eq!(entry.response.body, Bytes::from("new"));
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("https://example.com/a.png");
        let images = Partition::new("tunecache", PartitionKind::Images, "v1");

        db.put_entry(&images, &req, &FetchResponse::new(200, "png")).await.unwrap();

        assert!(db.match_entry("tunecache-images-v1", &req).await.unwrap().is_some());
        assert!(db.match_entry("tunecache-runtime-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stored_at_from_date_header() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("https://example.com/old.css");
        let res = FetchResponse::new(200, "body{}").with_header("Date", "Wed, 21 Oct 2015 07:28:00 GMT");

        db.put_entry(&partition(), &req, &res).await.unwrap();

        let entry = db.match_entry("tunecache-runtime-v1", &req).await.unwrap().unwrap();
        assert_eq!(entry.stored_at.to_rfc3339(), "2015-10-21T07:28:00+00:00");
        assert!(!entry.is_fresh(Duration::from_secs(60), Utc::now()));
    }

    #[tokio::test]
    async fn test_freshness_window() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("https://example.com/new.css");
        db.put_entry(&partition(), &req, &FetchResponse::new(200, "body{}"))
            .await
            .unwrap();

        let entry = db.match_entry("tunecache-runtime-v1", &req).await.unwrap().unwrap();
        assert!(entry.is_fresh(Duration::from_secs(60), Utc::now()));
        assert!(!entry.is_fresh(Duration::from_secs(60), Utc::now() + chrono::Duration::minutes(2)));
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("https://example.com/x");
        db.put_entry(&partition(), &req, &FetchResponse::new(200, "x")).await.unwrap();

        assert!(db.delete_entry("tunecache-runtime-v1", &req).await.unwrap());
        assert!(!db.delete_entry("tunecache-runtime-v1", &req).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = FetchResponse::new(200, "old").with_header("Date", "Wed, 21 Oct 2015 07:28:00 GMT");
        db.put_entry(&partition(), &request("https://example.com/old"), &old)
            .await
            .unwrap();
        db.put_entry(&partition(), &request("https://example.com/new"), &FetchResponse::new(200, "new"))
            .await
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(1);
        let deleted = db.purge_entries_older_than(None, cutoff).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(db.count_entries("tunecache-runtime-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_by_domain() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&partition(), &request("https://example.com/page1"), &FetchResponse::new(200, "a"))
            .await
            .unwrap();
        db.put_entry(&partition(), &request("https://other.com/page2"), &FetchResponse::new(200, "b"))
            .await
            .unwrap();

        let deleted = db.purge_entries_by_domain(None, "example.com").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(
            db.match_entry("tunecache-runtime-v1", &request("https://other.com/page2"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_purge_oldest_with_huge_limit_keeps_all() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for url in ["https://example.com/1", "https://example.com/2"] {
            db.put_entry(&partition(), &request(url), &FetchResponse::new(200, "x"))
                .await
                .unwrap();
        }

        assert_eq!(db.purge_oldest_entries(None, usize::MAX).await.unwrap(), 0);
        assert_eq!(db.count_entries("tunecache-runtime-v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_purge_oldest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let older = FetchResponse::new(200, "1").with_header("Date", "Wed, 21 Oct 2015 07:28:00 GMT");
        db.put_entry(&partition(), &request("https://example.com/1"), &older)
            .await
            .unwrap();
        db.put_entry(&partition(), &request("https://example.com/2"), &FetchResponse::new(200, "2"))
            .await
            .unwrap();

        let deleted = db.purge_oldest_entries(Some("tunecache-runtime-v1"), 1).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(
            db.match_entry("tunecache-runtime-v1", &request("https://example.com/2"))
                .await
                .unwrap()
                .is_some()
        );
    }
}
