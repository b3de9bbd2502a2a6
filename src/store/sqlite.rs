//! SQLite single-table backend
//!
//! Emulates the label table on SQLite for local development. Rows live in one
//! table keyed by `(pk, sk)`; SQLite's B-tree keeps them in key order, so a
//! range scan walks label partitions contiguously and an equality query is a
//! prefix seek.
//!
//! Pagination is keyset based: the token carries the `(PK, SK)` of the last
//! row returned and the next page starts strictly after it.

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{
    ContinuationToken, IndexRecord, KeyCondition, Page, PageRequest, StoreError, StoreResult,
    TableStore,
};

const PK_ATTR: &str = "PK";
const SK_ATTR: &str = "SK";

/// Default rows returned per page
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// SQLite-backed label table
pub struct SqliteTable {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
    page_size: u32,
}

impl SqliteTable {
    /// Create or open a table file
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory table
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS index_records (
                pk TEXT NOT NULL,
                sk TEXT NOT NULL,
                label TEXT,
                object_key TEXT,
                PRIMARY KEY (pk, sk)
            ) WITHOUT ROWID",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the default page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Location of the backing file, `None` for in-memory tables
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or replace a single row
    pub fn put(&self, record: &IndexRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO index_records (pk, sk, label, object_key)
             VALUES (?, ?, ?, ?)",
            params![
                record.partition_key,
                record.sort_key,
                record.label,
                record.object_key
            ],
        )?;
        Ok(())
    }

    /// Insert or replace rows in one transaction
    pub fn put_all(&self, records: &[IndexRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO index_records (pk, sk, label, object_key)
                 VALUES (?, ?, ?, ?)",
            )?;

            for record in records {
                stmt.execute(params![
                    record.partition_key,
                    record.sort_key,
                    record.label,
                    record.object_key
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    /// Total rows in the table
    pub fn count(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM index_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(format!("sqlite connection poisoned: {}", e)))
    }

    fn read_page(conn: &Connection, request: &PageRequest, limit: u32) -> StoreResult<Page> {
        let after = match &request.cursor {
            Some(token) => Some((
                token.require(PK_ATTR)?.to_string(),
                token.require(SK_ATTR)?.to_string(),
            )),
            None => None,
        };

        // One extra row tells us whether another page exists
        let fetch = i64::from(limit) + 1;

        let mut records = match (&request.condition, &after) {
            (KeyCondition::Equals(pk), None) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT pk, sk, label, object_key FROM index_records
                     WHERE pk = ?1
                     ORDER BY sk
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![pk, fetch], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (KeyCondition::Equals(pk), Some((_, last_sk))) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT pk, sk, label, object_key FROM index_records
                     WHERE pk = ?1 AND sk > ?2
                     ORDER BY sk
                     LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![pk, last_sk, fetch], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (KeyCondition::Range { lower, upper }, None) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT pk, sk, label, object_key FROM index_records
                     WHERE pk >= ?1 AND pk < ?2
                     ORDER BY pk, sk
                     LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![lower, upper, fetch], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (KeyCondition::Range { lower, upper }, Some((last_pk, last_sk))) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT pk, sk, label, object_key FROM index_records
                     WHERE pk >= ?1 AND pk < ?2
                       AND (pk > ?3 OR (pk = ?3 AND sk > ?4))
                     ORDER BY pk, sk
                     LIMIT ?5",
                )?;
                let rows =
                    stmt.query_map(params![lower, upper, last_pk, last_sk, fetch], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        let next = if records.len() > limit as usize {
            records.truncate(limit as usize);
            records.last().map(|last| {
                ContinuationToken::new()
                    .with(PK_ATTR, last.partition_key.clone())
                    .with(SK_ATTR, last.sort_key.clone())
            })
        } else {
            None
        };

        Ok(Page { records, next })
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<IndexRecord> {
    Ok(IndexRecord {
        partition_key: row.get(0)?,
        sort_key: row.get(1)?,
        label: row.get(2)?,
        object_key: row.get(3)?,
    })
}

#[async_trait]
impl TableStore for SqliteTable {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_page(&self, request: &PageRequest) -> StoreResult<Page> {
        request.validate()?;

        let conn = Arc::clone(&self.conn);
        let request = request.clone();
        let limit = request.limit.unwrap_or(self.page_size).max(1);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Lock(format!("sqlite connection poisoned: {}", e)))?;
            Self::read_page(&conn, &request, limit)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("sqlite reader task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> SqliteTable {
        let table = SqliteTable::in_memory().unwrap().with_page_size(2);
        table
            .put_all(&[
                IndexRecord::label_association("dogs", "dog1.mp4"),
                IndexRecord::label_association("cats", "cat2.mp4"),
                IndexRecord::other("VIDEO#cat1.mp4", "META"),
                IndexRecord::label_association("cats", "cat1.mp4"),
                IndexRecord::other("AUDIT#1", "2024-01-01"),
            ])
            .unwrap();
        table
    }

    async fn drain(table: &SqliteTable, request: PageRequest) -> (Vec<IndexRecord>, usize) {
        let mut request = request;
        let mut records = Vec::new();
        let mut pages = 0;
        loop {
            let page = table.fetch_page(&request).await.unwrap();
            pages += 1;
            records.extend(page.records);
            match page.next {
                Some(token) => request.cursor = Some(token),
                None => break,
            }
        }
        (records, pages)
    }

    #[tokio::test]
    async fn test_range_scan_in_key_order() {
        let table = seeded();
        let (records, pages) = drain(
            &table,
            PageRequest::scan(KeyCondition::range("LABEL", "VIDEO")),
        )
        .await;

        let keys: Vec<_> = records
            .iter()
            .map(|r| (r.partition_key.as_str(), r.sort_key.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("LABEL#cats", "cat1.mp4"),
                ("LABEL#cats", "cat2.mp4"),
                ("LABEL#dogs", "dog1.mp4"),
            ]
        );
        assert_eq!(pages, 2);
    }

    #[tokio::test]
    async fn test_equality_query() {
        let table = seeded().with_page_size(1);
        let (records, pages) =
            drain(&table, PageRequest::query(KeyCondition::equals("LABEL#cats"))).await;

        assert_eq!(records.len(), 2);
        assert_eq!(pages, 2);
        assert!(records.iter().all(|r| r.label.as_deref() == Some("cats")));
    }

    #[tokio::test]
    async fn test_unknown_partition_is_empty() {
        let table = seeded();
        let page = table
            .fetch_page(&PageRequest::query(KeyCondition::equals("LABEL#birds")))
            .await
            .unwrap();
        assert!(page.records.is_empty());
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_row() {
        let table = SqliteTable::in_memory().unwrap();
        table
            .put(&IndexRecord::label_association("cats", "cat1.mp4"))
            .unwrap();
        table
            .put(&IndexRecord::label_association("cats", "cat1.mp4"))
            .unwrap();
        assert_eq!(table.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.db");

        {
            let table = SqliteTable::open(&path).unwrap();
            table
                .put(&IndexRecord::label_association("cats", "cat1.mp4"))
                .unwrap();
        }

        let table = SqliteTable::open(&path).unwrap();
        assert_eq!(table.count().unwrap(), 1);
        assert_eq!(table.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_cursor_requires_key_attributes() {
        let table = seeded();
        let request = PageRequest::scan(KeyCondition::range("LABEL", "VIDEO"))
            .with_cursor(Some(ContinuationToken::new().with("offset", "3")));
        assert!(matches!(
            table.fetch_page(&request).await,
            Err(StoreError::InvalidCursor(_))
        ));
    }
}
