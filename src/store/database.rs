//! SQLite-backed inventory database.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use thiserror::Error;

use super::record::{
    DuplicateCount, DuplicateTotals, GroupCursor, NewRecord, PageCursor, PendingFilter, Record,
};

/// Default cap on the number of records committed by one `insert_batch`.
pub const DEFAULT_MAX_INSERT_BATCH: usize = 100;

/// Schema version written to `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS inventory (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_hash TEXT NOT NULL DEFAULT '',
        file_name TEXT NOT NULL,
        file_path TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        is_hashed INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS inventory_file_hash ON inventory (file_hash);
    CREATE INDEX IF NOT EXISTS inventory_file_name ON inventory (file_name);
    CREATE INDEX IF NOT EXISTS inventory_pending ON inventory (is_hashed, file_size);
";

const RECORD_COLUMNS: &str = "id, file_hash, file_name, file_path, file_size, is_hashed";

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened or initialized.
    #[error("Failed to open inventory database {path}: {source}")]
    Open {
        /// Database path
        path: PathBuf,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// The database was written by a newer schema.
    #[error("Inventory database {path} has schema version {found}, newest supported is {supported}")]
    SchemaVersion {
        /// Database path
        path: PathBuf,
        /// Version found on disk
        found: i64,
        /// Version this build understands
        supported: i64,
    },

    /// The file is a SQLite database without an inventory table.
    #[error("{0} is not an inventory database")]
    NotAnInventory(PathBuf),

    /// An insert batch exceeded the configured cap.
    #[error("Insert batch of {len} records exceeds the limit of {max}")]
    BatchTooLarge {
        /// Records offered
        len: usize,
        /// Configured cap
        max: usize,
    },

    /// An update targeted a row that does not exist.
    #[error("Record {0} does not exist")]
    RecordNotFound(i64),

    /// Any other SQLite failure.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Handle on one inventory database.
///
/// The handle is passed explicitly to every component that needs it. All
/// mutations are committed before the call returns.
#[derive(Debug)]
pub struct InventoryStore {
    conn: Connection,
    path: PathBuf,
    max_insert_batch: usize,
}

impl InventoryStore {
    /// Opens or creates the inventory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the file cannot be opened or the
    /// schema cannot be created, and [`StoreError::SchemaVersion`] when the
    /// file was written by a newer version.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(open_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;
        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(open_err)?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
            max_insert_batch: DEFAULT_MAX_INSERT_BATCH,
        };
        store.check_version()?;
        store.conn.execute_batch(SCHEMA).map_err(open_err)?;
        store
            .conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(open_err)?;

        log::debug!("Opened inventory {}", path.display());
        Ok(store)
    }

    /// Opens an existing inventory read-only.
    ///
    /// Probing a second inventory must never create an empty one, so a
    /// missing file is an error here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the file is missing or unreadable
    /// and [`StoreError::NotAnInventory`] when it lacks the inventory table.
    pub fn open_existing(path: &Path) -> StoreResult<Self> {
        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(open_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
            max_insert_batch: DEFAULT_MAX_INSERT_BATCH,
        };
        store.check_version()?;

        let has_table: bool = store
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'inventory')",
                [],
                |row| row.get(0),
            )
            .map_err(open_err)?;
        if !has_table {
            return Err(StoreError::NotAnInventory(path.to_path_buf()));
        }

        log::trace!("Opened inventory {} read-only", path.display());
        Ok(store)
    }

    /// Creates a private in-memory inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            max_insert_batch: DEFAULT_MAX_INSERT_BATCH,
        })
    }

    /// Set the cap enforced by [`InventoryStore::insert_batch`].
    #[must_use]
    pub fn with_max_insert_batch(mut self, max: usize) -> Self {
        self.max_insert_batch = max.max(1);
        self
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Largest batch accepted by [`InventoryStore::insert_batch`].
    #[must_use]
    pub fn max_insert_batch(&self) -> usize {
        self.max_insert_batch
    }

    fn check_version(&self) -> StoreResult<()> {
        let found: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|source| StoreError::Open {
                path: self.path.clone(),
                source,
            })?;
        if found > SCHEMA_VERSION {
            return Err(StoreError::SchemaVersion {
                path: self.path.clone(),
                found,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    /// Inserts one batch of new records in a single transaction.
    ///
    /// Every record starts with an empty hash and `hashed = false`.
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BatchTooLarge`] when `records` exceeds the cap;
    /// nothing is written in that case.
    pub fn insert_batch(&mut self, records: &[NewRecord]) -> StoreResult<usize> {
        if records.len() > self.max_insert_batch {
            return Err(StoreError::BatchTooLarge {
                len: records.len(),
                max: self.max_insert_batch,
            });
        }
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO inventory (file_hash, file_name, file_path, file_size, is_hashed)
                 VALUES ('', ?1, ?2, ?3, 0)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.file_name,
                    record.file_path,
                    size_to_sql(record.file_size)
                ])?;
            }
        }
        tx.commit()?;

        log::trace!("Committed batch of {} records", records.len());
        Ok(records.len())
    }

    /// First `limit` unhashed records, largest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn select_unhashed(&self, limit: usize) -> StoreResult<Vec<Record>> {
        self.select_pending(PendingFilter::Unhashed, None, limit)
    }

    /// Next page of pending records after `after`.
    ///
    /// Records are ordered by `(file_size DESC, id ASC)`. Passing the cursor
    /// of the last record of the previous page continues the sequence; each
    /// call is an independent query, so the sequence can be restarted at any
    /// time by passing `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn select_pending(
        &self,
        filter: PendingFilter,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        let (size, id) = after.map_or((i64::MAX, i64::MIN), |c| (size_to_sql(c.file_size), c.id));
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM inventory
             WHERE {} AND (file_size < ?1 OR (file_size = ?1 AND id > ?2))
             ORDER BY file_size DESC, id ASC
             LIMIT ?3",
            filter.where_clause()
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![size, id, limit_to_sql(Some(limit))], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Total bytes of records with `hashed = false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn sum_unhashed_bytes(&self) -> StoreResult<u64> {
        self.sum_pending_bytes(PendingFilter::Unhashed)
    }

    /// Total bytes of records whose hash is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn sum_bytes_where_hash_empty(&self) -> StoreResult<u64> {
        self.sum_pending_bytes(PendingFilter::EmptyHash)
    }

    /// Total bytes of records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn sum_pending_bytes(&self, filter: PendingFilter) -> StoreResult<u64> {
        let sql = format!(
            "SELECT COALESCE(SUM(file_size), 0) FROM inventory WHERE {}",
            filter.where_clause()
        );
        let total: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(sql_to_size(total))
    }

    /// Number of records in the inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> StoreResult<u64> {
        self.count_where("1")
    }

    /// Number of records still waiting for a hash attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_unhashed(&self) -> StoreResult<u64> {
        self.count_where(PendingFilter::Unhashed.where_clause())
    }

    /// Number of records with an empty hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_hash_empty(&self) -> StoreResult<u64> {
        self.count_where(PendingFilter::EmptyHash.where_clause())
    }

    fn count_where(&self, clause: &str) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM inventory WHERE {clause}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(sql_to_size(count))
    }

    /// Number of records carrying `hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_by_hash(&self, hash: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM inventory WHERE file_hash = ?1",
            [hash],
            |row| row.get(0),
        )?;
        Ok(sql_to_size(count))
    }

    /// Whether any record carries `hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn has_hash(&self, hash: &str) -> StoreResult<bool> {
        let exists = self
            .conn
            .prepare_cached("SELECT EXISTS(SELECT 1 FROM inventory WHERE file_hash = ?1)")?
            .query_row([hash], |row| row.get(0))?;
        Ok(exists)
    }

    /// Records carrying `hash` in insertion order, at most `limit` of them
    /// (`None` for all).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn select_by_hash(&self, hash: &str, limit: Option<usize>) -> StoreResult<Vec<Record>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM inventory WHERE file_hash = ?1 ORDER BY id LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![hash, limit_to_sql(limit)], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Members of the duplicate group for `hash`: records with that hash and
    /// a non-zero size, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn select_group_members(&self, hash: &str) -> StoreResult<Vec<Record>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM inventory
             WHERE file_hash = ?1 AND file_size != 0 ORDER BY id"
        ))?;
        let rows = stmt.query_map([hash], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Fetches one record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> StoreResult<Option<Record>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM inventory WHERE id = ?1"),
                [id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Persists the hash state of one record.
    ///
    /// Only `content_hash` and `hashed` are written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no row has the record's id.
    pub fn update(&self, record: &Record) -> StoreResult<()> {
        let changed = self
            .conn
            .prepare_cached("UPDATE inventory SET file_hash = ?1, is_hashed = ?2 WHERE id = ?3")?
            .execute(params![record.content_hash, record.hashed, record.id])?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(record.id));
        }
        Ok(())
    }

    /// All `(hash, count)` pairs for non-empty hashes of non-empty files
    /// shared by more than one record, largest group first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn group_duplicates(&self) -> StoreResult<Vec<DuplicateCount>> {
        self.duplicate_page(None, None)
    }

    /// Next page of duplicate groups after `after`, ordered by
    /// `(count DESC, hash ASC)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn duplicate_page(
        &self,
        after: Option<&GroupCursor>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<DuplicateCount>> {
        let (count, hash) = after.map_or((i64::MAX, ""), |c| (size_to_sql(c.count), c.hash.as_str()));
        let mut stmt = self.conn.prepare_cached(
            "SELECT file_hash, COUNT(*) AS cnt FROM inventory
             WHERE file_size != 0 AND file_hash != ''
             GROUP BY file_hash
             HAVING cnt > 1 AND (cnt < ?1 OR (cnt = ?1 AND file_hash > ?2))
             ORDER BY cnt DESC, file_hash ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![count, hash, limit_to_sql(limit)], |row| {
            Ok(DuplicateCount {
                hash: row.get(0)?,
                count: sql_to_size(row.get(1)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Totals over all duplicate groups: group count, records in groups and
    /// the bytes held by all copies beyond the first of each group.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn duplicate_totals(&self) -> StoreResult<DuplicateTotals> {
        let totals = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(cnt), 0), COALESCE(SUM((cnt - 1) * size), 0)
             FROM (SELECT COUNT(*) AS cnt, MAX(file_size) AS size FROM inventory
                   WHERE file_size != 0 AND file_hash != ''
                   GROUP BY file_hash HAVING cnt > 1)",
            [],
            |row| {
                Ok(DuplicateTotals {
                    groups: sql_to_size(row.get(0)?),
                    duplicate_files: sql_to_size(row.get(1)?),
                    reclaimable_bytes: sql_to_size(row.get(2)?),
                })
            },
        )?;
        Ok(totals)
    }

    /// Deletes every record stored under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn delete_by_path(&self, path: &str) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM inventory WHERE file_path = ?1", [path])?;
        log::debug!("Deleted {} records for {}", removed, path);
        Ok(removed)
    }

    /// Deletes every record whose path belongs to a permanently failed
    /// record, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails; nothing is deleted then.
    pub fn purge_failed(&mut self) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM inventory WHERE file_path IN
                 (SELECT file_path FROM inventory WHERE is_hashed = 1 AND file_hash = '')",
            [],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        content_hash: row.get(1)?,
        file_name: row.get(2)?,
        file_path: row.get(3)?,
        file_size: sql_to_size(row.get(4)?),
        hashed: row.get(5)?,
    })
}

fn size_to_sql(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

fn sql_to_size(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// SQLite treats a negative LIMIT as unlimited.
fn limit_to_sql(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_with(records: &[(&str, u64)]) -> InventoryStore {
        let mut store = InventoryStore::open_in_memory().unwrap();
        let batch: Vec<NewRecord> = records
            .iter()
            .map(|(path, size)| NewRecord::new(*path, *size))
            .collect();
        for chunk in batch.chunks(DEFAULT_MAX_INSERT_BATCH) {
            store.insert_batch(chunk).unwrap();
        }
        store
    }

    fn set_hash(store: &InventoryStore, id: i64, hash: &str) {
        let mut rec = store.get(id).unwrap().unwrap();
        rec.content_hash = hash.to_string();
        rec.hashed = true;
        store.update(&rec).unwrap();
    }

    #[test]
    fn test_insert_starts_unhashed() {
        let store = store_with(&[("/a/one.txt", 10), ("/a/two.txt", 20)]);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.count_unhashed().unwrap(), 2);
        let rec = store.get(1).unwrap().unwrap();
        assert_eq!(rec.content_hash, "");
        assert!(!rec.hashed);
        assert_eq!(rec.file_name, "one.txt");
    }

    #[test]
    fn test_insert_rejects_oversized_batch() {
        let mut store = InventoryStore::open_in_memory()
            .unwrap()
            .with_max_insert_batch(2);
        let batch = vec![
            NewRecord::new("a", 1),
            NewRecord::new("b", 1),
            NewRecord::new("c", 1),
        ];
        let err = store.insert_batch(&batch).unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge { len: 3, max: 2 }));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_select_unhashed_largest_first() {
        let store = store_with(&[("small", 1), ("big", 300), ("mid", 20)]);
        let names: Vec<String> = store
            .select_unhashed(10)
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, vec!["big", "mid", "small"]);
    }

    #[test]
    fn test_select_pending_pages_with_ties() {
        let store = store_with(&[("a", 5), ("b", 5), ("c", 5), ("d", 1)]);
        let first = store
            .select_pending(PendingFilter::Unhashed, None, 2)
            .unwrap();
        assert_eq!(first.len(), 2);
        let cursor = first.last().unwrap().cursor();
        let second = store
            .select_pending(PendingFilter::Unhashed, Some(&cursor), 2)
            .unwrap();
        let names: Vec<&str> = first
            .iter()
            .chain(second.iter())
            .map(|r| r.file_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_sums_match_filters() {
        let store = store_with(&[("a", 100), ("b", 50), ("c", 7)]);
        assert_eq!(store.sum_unhashed_bytes().unwrap(), 157);
        set_hash(&store, 1, "h1");
        set_hash(&store, 2, "");
        assert_eq!(store.sum_unhashed_bytes().unwrap(), 7);
        assert_eq!(store.sum_bytes_where_hash_empty().unwrap(), 57);
        assert_eq!(store.count_hash_empty().unwrap(), 2);
    }

    #[test]
    fn test_sum_on_empty_store_is_zero() {
        let store = InventoryStore::open_in_memory().unwrap();
        assert_eq!(store.sum_unhashed_bytes().unwrap(), 0);
        assert_eq!(store.sum_bytes_where_hash_empty().unwrap(), 0);
    }

    #[test]
    fn test_has_hash_and_select_by_hash() {
        let store = store_with(&[("a", 1), ("b", 1), ("c", 1)]);
        for id in 1..=3 {
            set_hash(&store, id, "same");
        }
        assert!(store.has_hash("same").unwrap());
        assert!(!store.has_hash("other").unwrap());
        assert_eq!(store.select_by_hash("same", Some(2)).unwrap().len(), 2);
        assert_eq!(store.select_by_hash("same", None).unwrap().len(), 3);
        assert_eq!(store.count_by_hash("same").unwrap(), 3);
    }

    #[test]
    fn test_update_unknown_record() {
        let store = InventoryStore::open_in_memory().unwrap();
        let rec = Record {
            id: 99,
            content_hash: "x".into(),
            file_name: "x".into(),
            file_path: "x".into(),
            file_size: 1,
            hashed: true,
        };
        assert!(matches!(
            store.update(&rec),
            Err(StoreError::RecordNotFound(99))
        ));
    }

    #[test]
    fn test_group_duplicates_filters_and_orders() {
        let store = store_with(&[
            ("a", 100),
            ("b", 100),
            ("c", 50),
            ("d", 10),
            ("e", 10),
            ("f", 10),
            ("empty1", 0),
            ("empty2", 0),
        ]);
        set_hash(&store, 1, "h1");
        set_hash(&store, 2, "h1");
        set_hash(&store, 3, "h2");
        for id in 4..=6 {
            set_hash(&store, id, "h3");
        }
        set_hash(&store, 7, "e0");
        set_hash(&store, 8, "e0");

        let groups = store.group_duplicates().unwrap();
        assert_eq!(
            groups,
            vec![
                DuplicateCount {
                    hash: "h3".into(),
                    count: 3
                },
                DuplicateCount {
                    hash: "h1".into(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn test_group_duplicates_ignores_failed_records() {
        let store = store_with(&[("a", 100), ("b", 100)]);
        set_hash(&store, 1, "");
        set_hash(&store, 2, "");
        assert!(store.group_duplicates().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_totals() {
        let store = store_with(&[("a", 100), ("b", 100), ("c", 7), ("d", 7), ("e", 7), ("f", 3)]);
        set_hash(&store, 1, "h1");
        set_hash(&store, 2, "h1");
        for id in 3..=5 {
            set_hash(&store, id, "h2");
        }
        set_hash(&store, 6, "h3");

        let totals = store.duplicate_totals().unwrap();
        assert_eq!(totals.groups, 2);
        assert_eq!(totals.duplicate_files, 5);
        assert_eq!(totals.reclaimable_bytes, 100 + 2 * 7);
        assert_eq!(
            InventoryStore::open_in_memory().unwrap().duplicate_totals().unwrap(),
            DuplicateTotals::default()
        );
    }

    #[test]
    fn test_duplicate_page_continues_after_cursor() {
        let store = store_with(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        set_hash(&store, 1, "x");
        set_hash(&store, 2, "x");
        set_hash(&store, 3, "y");
        set_hash(&store, 4, "y");

        let first = store.duplicate_page(None, Some(1)).unwrap();
        assert_eq!(first[0].hash, "x");
        let second = store
            .duplicate_page(Some(&first[0].cursor()), Some(1))
            .unwrap();
        assert_eq!(second[0].hash, "y");
        let third = store
            .duplicate_page(Some(&second[0].cursor()), Some(1))
            .unwrap();
        assert!(third.is_empty());
    }

    #[test]
    fn test_delete_by_path() {
        let store = store_with(&[("/x/a", 1), ("/x/a", 1), ("/x/b", 1)]);
        assert_eq!(store.delete_by_path("/x/a").unwrap(), 2);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_purge_failed_removes_all_records_for_path() {
        let mut store = store_with(&[("/x/gone", 5), ("/x/gone", 5), ("/x/ok", 5), ("/x/new", 5)]);
        set_hash(&store, 1, "");
        set_hash(&store, 3, "h");
        assert_eq!(store.purge_failed().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);
        // unhashed records are not failures
        assert_eq!(store.count_unhashed().unwrap(), 1);
    }

    #[test]
    fn test_open_persists_between_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inv.db");
        {
            let mut store = InventoryStore::open(&path).unwrap();
            store.insert_batch(&[NewRecord::new("/f", 3)]).unwrap();
        }
        let store = InventoryStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(matches!(
            InventoryStore::open_existing(&path),
            Err(StoreError::Open { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_existing_rejects_foreign_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE things (x INTEGER);").unwrap();
        drop(conn);
        assert!(matches!(
            InventoryStore::open_existing(&path),
            Err(StoreError::NotAnInventory(_))
        ));
    }

    #[test]
    fn test_open_rejects_newer_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.db");
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
        drop(conn);
        assert!(matches!(
            InventoryStore::open(&path),
            Err(StoreError::SchemaVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_open_fails_in_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no/such/dir/inv.db");
        assert!(matches!(
            InventoryStore::open(&path),
            Err(StoreError::Open { .. })
        ));
    }
}
