// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>
//
// redb-backed persistent storage backend for seqlog.
//
// Gives the index engine a durable, single-file home for its bitmaps so an
// index survives process restarts.
//
// # Design
//
// - Single redb `Database` file containing one table of bitmap blobs.
// - Every call runs on the blocking pool; redb transactions are synchronous.
// - Each put/delete is its own committed write transaction, so `close()`
//   has nothing left to persist.
// - A missing table means nothing was written yet; any other table error
//   is a backend failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use tracing::debug;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Keys and values are byte slices, matching the `StorageBackend` trait's
/// opaque byte interface.
const MAIN_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("bitmaps");

/// A persistent storage backend powered by redb.
///
/// redb is a pure-Rust embedded database with ACID transactions, copy-on-write
/// B-tree storage, and zero external dependencies. Each `RedbBackend` wraps a
/// single database file.
///
/// Thread-safe: `Database` is `Send + Sync` and handles internal locking.
///
/// # Example
///
/// ```rust,no_run
/// use seqlog_storage::redb_backend::RedbBackend;
/// use seqlog_storage::backend::StorageBackend;
///
/// # tokio_test::block_on(async {
/// let store = RedbBackend::open("/tmp/seqlog-index.redb").unwrap();
/// store.put(b"hello", b"world").await.unwrap();
/// let val = store.get(b"hello").await.unwrap();
/// assert_eq!(val, Some(b"world".to_vec()));
/// # });
/// ```
pub struct RedbBackend {
    /// The redb database handle.
    db: Arc<Database>,
    /// Path to the database file, for diagnostics.
    path: PathBuf,
}

impl RedbBackend {
    /// Open or create a redb database at the given path.
    ///
    /// Creates the file and parent directories if they don't exist. The main
    /// table is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }

        let db = Database::create(&path).map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "failed to open redb at {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), "opened redb backend");

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Return the filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish()
    }
}

impl RedbBackend {
    /// Run `op` against the database on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::BackendUnavailable(format!("task join: {e}")))?
    }

    /// Run `op` inside a write transaction and commit it.
    async fn write<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut redb::Table<'_, &'static [u8], &'static [u8]>) -> Result<T, StorageError>
            + Send
            + 'static,
    {
        self.blocking(move |db| {
            let txn = db
                .begin_write()
                .map_err(|e| StorageError::BackendUnavailable(format!("write txn: {e}")))?;
            let out = {
                let mut table = txn
                    .open_table(MAIN_TABLE)
                    .map_err(|e| StorageError::BackendUnavailable(format!("open table: {e}")))?;
                op(&mut table)?
            };
            txn.commit()
                .map_err(|e| StorageError::CorruptedData(format!("commit: {e}")))?;
            Ok(out)
        })
        .await
    }
}

/// Open the bitmap table for reading, or `None` before the first write.
fn open_read_table(
    txn: &redb::ReadTransaction,
) -> Result<Option<redb::ReadOnlyTable<&'static [u8], &'static [u8]>>, StorageError> {
    match txn.open_table(MAIN_TABLE) {
        Ok(table) => Ok(Some(table)),
        Err(TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(StorageError::BackendUnavailable(format!("open table: {e}"))),
    }
}

#[async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_vec();
        self.blocking(move |db| {
            let txn = db
                .begin_read()
                .map_err(|e| StorageError::BackendUnavailable(format!("read txn: {e}")))?;
            let Some(table) = open_read_table(&txn)? else {
                return Ok(None);
            };
            table
                .get(key.as_slice())
                .map(|found| found.map(|v| v.value().to_vec()))
                .map_err(|e| StorageError::CorruptedData(format!("get: {e}")))
        })
        .await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let key = key.to_vec();
        let value = value.to_vec();
        self.write(move |table| {
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(|e| StorageError::CorruptedData(format!("insert: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        let key = key.to_vec();
        self.write(move |table| {
            let removed = table
                .remove(key.as_slice())
                .map_err(|e| StorageError::CorruptedData(format!("remove: {e}")))?;
            Ok(removed.is_some())
        })
        .await
    }

    async fn list_keys(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        self.blocking(|db| {
            let txn = db
                .begin_read()
                .map_err(|e| StorageError::BackendUnavailable(format!("read txn: {e}")))?;
            let Some(table) = open_read_table(&txn)? else {
                return Ok(Vec::new());
            };

            let iter = table
                .iter()
                .map_err(|e| StorageError::CorruptedData(format!("key scan: {e}")))?;
            let mut keys = Vec::new();
            for entry in iter {
                let (k, _) =
                    entry.map_err(|e| StorageError::CorruptedData(format!("scan entry: {e}")))?;
                keys.push(k.value().to_vec());
            }
            Ok(keys)
        })
        .await
    }

    async fn close(&self) -> Result<(), StorageError> {
        // The file is released when the last handle drops.
        debug!(path = %self.path.display(), "closed redb backend");
        Ok(())
    }

    fn name(&self) -> &str {
        "redb"
    }
}
