// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Counting wrapper for seqlog stores.
//
// Puts a tally in front of any `StorageBackend` so callers can see how
// often the index engine touches its store, e.g. how many writes a flush
// or a compaction issued.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Store calls seen by a [`MetricsBackend`] since it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub get_count: u64,
    pub put_count: u64,
    pub delete_count: u64,
    pub list_count: u64,
    pub close_count: u64,
    /// Value bytes handed back by `get` hits.
    pub total_bytes_read: u64,
    /// Value bytes of `put`s the inner store accepted.
    pub total_bytes_written: u64,
}

/// Forwards every call to an inner store and tallies it.
///
/// Calls are counted whether or not they succeed; byte totals only move
/// on success.
///
/// # Example
///
/// ```rust
/// use seqlog_storage::memory::InMemoryBackend;
/// use seqlog_storage::metrics::MetricsBackend;
/// use seqlog_storage::backend::StorageBackend;
///
/// # tokio_test::block_on(async {
/// let metered = MetricsBackend::new(InMemoryBackend::new());
/// metered.put(b"bitmap", b"\x00").await.unwrap();
/// metered.get(b"bitmap").await.unwrap();
///
/// let stats = metered.stats().await;
/// assert_eq!((stats.get_count, stats.put_count), (1, 1));
/// # });
/// ```
pub struct MetricsBackend<B: StorageBackend> {
    inner: B,
    stats: Arc<RwLock<BackendStats>>,
}

impl<B: StorageBackend> MetricsBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            stats: Arc::default(),
        }
    }

    /// Copy of the tallies so far.
    pub async fn stats(&self) -> BackendStats {
        self.stats.read().await.clone()
    }

    async fn record(&self, update: impl FnOnce(&mut BackendStats)) {
        update(&mut *self.stats.write().await);
    }
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for MetricsBackend<B> {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let found = self.inner.get(key).await;
        let read = match &found {
            Ok(Some(value)) => value.len() as u64,
            _ => 0,
        };
        self.record(|s| {
            s.get_count += 1;
            s.total_bytes_read += read;
        })
        .await;
        found
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let outcome = self.inner.put(key, value).await;
        let written = if outcome.is_ok() { value.len() as u64 } else { 0 };
        self.record(|s| {
            s.put_count += 1;
            s.total_bytes_written += written;
        })
        .await;
        outcome
    }

    async fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        self.record(|s| s.delete_count += 1).await;
        self.inner.delete(key).await
    }

    async fn list_keys(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        self.record(|s| s.list_count += 1).await;
        self.inner.list_keys().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.record(|s| s.close_count += 1).await;
        self.inner.close().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
