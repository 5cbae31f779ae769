// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistence store contract.
//
// The index engine keeps its bitmaps in a byte-keyed store supplied by the
// host. This trait is everything the engine needs from it: point reads and
// writes, idempotent deletes, a listing of every stored key, and close.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;

/// A pluggable key-value storage backend.
///
/// Keys and values are opaque byte slices. Implementations must be safe to
/// share across threads and tokio tasks.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieve the value associated with `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist, rather than an error.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a key-value pair, overwriting any previous value for `key`.
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete the value associated with `key`.
    ///
    /// Deleting an absent key succeeds. Returns whether the key existed.
    async fn delete(&self, key: &[u8]) -> Result<bool, StorageError>;

    /// Return every stored key in lexicographic order.
    async fn list_keys(&self) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Release the backend. Called once, after the last write. Every
    /// successful `put` or `delete` must already be durable by then.
    async fn close(&self) -> Result<(), StorageError>;

    /// A human-readable name for this backend, used in logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        (**self).delete(key).await
    }

    async fn list_keys(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        (**self).list_keys().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        (**self).close().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
