// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for the secondary-index engine.
//
// Store failures carry the sublog key (rendered as hex) and the store
// operation that failed so a caller can tell which bitmap is affected.

use seqlog_core::LogError;
use seqlog_storage::StorageError;
use thiserror::Error;

use crate::codec::CodecError;
use crate::key::IndexKey;

/// Errors that can occur during index engine operations.
#[derive(Debug, Error)]
pub enum MultiLogError {
    /// A store operation on one sublog's bitmap failed.
    #[error("store {op} failed for sublog {key}: {source}")]
    Storage {
        key: String,
        op: &'static str,
        #[source]
        source: StorageError,
    },

    /// A store operation not tied to one key (listing, closing) failed.
    #[error("store {op} failed: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StorageError,
    },

    /// A persisted bitmap (or its stored key) could not be decoded.
    #[error("bitmap for sublog {key} is corrupt: {reason}")]
    Corruption { key: String, reason: String },

    /// No bitmap is stored for the key.
    #[error("no bitmap stored for sublog {0}")]
    NotFound(String),

    /// Compacting one sublog failed; `CompressAll` stopped there.
    #[error("compress of sublog {key} failed: {source}")]
    Compress {
        key: String,
        #[source]
        source: Box<MultiLogError>,
    },

    #[error("invalid multilog config: {0}")]
    InvalidConfig(String),

    /// The background writer did not shut down cleanly.
    #[error("background writer failed: {0}")]
    Shutdown(String),

    #[error(transparent)]
    Log(#[from] LogError),
}

impl MultiLogError {
    pub(crate) fn storage(key: &IndexKey, op: &'static str, source: StorageError) -> Self {
        Self::Storage {
            key: key.to_string(),
            op,
            source,
        }
    }

    pub(crate) fn corruption(key: impl ToString, source: CodecError) -> Self {
        Self::Corruption {
            key: key.to_string(),
            reason: source.to_string(),
        }
    }
}

/// Convenience type alias for index engine results.
pub type MultiLogResult<T> = Result<T, MultiLogError>;
