// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage error types for the seqlog persistence layer.
//
// Missing keys are not errors: `get` returns `Ok(None)` and `delete` of an
// absent key succeeds. These variants cover the failures a caller cannot
// recover from locally.

use thiserror::Error;

/// Errors that can occur when interacting with a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend returned data it could not read back.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage backend is not available (e.g., the file could not be
    /// opened or a worker task died).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file gone");
        let err = StorageError::from(io_err);
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("file gone"));
    }

    #[test]
    fn test_corrupted_data_display() {
        let err = StorageError::CorruptedData("commit: disk full".to_string());
        assert_eq!(err.to_string(), "corrupted data: commit: disk full");
    }

    #[test]
    fn test_backend_unavailable_display() {
        let err = StorageError::BackendUnavailable("task join".to_string());
        assert!(err.to_string().contains("backend unavailable"));
    }
}
