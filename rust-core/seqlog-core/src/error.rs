// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types shared by every log backend.
//
// Reaching the end of a stream is not an error: `Source::next` returns
// `Ok(None)` for that case.

use thiserror::Error;

use crate::seq::Seq;

/// Errors that can occur when appending to, reading from, or querying a log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The requested sequence has never been written.
    #[error("sequence {0} is out of bounds")]
    OutOfBounds(Seq),

    /// The supplied query specs contradict each other.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A live-tail wait was interrupted by its cancellation token.
    #[error("query cancelled")]
    Cancelled,

    /// A stream that was cancelled earlier was polled again.
    #[error("stream is closed")]
    StreamClosed,

    /// The sublog behind this handle has been deleted.
    #[error("sublog deleted")]
    SublogDeleted,

    /// The sequence cannot be represented in this backend's position space.
    #[error("sequence {0} is outside the representable range")]
    SeqOutOfRange(Seq),

    /// A lock guarding the log was poisoned by a panicking writer.
    #[error("lock poisoned: internal concurrency error")]
    LockPoisoned,

    /// The backend failed for a reason outside the log contract.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience type alias for log results.
pub type LogResult<T> = Result<T, LogError>;
