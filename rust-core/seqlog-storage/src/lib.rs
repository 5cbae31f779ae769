// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// seqlog persistence store
//
// The byte-keyed store the index engine persists its bitmaps into. The
// engine owns its store exclusively for its whole lifetime.
//
// # Modules
//
// - [`backend`] -- The `StorageBackend` trait: get, put, delete, list, close.
// - [`error`] -- The `StorageError` enum covering backend failure modes.
// - [`memory`] -- An in-memory `BTreeMap`-based backend for tests and
//   ephemeral indexes.
// - [`metrics`] -- A transparent wrapper that counts operations.
// - `redb_backend` -- A durable single-file backend (feature `redb-backend`).

pub mod backend;
pub mod error;
pub mod memory;
pub mod metrics;

// On-disk backend, behind the `redb-backend` feature.
#[cfg(feature = "redb-backend")]
pub mod redb_backend;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use memory::InMemoryBackend;
pub use metrics::{BackendStats, MetricsBackend};

#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;
