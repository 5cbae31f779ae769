// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// seqlog secondary indexes
//
// A multilog answers "which entries of the main log carry key K?" with a
// compressed bitmap of main-log positions per key. Each key's bitmap is
// exposed as a `Sublog`, itself a log that can be read, queried and tailed
// live.
//
// # Modules
//
// - [`multilog`] -- The engine: sublog registry, background write-back,
//   flush, compaction, deletion and listing.
// - [`sublog`] -- `Sublog`, the per-key log view, and its query stream.
// - [`sink`] -- `index_log`, which tails a main log into a multilog.
// - [`codec`] -- Plain and run-optimized bitmap encodings.
// - [`key`] -- `IndexKey` and its hex store representation.
// - [`config`] -- `MultiLogConfig` (flush interval, compaction threshold).
// - [`error`] -- `MultiLogError` and `MultiLogResult`.

pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod multilog;
pub mod sink;
pub mod sublog;

pub use codec::Encoding;
pub use config::MultiLogConfig;
pub use error::{MultiLogError, MultiLogResult};
pub use key::IndexKey;
pub use multilog::MultiLog;
pub use sink::index_log;
pub use sublog::{Sublog, SublogQuery};
