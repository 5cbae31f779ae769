// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// seqlog core primitives
//
// Shared vocabulary for every seqlog backend: sequence numbers, observable
// cells, the query specification algebra, cancellable streams, and the
// `Log` trait itself.
//
// # Modules
//
// - [`seq`] -- `Seq`, a log position with an `EMPTY` sentinel.
// - [`observable`] -- `Observable<T>`, a subscribable latest-value cell
//   that can be terminated.
// - [`query`] -- `QuerySpec` options folded into a validated `QueryState`.
// - [`stream`] -- the `Source` trait for pull-based, cancellable streams.
// - [`cursor`] -- bounds, direction and limit bookkeeping for streams.
// - [`log`] -- the `Log` backend trait.
// - [`error`] -- `LogError` and `LogResult`.

pub mod cursor;
pub mod error;
pub mod log;
pub mod observable;
pub mod query;
pub mod seq;
pub mod stream;

pub use cursor::Cursor;
pub use error::{LogError, LogResult};
pub use log::Log;
pub use observable::{Observable, Observed, Subscription, Terminal};
pub use query::{QuerySpec, QueryState};
pub use seq::Seq;
pub use stream::Source;

pub use tokio_util::sync::CancellationToken;
