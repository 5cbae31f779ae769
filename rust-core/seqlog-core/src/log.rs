// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The log backend contract.

use async_trait::async_trait;

use crate::error::LogResult;
use crate::observable::Observable;
use crate::query::QuerySpec;
use crate::seq::Seq;
use crate::stream::Source;

/// An append-only, sequence-addressed log.
///
/// Sequences are assigned by `append` in strictly increasing order without
/// gaps, starting at `Seq::FIRST`. Values are opaque to the log.
///
/// Backends must honour `QuerySpec::Limit` and, if they accept
/// `QuerySpec::Live`, the live-tail contract of [`Source::next`]. They may
/// reject other specs with `LogError::InvalidQuery`.
#[async_trait]
pub trait Log: Send + Sync {
    type Value: Clone + Send + Sync + 'static;
    type Source: Source<Item = Self::Value>;

    /// Append `value` and return the sequence assigned to it.
    async fn append(&self, value: Self::Value) -> LogResult<Seq>;

    /// Fetch the value stored at `seq`.
    ///
    /// Fails with `LogError::OutOfBounds` if nothing was written there.
    async fn get(&self, seq: Seq) -> LogResult<Self::Value>;

    /// Open a stream over the entries selected by `specs`.
    async fn query(&self, specs: &[QuerySpec]) -> LogResult<Self::Source>;

    /// The observable tracking the newest sequence of the log.
    fn seq(&self) -> Observable<Seq>;
}
