// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pull-based, cancellable streams.
//
// A `Source` produces values one at a time. `next` returns `Ok(Some(v))`
// for the next in-range value, `Ok(None)` at end of stream, and may park
// when live-tailing until a new value arrives or the cancellation token
// fires. Sources are single-consumer and forward-only.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::LogResult;

#[async_trait]
pub trait Source: Send {
    type Item: Send;

    /// Produce the next value.
    ///
    /// After a `LogError::Cancelled` the source is unusable and every later
    /// call fails with `LogError::StreamClosed`.
    async fn next(&mut self, cancel: &CancellationToken) -> LogResult<Option<Self::Item>>;

    /// Drain every remaining value. Never returns for a live source unless
    /// `cancel` fires.
    async fn collect_all(&mut self, cancel: &CancellationToken) -> LogResult<Vec<Self::Item>> {
        let mut out = Vec::new();
        while let Some(item) = self.next(cancel).await? {
            out.push(item);
        }
        Ok(out)
    }
}
