// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-key views of a multilog.
//
// A sublog is itself a log whose values are positions in the main log. Its
// own positions are ranks: position `i` holds the `i`-th smallest member.
// When members are appended in increasing order (the normal indexing
// pattern) ranks never shift, so a sublog reads exactly like an
// append-only log of main-log positions.

use std::sync::Arc;

use async_trait::async_trait;
use seqlog_core::{
    CancellationToken, Cursor, Log, LogError, LogResult, Observable, Observed, QuerySpec,
    QueryState, Seq, Source, Subscription,
};
use seqlog_storage::StorageBackend;
use tracing::trace;

use crate::key::IndexKey;
use crate::multilog::{Engine, Registry, SublogState};

/// A handle on the bitmap of one index key.
///
/// Obtained from [`MultiLog::get`](crate::MultiLog::get). Every handle for
/// the same key shares one bitmap. Once the key is deleted the handle fails
/// with [`LogError::SublogDeleted`], even if the key is later recreated.
pub struct Sublog<B: StorageBackend + 'static> {
    key: IndexKey,
    engine: Arc<Engine<B>>,
    seq: Observable<Seq>,
}

impl<B: StorageBackend + 'static> Clone for Sublog<B> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            engine: Arc::clone(&self.engine),
            seq: self.seq.clone(),
        }
    }
}

impl<B: StorageBackend + 'static> Sublog<B> {
    pub(crate) fn new(key: IndexKey, engine: Arc<Engine<B>>, seq: Observable<Seq>) -> Self {
        Self { key, engine, seq }
    }

    pub fn key(&self) -> &IndexKey {
        &self.key
    }

    pub fn is_deleted(&self) -> bool {
        self.seq.is_terminated()
    }

    fn state<'r>(&self, reg: &'r Registry) -> LogResult<&'r SublogState> {
        if self.is_deleted() {
            return Err(LogError::SublogDeleted);
        }
        reg.sublogs.get(&self.key).ok_or(LogError::SublogDeleted)
    }

    fn state_mut<'r>(&self, reg: &'r mut Registry) -> LogResult<&'r mut SublogState> {
        if self.is_deleted() {
            return Err(LogError::SublogDeleted);
        }
        reg.sublogs.get_mut(&self.key).ok_or(LogError::SublogDeleted)
    }

    /// Whether the main-log position `seq` is a member.
    pub async fn contains(&self, seq: Seq) -> LogResult<bool> {
        let Ok(member) = u32::try_from(seq.raw()) else {
            return Ok(false);
        };
        let reg = self.engine.registry.lock().await;
        Ok(self.state(&reg)?.bitmap.contains(member))
    }

    /// Number of members.
    pub async fn len(&self) -> LogResult<u64> {
        let reg = self.engine.registry.lock().await;
        Ok(self.state(&reg)?.bitmap.len())
    }

    pub async fn is_empty(&self) -> LogResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Every member in ascending order.
    pub async fn members(&self) -> LogResult<Vec<Seq>> {
        let reg = self.engine.registry.lock().await;
        Ok(self.state(&reg)?.bitmap.iter().map(Seq::from).collect())
    }

    /// Whether the sublog has changes not yet written to the store.
    pub async fn is_dirty(&self) -> LogResult<bool> {
        let reg = self.engine.registry.lock().await;
        Ok(self.state(&reg)?.dirty)
    }
}

#[async_trait]
impl<B: StorageBackend + 'static> Log for Sublog<B> {
    type Value = Seq;
    type Source = SublogQuery<B>;

    /// Add the main-log position `value` and return its rank.
    ///
    /// Adding an existing member changes nothing and returns its rank.
    async fn append(&self, value: Seq) -> LogResult<Seq> {
        let member = value.to_u32()?;
        let mut reg = self.engine.registry.lock().await;
        let state = self.state_mut(&mut reg)?;

        if state.bitmap.insert(member) {
            state.dirty = true;
            state.seq.set(state.tail());
            trace!(key = %self.key, member, "indexed");
        }
        Ok(Seq::new(state.bitmap.rank(member) as i64 - 1))
    }

    /// The member at rank `seq`.
    async fn get(&self, seq: Seq) -> LogResult<Seq> {
        let reg = self.engine.registry.lock().await;
        let state = self.state(&reg)?;
        u32::try_from(seq.raw())
            .ok()
            .and_then(|rank| state.bitmap.select(rank))
            .map(Seq::from)
            .ok_or(LogError::OutOfBounds(seq))
    }

    /// Stream members by rank.
    ///
    /// Bounds address ranks, not member values. A live query waits for new
    /// members and fails with [`LogError::SublogDeleted`] when the key is
    /// deleted.
    async fn query(&self, specs: &[QuerySpec]) -> LogResult<SublogQuery<B>> {
        let state = QueryState::build(specs)?;
        let reg = self.engine.registry.lock().await;
        let tail = self.state(&reg)?.tail();
        // Appends publish under the registry lock, so subscribing here
        // cannot miss one.
        let rx = self.seq.subscribe();
        drop(reg);

        Ok(SublogQuery {
            sublog: self.clone(),
            cursor: Cursor::new(state, tail),
            rx,
            closed: false,
        })
    }

    fn seq(&self) -> Observable<Seq> {
        self.seq.clone()
    }
}

/// A stream over a [`Sublog`], created by [`Log::query`].
pub struct SublogQuery<B: StorageBackend + 'static> {
    sublog: Sublog<B>,
    cursor: Cursor,
    rx: Subscription<Seq>,
    closed: bool,
}

impl<B: StorageBackend + 'static> SublogQuery<B> {
    async fn lookup(&self, rank: Seq) -> LogResult<Option<Seq>> {
        let reg = self.sublog.engine.registry.lock().await;
        let state = self.sublog.state(&reg)?;
        Ok(u32::try_from(rank.raw())
            .ok()
            .and_then(|rank| state.bitmap.select(rank))
            .map(Seq::from))
    }
}

#[async_trait]
impl<B: StorageBackend + 'static> Source for SublogQuery<B> {
    type Item = Seq;

    async fn next(&mut self, cancel: &CancellationToken) -> LogResult<Option<Seq>> {
        if self.closed {
            return Err(LogError::StreamClosed);
        }

        loop {
            let Some(rank) = self.cursor.position() else {
                return Ok(None);
            };

            match self.lookup(rank).await? {
                Some(member) => {
                    self.cursor.advance();
                    return Ok(Some(member));
                }
                None if !self.cursor.is_live() => return Ok(None),
                None => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.closed = true;
                    return Err(LogError::Cancelled);
                }
                changed = self.rx.changed() => match changed {
                    Some(Observed::Terminated(terminal)) => return Err(terminal.to_error()),
                    Some(Observed::Value(_)) => {}
                    None => return Ok(None),
                },
            }
        }
    }
}
