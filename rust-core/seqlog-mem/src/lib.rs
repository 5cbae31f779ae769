// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory reference log for seqlog.
//
// Entries live in an arena indexed by sequence number, guarded by a single
// mutex. Appends assign the next sequence, publish it on the tail
// observable, and thereby wake every live reader parked on that
// observable.
//
// # Locking
//
// The arena mutex is held exactly while entries are read or written and is
// never held across an `.await`. A live reader that has caught up with the
// tail releases the lock, parks on its tail subscription, and re-takes the
// lock after waking. The subscription is taken before the reader first
// inspects the arena, so an append landing between "lock released" and
// "parked" still wakes it.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::trace;

use seqlog_core::{
    CancellationToken, Cursor, Log, LogError, LogResult, Observable, QuerySpec, QueryState, Seq,
    Source, Subscription,
};

/// One stored value and the sequence it was assigned.
#[derive(Debug)]
struct Entry<V> {
    seq: Seq,
    value: V,
}

#[derive(Debug)]
struct Shared<V> {
    /// `entries[i].seq == i` for every stored entry.
    entries: Mutex<Vec<Entry<V>>>,
    /// The newest assigned sequence, `Seq::EMPTY` before the first append.
    tail: Observable<Seq>,
}

impl<V> Shared<V> {
    fn lock(&self) -> LogResult<MutexGuard<'_, Vec<Entry<V>>>> {
        self.entries.lock().map_err(|_| LogError::LockPoisoned)
    }
}

/// Look up `seq` in the arena, enforcing the ordering invariant.
///
/// Panics if the slot for `seq` holds a different sequence: the arena is
/// corrupt and no later answer could be trusted.
fn entry_at<V>(entries: &[Entry<V>], seq: Seq) -> Option<&Entry<V>> {
    let entry = entries.get(seq.as_index()?)?;
    if entry.seq != seq {
        panic!(
            "memory log arena out of order: slot for {} holds {}",
            seq, entry.seq
        );
    }
    Some(entry)
}

/// An append-only log held entirely in process memory.
///
/// Clones share the same log.
///
/// # Example
///
/// ```rust
/// use seqlog_core::{CancellationToken, Log, QuerySpec, Seq, Source};
/// use seqlog_mem::MemoryLog;
///
/// # tokio_test::block_on(async {
/// let log = MemoryLog::new();
/// assert_eq!(log.append("a").await.unwrap(), Seq::new(0));
/// assert_eq!(log.append("b").await.unwrap(), Seq::new(1));
///
/// let mut src = log.query(&[QuerySpec::From(Seq::new(1))]).await.unwrap();
/// let cancel = CancellationToken::new();
/// assert_eq!(src.next(&cancel).await.unwrap(), Some("b"));
/// assert_eq!(src.next(&cancel).await.unwrap(), None);
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryLog<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for MemoryLog<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> MemoryLog<V> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(Vec::new()),
                tail: Observable::new(Seq::EMPTY),
            }),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> LogResult<usize> {
        Ok(self.shared.lock()?.len())
    }

    pub fn is_empty(&self) -> LogResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MemoryLog<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> Log for MemoryLog<V> {
    type Value = V;
    type Source = MemoryQuery<V>;

    async fn append(&self, value: V) -> LogResult<Seq> {
        let mut entries = self.shared.lock()?;
        let seq = Seq::from_index(entries.len());
        entries.push(Entry { seq, value });
        // Published while the lock is still held so readers never observe a
        // tail that is ahead of the arena.
        self.shared.tail.set(seq);
        trace!(seq = %seq, "appended to memory log");
        Ok(seq)
    }

    async fn get(&self, seq: Seq) -> LogResult<V> {
        let entries = self.shared.lock()?;
        entry_at(&entries, seq)
            .map(|entry| entry.value.clone())
            .ok_or(LogError::OutOfBounds(seq))
    }

    async fn query(&self, specs: &[QuerySpec]) -> LogResult<MemoryQuery<V>> {
        let state = QueryState::build(specs)?;
        // Subscribe before looking at the arena; see the module docs.
        let tail_rx = self.shared.tail.subscribe();

        let tail = Seq::from_index(self.shared.lock()?.len()).prev();

        Ok(MemoryQuery {
            shared: Arc::clone(&self.shared),
            cursor: Cursor::new(state, tail),
            tail_rx,
            closed: false,
        })
    }

    fn seq(&self) -> Observable<Seq> {
        self.shared.tail.clone()
    }
}

/// What a cursor found when it looked at the arena.
enum Step<V> {
    Yield(V),
    End,
    /// Caught up with the tail of a live query.
    Pending,
}

/// A stream over a [`MemoryLog`], created by [`Log::query`].
pub struct MemoryQuery<V> {
    shared: Arc<Shared<V>>,
    cursor: Cursor,
    tail_rx: Subscription<Seq>,
    closed: bool,
}

impl<V: Clone> MemoryQuery<V> {
    fn step(&mut self) -> LogResult<Step<V>> {
        let Some(seq) = self.cursor.position() else {
            return Ok(Step::End);
        };

        let entries = self.shared.lock()?;
        match entry_at(&entries, seq) {
            Some(entry) => {
                self.cursor.advance();
                Ok(Step::Yield(entry.value.clone()))
            }
            None if self.cursor.is_live() => Ok(Step::Pending),
            None => Ok(Step::End),
        }
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> Source for MemoryQuery<V> {
    type Item = V;

    async fn next(&mut self, cancel: &CancellationToken) -> LogResult<Option<V>> {
        if self.closed {
            return Err(LogError::StreamClosed);
        }

        loop {
            match self.step()? {
                Step::Yield(value) => return Ok(Some(value)),
                Step::End => return Ok(None),
                Step::Pending => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            self.closed = true;
                            return Err(LogError::Cancelled);
                        }
                        changed = self.tail_rx.changed() => {
                            if changed.is_none() {
                                return Ok(None);
                            }
                        }
                    }
                }
            }
        }
    }
}
