// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The secondary-index engine.
//
// A `MultiLog` maps index keys to bitmaps of log positions. Bitmaps are
// loaded from the store on first access, cached for the life of the engine,
// marked dirty on mutation, and written back by a background task on a
// fixed interval or explicitly by `flush`, `compress_all` and `close`.
//
// One `tokio::sync::Mutex` guards the whole registry and every cached
// bitmap. Each operation takes it for its full critical section, store I/O
// included, so a background flush never interleaves with a caller's
// operation.

use std::collections::HashMap;
use std::sync::Arc;

use roaring::RoaringBitmap;
use seqlog_core::{CancellationToken, Log, Observable, Seq, Terminal};
use seqlog_storage::StorageBackend;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::codec::{self, Encoding};
use crate::config::MultiLogConfig;
use crate::error::{MultiLogError, MultiLogResult};
use crate::key::IndexKey;
use crate::sublog::Sublog;

/// Cached state of one sublog.
pub(crate) struct SublogState {
    pub(crate) bitmap: RoaringBitmap,
    /// Encoding of the last write. Flushes keep runs only while they are
    /// no larger than plain.
    pub(crate) encoding: Encoding,
    /// True iff the bitmap changed since it was last written.
    pub(crate) dirty: bool,
    /// Publishes the newest member position, or the deleted terminal.
    pub(crate) seq: Observable<Seq>,
}

impl SublogState {
    fn new(bitmap: RoaringBitmap, encoding: Encoding) -> Self {
        let seq = Observable::new(Self::tail_of(&bitmap));
        Self {
            bitmap,
            encoding,
            dirty: false,
            seq,
        }
    }

    fn tail_of(bitmap: &RoaringBitmap) -> Seq {
        Seq::new(bitmap.len() as i64 - 1)
    }

    /// Position of the newest member, `Seq::EMPTY` when empty.
    pub(crate) fn tail(&self) -> Seq {
        Self::tail_of(&self.bitmap)
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) sublogs: HashMap<IndexKey, SublogState>,
}

/// State shared by the engine handle, its sublogs and the background writer.
pub(crate) struct Engine<B> {
    store: B,
    pub(crate) registry: Mutex<Registry>,
    config: MultiLogConfig,
}

impl<B: StorageBackend> Engine<B> {
    /// Return the cached sublog for `key`, loading or creating it first.
    ///
    /// Takes the registry by reference: the caller holds the lock.
    async fn open_sublog(
        &self,
        reg: &mut Registry,
        key: &IndexKey,
    ) -> MultiLogResult<Observable<Seq>> {
        if let Some(state) = reg.sublogs.get(key) {
            return Ok(state.seq.clone());
        }

        let state = match self.load_bitmap(key).await? {
            Some((bitmap, encoding)) => SublogState::new(bitmap, encoding),
            None => SublogState::new(RoaringBitmap::new(), Encoding::Plain),
        };
        debug!(key = %key, members = state.bitmap.len(), "opened sublog");

        let seq = state.seq.clone();
        reg.sublogs.insert(key.clone(), state);
        Ok(seq)
    }

    async fn load_bitmap(
        &self,
        key: &IndexKey,
    ) -> MultiLogResult<Option<(RoaringBitmap, Encoding)>> {
        let stored = self
            .store
            .get(&key.storage_key())
            .await
            .map_err(|e| MultiLogError::storage(key, "get", e))?;

        match stored {
            Some(bytes) => codec::decode(&bytes)
                .map(Some)
                .map_err(|e| MultiLogError::corruption(key, e)),
            None => Ok(None),
        }
    }

    /// Open every sublog the store knows about.
    async fn load_all(&self, reg: &mut Registry) -> MultiLogResult<()> {
        let stored = self
            .store
            .list_keys()
            .await
            .map_err(|source| MultiLogError::Store { op: "list", source })?;

        for raw in stored {
            let key = IndexKey::from_storage_key(&raw).map_err(|e| MultiLogError::Corruption {
                key: String::from_utf8_lossy(&raw).into_owned(),
                reason: format!("stored key is not hex: {e}"),
            })?;
            self.open_sublog(reg, &key).await?;
        }
        Ok(())
    }

    async fn write_state(&self, key: &IndexKey, state: &mut SublogState) -> MultiLogResult<()> {
        let encoding = write_encoding(&state.bitmap, state.encoding);
        if encoding != state.encoding {
            debug!(key = %key, ?encoding, "runs grew past plain, switching back");
        }

        let bytes =
            codec::encode(&state.bitmap, encoding).map_err(|e| MultiLogError::corruption(key, e))?;
        self.store
            .put(&key.storage_key(), &bytes)
            .await
            .map_err(|e| MultiLogError::storage(key, "put", e))?;
        state.encoding = encoding;
        state.dirty = false;
        Ok(())
    }

    /// Write every dirty sublog. Stops at the first failure; sublogs written
    /// before it stay written.
    async fn flush_locked(&self, reg: &mut Registry) -> MultiLogResult<usize> {
        let mut written = 0;
        for (key, state) in reg.sublogs.iter_mut() {
            if state.dirty {
                self.write_state(key, state).await?;
                written += 1;
            }
        }
        if written > 0 {
            debug!(written, "flushed dirty sublogs");
        }
        Ok(written)
    }

    async fn flush(&self) -> MultiLogResult<usize> {
        let mut reg = self.registry.lock().await;
        self.flush_locked(&mut reg).await
    }

    /// Rewrite `state` run-optimized if that does not grow it.
    ///
    /// `state` must be clean, so its current encoding is what the store
    /// holds. Returns whether a write happened.
    async fn compress(&self, key: &IndexKey, state: &mut SublogState) -> MultiLogResult<bool> {
        let in_memory = codec::memory_size(&state.bitmap);
        if in_memory < self.config.compress_threshold {
            return Ok(false);
        }

        let current = codec::encoded_len(&state.bitmap, state.encoding);
        let optimized = codec::encoded_len(&state.bitmap, Encoding::Runs);
        if optimized > current {
            debug!(key = %key, current, optimized, "run optimization would grow bitmap");
            return Ok(false);
        }

        let bytes = codec::encode(&state.bitmap, Encoding::Runs)
            .map_err(|e| MultiLogError::corruption(key, e))?;
        self.store
            .put(&key.storage_key(), &bytes)
            .await
            .map_err(|e| MultiLogError::storage(key, "put", e))?;
        state.encoding = Encoding::Runs;
        state.dirty = false;

        debug!(key = %key, before = current, after = optimized, "compressed sublog");
        Ok(true)
    }
}

/// The encoding a flush writes `bitmap` with.
///
/// A run-optimized sublog stays run-optimized only while that is no larger
/// than plain; members added since compaction may have scattered it.
fn write_encoding(bitmap: &RoaringBitmap, current: Encoding) -> Encoding {
    match current {
        Encoding::Runs
            if codec::encoded_len(bitmap, Encoding::Runs)
                > codec::encoded_len(bitmap, Encoding::Plain) =>
        {
            Encoding::Plain
        }
        other => other,
    }
}

/// A persisted set of per-key position bitmaps.
///
/// # Example
///
/// ```rust
/// use seqlog_core::{Log, Seq};
/// use seqlog_multilog::MultiLog;
/// use seqlog_storage::InMemoryBackend;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryBackend::new();
/// let mlog = MultiLog::open(store.clone());
///
/// let alice = mlog.get("alice").await.unwrap();
/// alice.append(Seq::new(3)).await.unwrap();
/// alice.append(Seq::new(8)).await.unwrap();
/// mlog.close().await.unwrap();
///
/// let reopened = MultiLog::open(store);
/// let alice = reopened.get("alice").await.unwrap();
/// assert_eq!(alice.members().await.unwrap(), vec![Seq::new(3), Seq::new(8)]);
/// # });
/// ```
pub struct MultiLog<B: StorageBackend + 'static> {
    engine: Arc<Engine<B>>,
    stop_tok: CancellationToken,
    writer: Option<JoinHandle<()>>,
}

impl<B: StorageBackend + 'static> MultiLog<B> {
    /// Open an engine over `store` with the default configuration.
    ///
    /// Spawns the background writer, so this must run inside a tokio
    /// runtime.
    pub fn open(store: B) -> Self {
        Self::start(store, MultiLogConfig::default())
    }

    pub fn open_with_config(store: B, config: MultiLogConfig) -> MultiLogResult<Self> {
        config.validate()?;
        Ok(Self::start(store, config))
    }

    fn start(store: B, config: MultiLogConfig) -> Self {
        info!(
            store = store.name(),
            flush_interval_ms = config.flush_interval_ms,
            "opening multilog"
        );
        let engine = Arc::new(Engine {
            store,
            registry: Mutex::new(Registry::default()),
            config,
        });
        let stop_tok = CancellationToken::new();
        let writer = spawn_writer(Arc::clone(&engine), stop_tok.clone());

        Self {
            engine,
            stop_tok,
            writer: Some(writer),
        }
    }

    /// Return the sublog for `key`, loading its bitmap on first access.
    ///
    /// A key with nothing stored starts out empty.
    pub async fn get(&self, key: impl Into<IndexKey>) -> MultiLogResult<Sublog<B>> {
        let key = key.into();
        let mut reg = self.engine.registry.lock().await;
        let seq = self.engine.open_sublog(&mut reg, &key).await?;
        Ok(Sublog::new(key, Arc::clone(&self.engine), seq))
    }

    /// Record that the entry at `seq` belongs to `key`.
    pub async fn index(&self, key: impl Into<IndexKey>, seq: Seq) -> MultiLogResult<Seq> {
        let sublog = self.get(key).await?;
        Ok(sublog.append(seq).await?)
    }

    /// Write every dirty sublog to the store.
    pub async fn flush(&self) -> MultiLogResult<()> {
        self.engine.flush().await.map(|_| ())
    }

    /// Run-optimize the stored bitmap of `key` if that does not grow it.
    ///
    /// Writes any pending changes of the sublog first. Returns whether the
    /// compacted form was written.
    pub async fn compress(&self, key: impl Into<IndexKey>) -> MultiLogResult<bool> {
        let key = key.into();
        let mut reg = self.engine.registry.lock().await;
        self.engine.open_sublog(&mut reg, &key).await?;

        let Some(state) = reg.sublogs.get_mut(&key) else {
            return Err(MultiLogError::NotFound(key.to_string()));
        };
        if state.dirty {
            self.engine.write_state(&key, state).await?;
        }
        self.engine.compress(&key, state).await
    }

    /// Compact every sublog, stored or cached.
    ///
    /// Pending changes are written first and every stored sublog is loaded,
    /// so nothing is compacted from stale data. Returns how many bitmaps
    /// were rewritten.
    pub async fn compress_all(&self) -> MultiLogResult<usize> {
        let mut reg = self.engine.registry.lock().await;

        self.engine.flush_locked(&mut reg).await?;
        self.engine.load_all(&mut reg).await?;

        let mut compressed = 0;
        for (key, state) in reg.sublogs.iter_mut() {
            let wrote = self
                .engine
                .compress(key, state)
                .await
                .map_err(|e| MultiLogError::Compress {
                    key: key.to_string(),
                    source: Box::new(e),
                })?;
            if wrote {
                compressed += 1;
            }
        }

        info!(sublogs = reg.sublogs.len(), compressed, "compressed all sublogs");
        Ok(compressed)
    }

    /// Drop `key` from the index.
    ///
    /// Open handles of the sublog see a terminal deleted state and fail
    /// every later operation. Deleting a key that was never stored is not an
    /// error.
    pub async fn delete(&self, key: impl Into<IndexKey>) -> MultiLogResult<()> {
        let key = key.into();
        let mut reg = self.engine.registry.lock().await;

        if let Some(state) = reg.sublogs.remove(&key) {
            state.seq.terminate(Terminal::SublogDeleted);
        }

        self.engine
            .store
            .delete(&key.storage_key())
            .await
            .map_err(|e| MultiLogError::storage(&key, "delete", e))?;

        debug!(key = %key, "deleted sublog");
        Ok(())
    }

    /// Every key with at least one member, stored or cached, sorted.
    pub async fn list(&self) -> MultiLogResult<Vec<IndexKey>> {
        let mut reg = self.engine.registry.lock().await;
        self.engine.load_all(&mut reg).await?;

        let mut keys: Vec<IndexKey> = reg
            .sublogs
            .iter()
            .filter(|(_, state)| !state.bitmap.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// The stored bytes of `key`'s bitmap, after flushing pending changes.
    pub async fn load_raw_bitmap(&self, key: impl Into<IndexKey>) -> MultiLogResult<Vec<u8>> {
        let key = key.into();
        self.flush().await?;

        self.engine
            .store
            .get(&key.storage_key())
            .await
            .map_err(|e| MultiLogError::storage(&key, "get", e))?
            .ok_or_else(|| MultiLogError::NotFound(key.to_string()))
    }

    /// The stored bitmap of `key`, decoded, after flushing pending changes.
    pub async fn load_bitmap(&self, key: impl Into<IndexKey>) -> MultiLogResult<RoaringBitmap> {
        let key = key.into();
        let raw = self.load_raw_bitmap(key.clone()).await?;
        codec::decode(&raw)
            .map(|(bitmap, _)| bitmap)
            .map_err(|e| MultiLogError::corruption(&key, e))
    }

    /// Number of sublogs currently cached.
    pub async fn cached_len(&self) -> usize {
        self.engine.registry.lock().await.sublogs.len()
    }

    pub fn config(&self) -> &MultiLogConfig {
        &self.engine.config
    }

    /// Stop the background writer, flush, and close the store.
    ///
    /// The writer has fully exited before the final flush starts, so no
    /// scheduled flush can race it.
    pub async fn close(mut self) -> MultiLogResult<()> {
        self.stop_tok.cancel();
        if let Some(writer) = self.writer.take() {
            writer
                .await
                .map_err(|e| MultiLogError::Shutdown(e.to_string()))?;
        }

        self.engine.flush().await?;
        self.engine
            .store
            .close()
            .await
            .map_err(|source| MultiLogError::Store { op: "close", source })?;

        info!("closed multilog");
        Ok(())
    }
}

impl<B: StorageBackend + 'static> Drop for MultiLog<B> {
    fn drop(&mut self) {
        // Without `close` the writer would tick forever.
        self.stop_tok.cancel();
    }
}

fn spawn_writer<B: StorageBackend + 'static>(
    engine: Arc<Engine<B>>,
    stop_tok: CancellationToken,
) -> JoinHandle<()> {
    let period = engine.config.flush_interval();
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop_tok.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // A missed tick is not fatal: close performs a final flush.
            if let Err(e) = engine.flush().await {
                warn!(error = %e, "background flush failed");
            }
        }
        debug!("multilog writer stopped");
    })
}
