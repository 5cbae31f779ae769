// SPDX-License-Identifier: PMPL-1.0-or-later
//! Persistence and property tests for the index engine
//!
//! Runs the engine over both the in-memory and the redb store, closing and
//! reopening it to check that what was indexed is what comes back.

use std::collections::BTreeSet;

use proptest::prelude::*;
use roaring::RoaringBitmap;
use seqlog_core::{CancellationToken, Log, QuerySpec, Seq, Source};
use seqlog_multilog::codec::{self, Encoding};
use seqlog_multilog::{IndexKey, MultiLog, MultiLogConfig};
use seqlog_storage::{InMemoryBackend, RedbBackend, StorageBackend};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("seqlog_multilog=debug")
        .with_test_writer()
        .try_init();
}

/// Generate (key index, position) pairs over a handful of keys
fn arb_postings() -> impl Strategy<Value = Vec<(u8, u32)>> {
    prop::collection::vec((0u8..4, 0u32..5_000), 0..200)
}

fn key(i: u8) -> IndexKey {
    IndexKey::new(vec![b'k', i])
}

async fn members<B: StorageBackend + 'static>(mlog: &MultiLog<B>, key: IndexKey) -> Vec<u32> {
    let sublog = mlog.get(key).await.unwrap();
    sublog
        .members()
        .await
        .unwrap()
        .into_iter()
        .map(|seq| seq.to_u32().unwrap())
        .collect()
}

#[tokio::test]
async fn test_redb_round_trip_across_reopen() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.redb");

    {
        let mlog = MultiLog::open(RedbBackend::open(&path).unwrap());
        for seq in [1, 2, 3, 40, 41, 900] {
            mlog.index("author:alice", Seq::new(seq)).await.unwrap();
        }
        mlog.index("author:bob", Seq::new(7)).await.unwrap();
        mlog.close().await.unwrap();
    }

    let mlog = MultiLog::open(RedbBackend::open(&path).unwrap());
    assert_eq!(
        members(&mlog, "author:alice".into()).await,
        vec![1, 2, 3, 40, 41, 900]
    );
    assert_eq!(members(&mlog, "author:bob".into()).await, vec![7]);
    assert_eq!(
        mlog.list().await.unwrap(),
        vec![IndexKey::from("author:alice"), IndexKey::from("author:bob")]
    );
    mlog.close().await.unwrap();
}

#[tokio::test]
async fn test_redb_delete_is_durable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.redb");

    {
        let mlog = MultiLog::open(RedbBackend::open(&path).unwrap());
        mlog.index("gone", Seq::new(1)).await.unwrap();
        mlog.index("kept", Seq::new(2)).await.unwrap();
        mlog.flush().await.unwrap();
        mlog.delete("gone").await.unwrap();
        mlog.close().await.unwrap();
    }

    let mlog = MultiLog::open(RedbBackend::open(&path).unwrap());
    assert_eq!(mlog.list().await.unwrap(), vec![IndexKey::from("kept")]);
    assert!(members(&mlog, "gone".into()).await.is_empty());
    mlog.close().await.unwrap();
}

#[tokio::test]
async fn test_compressed_bitmap_survives_reopen() {
    init_tracing();
    let store = InMemoryBackend::new();

    {
        let mlog = MultiLog::open(store.clone());
        let sublog = mlog.get("dense").await.unwrap();
        for seq in 0..30_000 {
            sublog.append(Seq::new(seq)).await.unwrap();
        }
        sublog.append(Seq::new(100_000)).await.unwrap();
        assert_eq!(mlog.compress_all().await.unwrap(), 1);
        mlog.close().await.unwrap();
    }

    let raw = store
        .get(&IndexKey::from("dense").storage_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(codec::decode(&raw).unwrap().1, Encoding::Runs);

    let mlog = MultiLog::open(store);
    let sublog = mlog.get("dense").await.unwrap();
    assert_eq!(sublog.len().await.unwrap(), 30_001);
    assert_eq!(sublog.get(Seq::new(30_000)).await.unwrap(), Seq::new(100_000));

    // Writes after compaction keep the run-optimized encoding.
    sublog.append(Seq::new(100_001)).await.unwrap();
    let (bitmap, encoding) = codec::decode(&mlog.load_raw_bitmap("dense").await.unwrap()).unwrap();
    assert_eq!(encoding, Encoding::Runs);
    assert!(bitmap.contains(100_001));
}

#[tokio::test]
async fn test_compress_all_is_stable() {
    let mlog = MultiLog::open(InMemoryBackend::new());
    let sublog = mlog.get("dense").await.unwrap();
    for seq in 0..20_000 {
        sublog.append(Seq::new(seq)).await.unwrap();
    }

    assert_eq!(mlog.compress_all().await.unwrap(), 1);

    // Already run-optimized: compacting again produces the same bytes.
    let before = mlog.load_raw_bitmap("dense").await.unwrap();
    mlog.compress_all().await.unwrap();
    assert_eq!(mlog.load_raw_bitmap("dense").await.unwrap(), before);
    mlog.close().await.unwrap();
}

#[tokio::test]
async fn test_live_sublog_query_follows_indexing() {
    let mlog = MultiLog::open(InMemoryBackend::new());
    let sublog = mlog.get("topic").await.unwrap();
    let mut src = sublog.query(&[QuerySpec::Live, QuerySpec::Limit(5)]).await.unwrap();
    let cancel = CancellationToken::new();

    let reader = tokio::spawn(async move { src.collect_all(&cancel).await });
    for seq in [10, 20, 30, 40, 50, 60] {
        mlog.index("topic", Seq::new(seq)).await.unwrap();
        tokio::task::yield_now().await;
    }

    let got = reader.await.unwrap().unwrap();
    assert_eq!(
        got,
        [10, 20, 30, 40, 50].map(Seq::new).to_vec()
    );
}

#[tokio::test]
async fn test_custom_config_from_json() {
    let config: MultiLogConfig =
        serde_json::from_str(r#"{"flush_interval_ms": 250, "compress_threshold": 0}"#).unwrap();
    let mlog = MultiLog::open_with_config(InMemoryBackend::new(), config).unwrap();
    assert_eq!(mlog.config().flush_interval_ms, 250);

    mlog.index("tiny", Seq::new(0)).await.unwrap();
    mlog.index("tiny", Seq::new(1)).await.unwrap();
    // With no threshold even a tiny bitmap is compacted when it helps.
    assert_eq!(mlog.compress_all().await.unwrap(), 1);
    mlog.close().await.unwrap();
}

proptest! {
    #[test]
    fn test_reopen_reproduces_every_posting(postings in arb_postings()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store = InMemoryBackend::new();
            let mut expected: [BTreeSet<u32>; 4] = Default::default();

            let mlog = MultiLog::open(store.clone());
            for &(k, seq) in &postings {
                mlog.index(key(k), Seq::from(seq)).await.unwrap();
                expected[k as usize].insert(seq);
            }
            mlog.close().await.unwrap();

            let mlog = MultiLog::open(store);
            for (k, want) in expected.iter().enumerate() {
                let got = members(&mlog, key(k as u8)).await;
                prop_assert_eq!(got, want.iter().copied().collect::<Vec<_>>());
            }

            let listed = mlog.list().await.unwrap();
            let want_keys: Vec<IndexKey> = (0u8..4)
                .filter(|&k| !expected[k as usize].is_empty())
                .map(key)
                .collect();
            prop_assert_eq!(listed, want_keys);
            Ok(())
        })?;
    }

    #[test]
    fn test_compress_never_grows_stored_form(postings in arb_postings()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let config = MultiLogConfig::default().with_compress_threshold(0);
            let mlog = MultiLog::open_with_config(InMemoryBackend::new(), config).unwrap();
            for &(k, seq) in &postings {
                mlog.index(key(k), Seq::from(seq)).await.unwrap();
            }

            let keys = mlog.list().await.unwrap();
            let mut before = Vec::new();
            for k in &keys {
                before.push(mlog.load_raw_bitmap(k.clone()).await.unwrap());
            }

            mlog.compress_all().await.unwrap();

            for (k, old) in keys.iter().zip(&before) {
                let new = mlog.load_raw_bitmap(k.clone()).await.unwrap();
                prop_assert!(new.len() <= old.len());
                let (old_bitmap, _) = codec::decode(old).unwrap();
                let (new_bitmap, _): (RoaringBitmap, _) = codec::decode(&new).unwrap();
                prop_assert_eq!(old_bitmap, new_bitmap);
            }
            mlog.close().await.unwrap();
            Ok(())
        })?;
    }
}
