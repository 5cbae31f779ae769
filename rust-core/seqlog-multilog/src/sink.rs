// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feeding a multilog from a main log.

use seqlog_core::{CancellationToken, Log, LogError, QuerySpec, Seq, Source};
use seqlog_storage::StorageBackend;
use tracing::{debug, info};

use crate::error::MultiLogResult;
use crate::key::IndexKey;
use crate::multilog::MultiLog;

/// Tail `log` live and index every entry after `after` under the keys
/// `extract` returns for it.
///
/// Entries are read in order, so the position of each value is one past
/// the previous. Runs until `cancel` fires or the log goes away, then
/// returns the last position indexed (`after` if none), which is where the
/// next call should resume. A failed index write stops the sink with that
/// error.
pub async fn index_log<L, B, F>(
    log: &L,
    mlog: &MultiLog<B>,
    after: Seq,
    extract: F,
    cancel: &CancellationToken,
) -> MultiLogResult<Seq>
where
    L: Log,
    B: StorageBackend + 'static,
    F: Fn(&L::Value) -> Vec<IndexKey> + Send + Sync,
{
    let mut src = log.query(&[QuerySpec::After(after), QuerySpec::Live]).await?;
    let mut last = after;
    info!(after = %after, "index sink started");

    loop {
        let value = match src.next(cancel).await {
            Ok(Some(value)) => value,
            Ok(None) | Err(LogError::Cancelled) => break,
            Err(e) => return Err(e.into()),
        };

        let seq = last.next();
        for key in extract(&value) {
            mlog.index(key, seq).await?;
        }
        last = seq;
    }

    debug!(last = %last, "index sink stopped");
    Ok(last)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use seqlog_mem::MemoryLog;
    use seqlog_storage::InMemoryBackend;

    use super::*;

    fn by_author(msg: &(String, String)) -> Vec<IndexKey> {
        vec![IndexKey::from(msg.0.as_str())]
    }

    async fn members(mlog: &MultiLog<InMemoryBackend>, key: &str) -> Vec<i64> {
        let sublog = mlog.get(key).await.unwrap();
        sublog
            .members()
            .await
            .unwrap()
            .into_iter()
            .map(Seq::raw)
            .collect()
    }

    fn msg(author: &str, body: &str) -> (String, String) {
        (author.to_string(), body.to_string())
    }

    #[tokio::test]
    async fn test_indexes_existing_and_new_entries() {
        let log = MemoryLog::new();
        log.append(msg("alice", "hi")).await.unwrap();
        log.append(msg("bob", "yo")).await.unwrap();
        log.append(msg("alice", "again")).await.unwrap();

        let mlog = Arc::new(MultiLog::open(InMemoryBackend::new()));
        let cancel = CancellationToken::new();

        let handle = {
            let (log, mlog, cancel) = (log.clone(), Arc::clone(&mlog), cancel.clone());
            tokio::spawn(
                async move { index_log(&log, &*mlog, Seq::EMPTY, by_author, &cancel).await },
            )
        };

        log.append(msg("bob", "late")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while members(&mlog, "bob").await != vec![1, 3] {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        cancel.cancel();

        let last = handle.await.unwrap().unwrap();
        assert_eq!(last, Seq::new(3));
        assert_eq!(members(&mlog, "alice").await, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_resumes_after_position() {
        let log = MemoryLog::new();
        for author in ["a", "b", "a", "b"] {
            log.append(msg(author, "")).await.unwrap();
        }

        let mlog = MultiLog::open(InMemoryBackend::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        // An already-cancelled token still drains what is present.
        let last = index_log(&log, &mlog, Seq::new(1), by_author, &cancel)
            .await
            .unwrap();
        assert_eq!(last, Seq::new(3));
        assert_eq!(members(&mlog, "a").await, vec![2]);
        assert_eq!(members(&mlog, "b").await, vec![3]);
    }

    #[tokio::test]
    async fn test_entry_without_keys_is_skipped() {
        let log = MemoryLog::new();
        log.append(msg("", "anonymous")).await.unwrap();
        log.append(msg("carol", "signed")).await.unwrap();

        let mlog = MultiLog::open(InMemoryBackend::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let extract = |m: &(String, String)| {
            if m.0.is_empty() {
                Vec::new()
            } else {
                by_author(m)
            }
        };
        let last = index_log(&log, &mlog, Seq::EMPTY, extract, &cancel)
            .await
            .unwrap();
        assert_eq!(last, Seq::new(1));
        assert_eq!(mlog.list().await.unwrap(), vec![IndexKey::from("carol")]);
    }
}
