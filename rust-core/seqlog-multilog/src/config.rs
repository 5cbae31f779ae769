// SPDX-License-Identifier: PMPL-1.0-or-later
//! Index engine configuration.
//!
//! Defaults:
//! - flush_interval_ms: 13000 (background write-back period)
//! - compress_threshold: 4096 bytes (smaller bitmaps are never compacted)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MultiLogError, MultiLogResult};

/// Configuration for a [`crate::MultiLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiLogConfig {
    /// Period of the background flush, in milliseconds.
    pub flush_interval_ms: u64,
    /// Minimum in-memory bitmap size, in bytes, before compaction is tried.
    pub compress_threshold: usize,
}

impl MultiLogConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_compress_threshold(mut self, bytes: usize) -> Self {
        self.compress_threshold = bytes;
        self
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> MultiLogResult<()> {
        if self.flush_interval_ms == 0 {
            return Err(MultiLogError::InvalidConfig(
                "flush_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MultiLogConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 13_000,
            compress_threshold: 4 * 1024,
        }
    }
}
