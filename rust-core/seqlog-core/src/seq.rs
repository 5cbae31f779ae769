// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sequence numbers for append-only logs.
//
// A `Seq` addresses one entry of a log. Positions start at 0 and grow by
// exactly one per append. `Seq::EMPTY` sits before the first position and
// is never a valid stored position.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, LogResult};

/// A position in a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seq(i64);

impl Seq {
    /// The position before the first entry ("no position yet").
    pub const EMPTY: Seq = Seq(-1);

    /// The first position a log assigns.
    pub const FIRST: Seq = Seq(0);

    /// Wrap a raw position. Any negative value collapses to `EMPTY`.
    pub const fn new(raw: i64) -> Self {
        if raw < 0 {
            Self::EMPTY
        } else {
            Seq(raw)
        }
    }

    /// The raw signed value; `-1` for `EMPTY`.
    pub const fn raw(self) -> i64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 < 0
    }

    /// The position following this one. `EMPTY.next()` is `FIRST`.
    ///
    /// Saturates at `i64::MAX`; use [`Seq::checked_next`] where the end of
    /// the position space matters.
    pub const fn next(self) -> Seq {
        Seq(self.0.saturating_add(1))
    }

    /// The position following this one, or `None` past the last
    /// representable position.
    pub const fn checked_next(self) -> Option<Seq> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Seq(raw)),
            None => None,
        }
    }

    /// The position preceding this one. `FIRST.prev()` is `EMPTY`.
    pub const fn prev(self) -> Seq {
        Self::new(self.0 - 1)
    }

    /// Interpret the position as an index into an arena.
    ///
    /// Returns `None` for `EMPTY`.
    pub fn as_index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Build a position from an arena index.
    pub fn from_index(index: usize) -> Self {
        Seq(index as i64)
    }

    /// Convert to a 32-bit position, as used by bitmap-backed logs.
    pub fn to_u32(self) -> LogResult<u32> {
        u32::try_from(self.0).map_err(|_| LogError::SeqOutOfRange(self))
    }
}

impl Default for Seq {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<u32> for Seq {
    fn from(value: u32) -> Self {
        Seq(i64::from(value))
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("empty")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
