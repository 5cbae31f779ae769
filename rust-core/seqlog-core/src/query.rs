// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Query specification algebra.
//
// A query is described by a list of `QuerySpec`s applied left-to-right to a
// default `QueryState`. Later specs override earlier ones of the same kind
// (two lower bounds: the last one wins). Contradictory combinations are
// rejected when the state is built, never during iteration.

use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, LogResult};
use crate::seq::Seq;

/// One option of a log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuerySpec {
    /// Exclusive lower bound.
    After(Seq),
    /// Inclusive lower bound.
    From(Seq),
    /// Exclusive upper bound.
    Until(Seq),
    /// Inclusive upper bound.
    Through(Seq),
    /// Cap the number of results. Negative means unbounded.
    Limit(i64),
    /// Iterate in descending order.
    Reverse,
    /// Block for new appends instead of ending the stream.
    Live,
}

impl QuerySpec {
    fn apply(self, state: &mut QueryState) {
        match self {
            QuerySpec::After(seq) => state.lower = Bound::Excluded(seq),
            QuerySpec::From(seq) => state.lower = Bound::Included(seq),
            QuerySpec::Until(seq) => state.upper = Bound::Excluded(seq),
            QuerySpec::Through(seq) => state.upper = Bound::Included(seq),
            QuerySpec::Limit(n) => state.limit = usize::try_from(n).ok(),
            QuerySpec::Reverse => state.reverse = true,
            QuerySpec::Live => state.live = true,
        }
    }
}

/// The accumulated result of applying a list of [`QuerySpec`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryState {
    pub lower: Bound<Seq>,
    pub upper: Bound<Seq>,
    /// `None` means unbounded.
    pub limit: Option<usize>,
    pub reverse: bool,
    pub live: bool,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            limit: None,
            reverse: false,
            live: false,
        }
    }
}

impl QueryState {
    /// Apply `specs` to a fresh default state and validate the result.
    pub fn build(specs: &[QuerySpec]) -> LogResult<Self> {
        let mut state = Self::default();
        for spec in specs {
            spec.apply(&mut state);
        }

        if state.reverse && state.live {
            return Err(LogError::InvalidQuery(
                "reverse and live cannot be combined".to_string(),
            ));
        }

        Ok(state)
    }

    /// The first position satisfying the lower bound.
    ///
    /// `None` when the bound excludes every position (`After` the last
    /// representable one).
    pub fn first(&self) -> Option<Seq> {
        match self.lower {
            Bound::Unbounded => Some(Seq::FIRST),
            Bound::Included(seq) if seq.is_empty() => Some(Seq::FIRST),
            Bound::Included(seq) => Some(seq),
            Bound::Excluded(seq) => seq.checked_next(),
        }
    }

    /// The last position satisfying the upper bound, `None` if unbounded.
    ///
    /// May be `Seq::EMPTY` when the bound excludes every position.
    pub fn last(&self) -> Option<Seq> {
        match self.upper {
            Bound::Unbounded => None,
            Bound::Included(seq) => Some(seq),
            Bound::Excluded(seq) => Some(seq.prev()),
        }
    }

    /// Whether `seq` lies within both bounds.
    pub fn contains(&self, seq: Seq) -> bool {
        self.first().is_some_and(|first| seq >= first)
            && self.last().map_or(true, |last| seq <= last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = QueryState::build(&[]).unwrap();
        assert_eq!(state, QueryState::default());
        assert_eq!(state.first(), Some(Seq::FIRST));
        assert_eq!(state.last(), None);
        assert_eq!(state.limit, None);
    }

    #[test]
    fn test_later_bounds_override_earlier() {
        let state = QueryState::build(&[
            QuerySpec::After(Seq::new(3)),
            QuerySpec::From(Seq::new(5)),
            QuerySpec::Through(Seq::new(9)),
            QuerySpec::Until(Seq::new(8)),
        ])
        .unwrap();
        assert_eq!(state.lower, Bound::Included(Seq::new(5)));
        assert_eq!(state.upper, Bound::Excluded(Seq::new(8)));
        assert_eq!(state.first(), Some(Seq::new(5)));
        assert_eq!(state.last(), Some(Seq::new(7)));
    }

    #[test]
    fn test_exclusive_lower_bound_on_empty_starts_at_first() {
        let state = QueryState::build(&[QuerySpec::After(Seq::EMPTY)]).unwrap();
        assert_eq!(state.first(), Some(Seq::FIRST));
    }

    #[test]
    fn test_exclusive_lower_bound_at_max_is_empty() {
        let state = QueryState::build(&[QuerySpec::After(Seq::new(i64::MAX))]).unwrap();
        assert_eq!(state.first(), None);
        assert!(!state.contains(Seq::new(i64::MAX)));
        assert!(!state.contains(Seq::FIRST));
    }

    #[test]
    fn test_negative_limit_is_unbounded() {
        let state = QueryState::build(&[QuerySpec::Limit(10), QuerySpec::Limit(-1)]).unwrap();
        assert_eq!(state.limit, None);
        let state = QueryState::build(&[QuerySpec::Limit(0)]).unwrap();
        assert_eq!(state.limit, Some(0));
    }

    #[test]
    fn test_reverse_and_live_rejected_in_any_order() {
        for specs in [
            vec![QuerySpec::Reverse, QuerySpec::Live],
            vec![QuerySpec::Live, QuerySpec::Limit(4), QuerySpec::Reverse],
            vec![QuerySpec::From(Seq::new(2)), QuerySpec::Reverse, QuerySpec::Live],
        ] {
            let err = QueryState::build(&specs).unwrap_err();
            assert!(matches!(err, LogError::InvalidQuery(_)));
        }
    }

    #[test]
    fn test_contains() {
        let state =
            QueryState::build(&[QuerySpec::After(Seq::new(1)), QuerySpec::Through(Seq::new(4))])
                .unwrap();
        assert!(!state.contains(Seq::new(1)));
        assert!(state.contains(Seq::new(2)));
        assert!(state.contains(Seq::new(4)));
        assert!(!state.contains(Seq::new(5)));
    }

    #[test]
    fn test_until_first_excludes_everything() {
        let state = QueryState::build(&[QuerySpec::Until(Seq::FIRST)]).unwrap();
        assert_eq!(state.last(), Some(Seq::EMPTY));
        assert!(!state.contains(Seq::FIRST));
    }
}
