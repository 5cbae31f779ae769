// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Position bookkeeping shared by query streams.
//
// A `Cursor` walks the positions selected by a `QueryState` in the
// requested direction and counts down the limit. It knows nothing about
// storage: the stream asks it for the next position, looks that position
// up, and calls `advance` once a value was produced.

use crate::query::QueryState;
use crate::seq::Seq;

#[derive(Debug, Clone)]
pub struct Cursor {
    state: QueryState,
    /// `None` once the walk ran off the end of the position space.
    next: Option<Seq>,
    remaining: Option<usize>,
}

impl Cursor {
    /// Start a cursor for `state` over a log whose newest position is `tail`.
    ///
    /// `tail` only matters for reverse cursors, which start at the lower of
    /// the upper bound and the tail.
    pub fn new(state: QueryState, tail: Seq) -> Self {
        let next = if state.reverse {
            match state.last() {
                Some(last) if last < tail => Some(last),
                _ => Some(tail),
            }
        } else {
            state.first()
        };

        Self {
            state,
            next,
            remaining: state.limit,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state.live
    }

    /// The next position to read, or `None` once the bounds or the limit
    /// are exhausted.
    pub fn position(&self) -> Option<Seq> {
        let next = self.next?;
        if self.remaining == Some(0) || next.is_empty() {
            return None;
        }

        if self.state.reverse {
            let first = self.state.first()?;
            (next >= first).then_some(next)
        } else {
            match self.state.last() {
                Some(last) if next > last => None,
                _ => Some(next),
            }
        }
    }

    /// Record that the value at `position()` was produced.
    pub fn advance(&mut self) {
        let reverse = self.state.reverse;
        self.next = self
            .next
            .and_then(|seq| if reverse { Some(seq.prev()) } else { seq.checked_next() });
        if let Some(n) = self.remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QuerySpec;

    fn walk(specs: &[QuerySpec], tail: i64) -> Vec<i64> {
        let mut cursor = Cursor::new(QueryState::build(specs).unwrap(), Seq::new(tail));
        let mut out = Vec::new();
        while let Some(seq) = cursor.position() {
            if seq > Seq::new(tail) {
                break;
            }
            out.push(seq.raw());
            cursor.advance();
        }
        out
    }

    #[test]
    fn test_forward_walk() {
        assert_eq!(walk(&[], 3), vec![0, 1, 2, 3]);
        assert_eq!(walk(&[QuerySpec::After(Seq::new(1))], 3), vec![2, 3]);
        assert_eq!(walk(&[QuerySpec::Until(Seq::new(2))], 9), vec![0, 1]);
        assert_eq!(walk(&[QuerySpec::Limit(2)], 9), vec![0, 1]);
    }

    #[test]
    fn test_reverse_walk() {
        assert_eq!(walk(&[QuerySpec::Reverse], 3), vec![3, 2, 1, 0]);
        assert_eq!(
            walk(&[QuerySpec::Reverse, QuerySpec::Through(Seq::new(5))], 9),
            vec![5, 4, 3, 2, 1, 0]
        );
        assert_eq!(
            walk(&[QuerySpec::Reverse, QuerySpec::From(Seq::new(2)), QuerySpec::Limit(5)], 4),
            vec![4, 3, 2]
        );
    }

    #[test]
    fn test_bounds_at_end_of_position_space() {
        assert!(walk(&[QuerySpec::After(Seq::new(i64::MAX))], 3).is_empty());
        assert!(walk(&[QuerySpec::Reverse, QuerySpec::After(Seq::new(i64::MAX))], 3).is_empty());

        let mut cursor = Cursor::new(
            QueryState::build(&[QuerySpec::From(Seq::new(i64::MAX))]).unwrap(),
            Seq::EMPTY,
        );
        assert_eq!(cursor.position(), Some(Seq::new(i64::MAX)));
        cursor.advance();
        assert_eq!(cursor.position(), None);
    }

    #[test]
    fn test_empty_log_yields_nothing_in_reverse() {
        let cursor = Cursor::new(QueryState::build(&[QuerySpec::Reverse]).unwrap(), Seq::EMPTY);
        assert_eq!(cursor.position(), None);
    }

    #[test]
    fn test_forward_position_ignores_tail() {
        let cursor = Cursor::new(QueryState::default(), Seq::EMPTY);
        assert_eq!(cursor.position(), Some(Seq::FIRST));
    }
}
