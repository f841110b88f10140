//! Index domains.
//!
//! Every indicator is addressed by a discrete, totally ordered key that can be
//! stepped by whole units in its own domain:
//! - `Time`: an instant aligned to a fixed granularity
//! - `TransactionId`: monotonically increasing transaction identifier
//! - `TickId`: monotonically increasing tick sequence number

pub mod ids;
pub mod time;

pub use ids::{TickId, TransactionId};
pub use time::{Granularity, Time};

use std::fmt::Debug;
use std::hash::Hash;

/// Ordered discrete key type.
///
/// `advance(n)` moves by `n` whole steps (negative steps move backwards).
/// `distance_from(origin)` is the inverse: the number of steps from `origin`
/// to `self`. Both assume the two keys live on the same grid.
pub trait Sequence: Copy + Ord + Hash + Debug {
    fn advance(self, n: i64) -> Self;

    fn distance_from(&self, origin: &Self) -> i64;

    fn succ(self) -> Self {
        self.advance(1)
    }

    fn pred(self) -> Self {
        self.advance(-1)
    }
}

/// Iterate `from` (inclusive) up to `to` (exclusive) in single steps.
pub fn seq_range<S: Sequence>(from: S, to: S) -> SeqRange<S> {
    SeqRange {
        current: from,
        end: to,
    }
}

/// Iterator returned by [`seq_range`].
#[derive(Debug, Clone)]
pub struct SeqRange<S> {
    current: S,
    end: S,
}

impl<S: Sequence> Iterator for SeqRange<S> {
    type Item = S;

    fn next(&mut self) -> Option<S> {
        if self.current >= self.end {
            return None;
        }
        let item = self.current;
        self.current = self.current.advance(1);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_range_is_half_open() {
        let ids: Vec<_> = seq_range(TickId(3), TickId(6)).collect();
        assert_eq!(ids, vec![TickId(3), TickId(4), TickId(5)]);
    }

    #[test]
    fn seq_range_empty_when_reversed() {
        assert_eq!(seq_range(TickId(6), TickId(3)).count(), 0);
    }

    #[test]
    fn seq_range_over_time_steps_by_granularity() {
        let g = Granularity::S5;
        let from = Time::new(0, g);
        let instants: Vec<_> = seq_range(from, from.advance(3))
            .map(|t| t.instant())
            .collect();
        assert_eq!(instants, vec![0, 5, 10]);
    }
}
