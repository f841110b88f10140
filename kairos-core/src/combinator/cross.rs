//! Crossover detection between two sources.
//!
//! At each index the current ordering of `a` against `b` is compared with the
//! most recent strict ordering before it (equal stretches are skipped):
//! - below → above: `LtToGt`
//! - above → below: `GtToLt`
//! - same side, equal now, or no earlier strict ordering: `NotCrossed`

use super::compare::Compare;
use crate::eval::EvalResult;
use crate::index::Sequence;
use crate::indicator::Indicator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossState {
    NotCrossed,
    LtToGt,
    GtToLt,
}

impl CrossState {
    /// Signal code: 0, +1 or -1.
    pub fn code(self) -> i32 {
        match self {
            CrossState::NotCrossed => 0,
            CrossState::LtToGt => 1,
            CrossState::GtToLt => -1,
        }
    }

    fn between(before: Ordering, now: Ordering) -> CrossState {
        match (before, now) {
            (Ordering::Less, Ordering::Greater) => CrossState::LtToGt,
            (Ordering::Greater, Ordering::Less) => CrossState::GtToLt,
            _ => CrossState::NotCrossed,
        }
    }
}

impl From<CrossState> for i32 {
    fn from(state: CrossState) -> i32 {
        state.code()
    }
}

#[derive(Debug, Clone)]
pub struct Cross<A, B> {
    ordering: Compare<A, B>,
}

impl<A, B> Cross<A, B>
where
    A: Indicator,
    B: Indicator<Seq = A::Seq, Val = A::Val>,
    A::Val: PartialOrd,
{
    pub fn new(a: A, b: B) -> Self {
        Self {
            ordering: Compare::new(a, b),
        }
    }
}

impl<A, B> Indicator for Cross<A, B>
where
    A: Indicator,
    B: Indicator<Seq = A::Seq, Val = A::Val>,
    A::Val: PartialOrd,
{
    type Seq = A::Seq;
    type Val = CrossState;

    fn value(&self, seq: A::Seq) -> EvalResult<CrossState> {
        let now = crate::ready!(self.ordering.value(seq));
        if now == Ordering::Equal {
            return EvalResult::Ready(CrossState::NotCrossed);
        }

        let mut at = seq;
        loop {
            at = at.pred();
            match self.ordering.value(at) {
                EvalResult::Ready(Ordering::Equal) => continue,
                EvalResult::Ready(before) => return EvalResult::Ready(CrossState::between(before, now)),
                EvalResult::Invalid => return EvalResult::Ready(CrossState::NotCrossed),
                EvalResult::Pending => return EvalResult::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TickId;
    use crate::indicator::IndicatorExt;
    use crate::source::DenseSeries;

    #[test]
    fn crossover_codes() {
        let a = DenseSeries::from_vec(
            TickId(0),
            vec![0.0, 0.0, 2.0, 2.0, 0.0, 1.0, 1.0, 2.0, 1.0, 0.0],
        );
        let b = DenseSeries::from_vec(TickId(0), vec![1.0; 10]);
        let cross = Cross::new(&a, &b).map(CrossState::code);

        let out: Vec<_> = (0..11).map(|i| cross.value(TickId(i))).collect();
        let mut want: Vec<_> = [0, 0, 1, 0, -1, 0, 0, 1, 0, -1]
            .into_iter()
            .map(EvalResult::Ready)
            .collect();
        want.push(EvalResult::Pending);
        assert_eq!(out, want);
    }

    #[test]
    fn equal_stretch_is_skipped() {
        let a = DenseSeries::from_vec(TickId(0), vec![2.0, 1.0, 1.0, 1.0, 0.0]);
        let b = DenseSeries::from_vec(TickId(0), vec![1.0; 5]);
        let cross = Cross::new(&a, &b);
        assert_eq!(cross.value(TickId(4)), EvalResult::Ready(CrossState::GtToLt));
    }

    #[test]
    fn invalid_at_index_propagates() {
        let a = DenseSeries::from_vec(TickId(1), vec![2.0]);
        let b = DenseSeries::from_vec(TickId(0), vec![1.0, 1.0]);
        let cross = Cross::new(&a, &b);
        assert_eq!(cross.value(TickId(0)), EvalResult::Invalid);
        assert_eq!(cross.value(TickId(1)), EvalResult::Ready(CrossState::NotCrossed));
    }
}
