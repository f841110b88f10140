//! First difference: source[i] - source[i-1].

use crate::eval::EvalResult;
use crate::index::Sequence;
use crate::indicator::Indicator;
use std::ops::Sub;

#[derive(Debug, Clone)]
pub struct Slope<I> {
    source: I,
}

impl<I: Indicator> Slope<I> {
    pub fn new(source: I) -> Self {
        Self { source }
    }
}

impl<I> Indicator for Slope<I>
where
    I: Indicator,
    I::Val: Sub<Output = I::Val>,
{
    type Seq = I::Seq;
    type Val = I::Val;

    fn value(&self, seq: I::Seq) -> EvalResult<I::Val> {
        self.source
            .value(seq)
            .zip(self.source.value(seq.pred()))
            .map(|(cur, prev)| cur - prev)
    }
}
