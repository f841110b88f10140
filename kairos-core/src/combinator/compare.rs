//! Pointwise ordering of two sources.

use crate::eval::EvalResult;
use crate::indicator::Indicator;
use std::cmp::Ordering;

/// `a(i)` compared to `b(i)`. Unordered values (NaN) are Invalid.
#[derive(Debug, Clone)]
pub struct Compare<A, B> {
    a: A,
    b: B,
}

impl<A, B> Compare<A, B>
where
    A: Indicator,
    B: Indicator<Seq = A::Seq, Val = A::Val>,
    A::Val: PartialOrd,
{
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A, B> Indicator for Compare<A, B>
where
    A: Indicator,
    B: Indicator<Seq = A::Seq, Val = A::Val>,
    A::Val: PartialOrd,
{
    type Seq = A::Seq;
    type Val = Ordering;

    fn value(&self, seq: A::Seq) -> EvalResult<Ordering> {
        self.a
            .value(seq)
            .zip(self.b.value(seq))
            .and_then(|(a, b)| match a.partial_cmp(&b) {
                Some(ord) => EvalResult::Ready(ord),
                None => EvalResult::Invalid,
            })
    }
}
