//! Indicator trait and composition helpers.
//!
//! An indicator is a lazily evaluated function from an index to an
//! [`EvalResult`]. Derived indicators hold their sources by value; wrap a
//! source in `Rc` to share it between several dependents.

use crate::eval::EvalResult;
use crate::index::{seq_range, Sequence};
use std::rc::Rc;

/// Pull-based evaluation protocol.
///
/// # Monotonicity contract
/// Once `value(i)` has returned `Ready` or `Invalid` it must return the same
/// result for `i` forever. Only `Pending` may change, and only after more
/// data has been appended to some source.
pub trait Indicator {
    type Seq: Sequence;
    type Val;

    fn value(&self, seq: Self::Seq) -> EvalResult<Self::Val>;
}

impl<I: Indicator + ?Sized> Indicator for Rc<I> {
    type Seq = I::Seq;
    type Val = I::Val;

    #[inline]
    fn value(&self, seq: Self::Seq) -> EvalResult<Self::Val> {
        (**self).value(seq)
    }
}

impl<I: Indicator + ?Sized> Indicator for &I {
    type Seq = I::Seq;
    type Val = I::Val;

    #[inline]
    fn value(&self, seq: Self::Seq) -> EvalResult<Self::Val> {
        (**self).value(seq)
    }
}

impl<I: Indicator + ?Sized> Indicator for Box<I> {
    type Seq = I::Seq;
    type Val = I::Val;

    #[inline]
    fn value(&self, seq: Self::Seq) -> EvalResult<Self::Val> {
        (**self).value(seq)
    }
}

/// Adapters available on every indicator.
pub trait IndicatorExt: Indicator + Sized {
    /// Evaluate every index in `[from, to)`.
    fn eval_range(&self, from: Self::Seq, to: Self::Seq) -> Vec<(Self::Seq, EvalResult<Self::Val>)> {
        seq_range(from, to).map(|seq| (seq, self.value(seq))).collect()
    }

    fn map<F, U>(self, f: F) -> crate::combinator::Map<Self, F>
    where
        F: Fn(Self::Val) -> U,
    {
        crate::combinator::Map::new(self, f)
    }

    fn cached(self, capacity: usize) -> crate::transform::Cached<Self>
    where
        Self::Val: Clone,
    {
        crate::transform::Cached::new(self, capacity)
    }

    fn rolling<F, U>(self, size: usize, f: F) -> crate::transform::Rolling<Self, F, U>
    where
        F: Fn(&[Self::Val]) -> U,
    {
        crate::transform::Rolling::new(self, size, f)
    }

    fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }
}

impl<I: Indicator> IndicatorExt for I {}
