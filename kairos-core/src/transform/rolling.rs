//! Fixed-size windows ending at the queried index.
//!
//! A window covering `[i - size + 1, i]` resolves as follows:
//! - earliest index `Invalid` or `Pending` → that status
//! - otherwise any `Pending` member wins over any `Invalid` member
//! - otherwise the values in index order

use crate::eval::EvalResult;
use crate::index::{seq_range, Sequence};
use crate::indicator::Indicator;
use std::marker::PhantomData;

/// The `size` indices of `source` ending at `end`.
pub struct Window<'a, I: Indicator> {
    source: &'a I,
    end: I::Seq,
    size: usize,
}

impl<'a, I: Indicator> Window<'a, I> {
    pub fn new(source: &'a I, end: I::Seq, size: usize) -> Self {
        debug_assert!(size >= 1, "window size must be >= 1");
        Self { source, end, size }
    }

    pub fn start(&self) -> I::Seq {
        self.end.advance(1 - self.size as i64)
    }

    pub fn values(&self) -> EvalResult<Vec<I::Val>> {
        let start = self.start();
        let first = crate::ready!(self.source.value(start));
        let rest: EvalResult<Vec<I::Val>> = seq_range(start.succ(), self.end.succ())
            .map(|seq| self.source.value(seq))
            .collect();
        rest.map(|tail| {
            let mut all = Vec::with_capacity(self.size);
            all.push(first);
            all.extend(tail);
            all
        })
    }
}

impl<'a, I: Indicator<Val = f64>> Window<'a, I> {
    pub fn sum(&self) -> EvalResult<f64> {
        self.values().map(|vals| vals.iter().sum())
    }

    pub fn mean(&self) -> EvalResult<f64> {
        let size = self.size as f64;
        self.sum().map(|total| total / size)
    }
}

/// Applies `f` to every full window of `size` values.
pub struct Rolling<I, F, U> {
    source: I,
    size: usize,
    f: F,
    _out: PhantomData<fn() -> U>,
}

impl<I, F, U> Rolling<I, F, U>
where
    I: Indicator,
    F: Fn(&[I::Val]) -> U,
{
    pub fn new(source: I, size: usize, f: F) -> Self {
        assert!(size >= 1, "Rolling window size must be >= 1");
        Self {
            source,
            size,
            f,
            _out: PhantomData,
        }
    }
}

impl<I, F, U> Indicator for Rolling<I, F, U>
where
    I: Indicator,
    F: Fn(&[I::Val]) -> U,
{
    type Seq = I::Seq;
    type Val = U;

    fn value(&self, seq: I::Seq) -> EvalResult<U> {
        Window::new(&self.source, seq, self.size)
            .values()
            .map(|vals| (self.f)(&vals))
    }
}
