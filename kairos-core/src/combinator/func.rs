//! Pure function combinators.
//!
//! Status rule shared by every combinator: any `Pending` input makes the
//! result `Pending`; otherwise any `Invalid` input makes it `Invalid`;
//! otherwise the function is applied to the input values.

use crate::eval::EvalResult;
use crate::indicator::Indicator;
use std::marker::PhantomData;

/// One source, `f(value)`.
#[derive(Debug, Clone)]
pub struct Map<I, F> {
    source: I,
    f: F,
}

impl<I, F, U> Map<I, F>
where
    I: Indicator,
    F: Fn(I::Val) -> U,
{
    pub fn new(source: I, f: F) -> Self {
        Self { source, f }
    }
}

impl<I, F, U> Indicator for Map<I, F>
where
    I: Indicator,
    F: Fn(I::Val) -> U,
{
    type Seq = I::Seq;
    type Val = U;

    fn value(&self, seq: I::Seq) -> EvalResult<U> {
        self.source.value(seq).map(&self.f)
    }
}

/// Two sources of possibly different value types, `f(a, b)`.
#[derive(Debug, Clone)]
pub struct Func2<A, B, F> {
    a: A,
    b: B,
    f: F,
}

impl<A, B, F, U> Func2<A, B, F>
where
    A: Indicator,
    B: Indicator<Seq = A::Seq>,
    F: Fn(A::Val, B::Val) -> U,
{
    pub fn new(a: A, b: B, f: F) -> Self {
        Self { a, b, f }
    }
}

impl<A, B, F, U> Indicator for Func2<A, B, F>
where
    A: Indicator,
    B: Indicator<Seq = A::Seq>,
    F: Fn(A::Val, B::Val) -> U,
{
    type Seq = A::Seq;
    type Val = U;

    fn value(&self, seq: A::Seq) -> EvalResult<U> {
        self.a
            .value(seq)
            .zip(self.b.value(seq))
            .map(|(a, b)| (self.f)(a, b))
    }
}

/// Any number of same-typed sources, `f(&[values])` in source order.
pub struct FuncN<I, F, U> {
    sources: Vec<I>,
    f: F,
    _out: PhantomData<fn() -> U>,
}

impl<I, F, U> FuncN<I, F, U>
where
    I: Indicator,
    F: Fn(&[I::Val]) -> U,
{
    pub fn new(sources: Vec<I>, f: F) -> Self {
        assert!(!sources.is_empty(), "FuncN needs at least one source");
        Self {
            sources,
            f,
            _out: PhantomData,
        }
    }

    pub fn arity(&self) -> usize {
        self.sources.len()
    }
}

impl<I, F, U> Indicator for FuncN<I, F, U>
where
    I: Indicator,
    F: Fn(&[I::Val]) -> U,
{
    type Seq = I::Seq;
    type Val = U;

    fn value(&self, seq: I::Seq) -> EvalResult<U> {
        let inputs: EvalResult<Vec<I::Val>> = self.sources.iter().map(|s| s.value(seq)).collect();
        inputs.map(|vals| (self.f)(&vals))
    }
}
