//! Simple Moving Average (SMA).
//!
//! SMA[i] = mean(source[i - period + 1 ..= i]).
//! Invalid while the window reaches before the source start.

use super::rolling::Window;
use crate::eval::EvalResult;
use crate::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Sma<I> {
    source: I,
    period: usize,
}

impl<I: Indicator<Val = f64>> Sma<I> {
    pub fn new(source: I, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { source, period }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<I: Indicator<Val = f64>> Indicator for Sma<I> {
    type Seq = I::Seq;
    type Val = f64;

    fn value(&self, seq: I::Seq) -> EvalResult<f64> {
        Window::new(&self.source, seq, self.period).mean()
    }
}
