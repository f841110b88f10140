//! Envelope band: source scaled by `1 + deviation`.

use crate::eval::EvalResult;
use crate::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Envelope<I> {
    source: I,
    factor: f64,
}

impl<I: Indicator<Val = f64>> Envelope<I> {
    /// `deviation` is a fraction: 0.02 puts the band 2% above the source.
    pub fn new(source: I, deviation: f64) -> Self {
        Self {
            source,
            factor: 1.0 + deviation,
        }
    }

    pub fn from_percent(source: I, percent: f64) -> Self {
        Self::new(source, percent / 100.0)
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl<I: Indicator<Val = f64>> Indicator for Envelope<I> {
    type Seq = I::Seq;
    type Val = f64;

    fn value(&self, seq: I::Seq) -> EvalResult<f64> {
        self.source.value(seq).map(|v| v * self.factor)
    }
}
