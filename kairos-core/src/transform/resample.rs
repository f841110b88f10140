//! Granularity resample for time-indexed sources.
//!
//! Queried at the target granularity. Instants that also lie on the source
//! grid read the source and come back `Present`; instants in between are
//! `Absent`, with the status of the preceding source slot so the result is
//! still `Pending` beyond the source's known horizon.

use crate::eval::{EvalResult, Presence};
use crate::index::{Granularity, Time};
use crate::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Resample<I> {
    source: I,
    source_granularity: Granularity,
    target: Granularity,
}

impl<I: Indicator<Seq = Time>> Resample<I> {
    pub fn new(source: I, source_granularity: Granularity, target: Granularity) -> Self {
        Self {
            source,
            source_granularity,
            target,
        }
    }

    pub fn target(&self) -> Granularity {
        self.target
    }
}

impl<I: Indicator<Seq = Time>> Indicator for Resample<I> {
    type Seq = Time;
    type Val = Presence<I::Val>;

    fn value(&self, seq: Time) -> EvalResult<Presence<I::Val>> {
        debug_assert_eq!(seq.granularity(), self.target, "resample queried off its grid");
        match seq.try_with_granularity(self.source_granularity) {
            Some(on_grid) => self.source.value(on_grid).map(Presence::Present),
            None => {
                let g = self.source_granularity;
                let floor = Time::new(g.floor(seq.instant()), g);
                self.source.value(floor).map(|_| Presence::Absent)
            }
        }
    }
}
