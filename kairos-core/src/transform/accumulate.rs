//! Stateful left scan over a source.
//!
//! Starting at `start` with an initial state, each source value is folded
//! into the state and the fold's output is emitted for that index. Emitted
//! values are buffered, so every index is folded exactly once.

use crate::eval::EvalResult;
use crate::index::Sequence;
use crate::indicator::Indicator;
use crate::source::DenseSeries;
use std::cell::RefCell;

pub struct Accumulate<I: Indicator, St, O, F> {
    source: I,
    state: RefCell<St>,
    fold: RefCell<F>,
    emitted: DenseSeries<I::Seq, O>,
}

impl<I, St, O, F> Accumulate<I, St, O, F>
where
    I: Indicator,
    O: Clone,
    F: FnMut(&mut St, I::Val) -> O,
{
    pub fn new(source: I, start: I::Seq, init: St, fold: F) -> Self {
        Self {
            source,
            state: RefCell::new(init),
            fold: RefCell::new(fold),
            emitted: DenseSeries::new(start),
        }
    }

    pub fn start(&self) -> I::Seq {
        self.emitted.offset()
    }

    /// First index not yet folded.
    pub fn cursor(&self) -> I::Seq {
        self.emitted.end()
    }
}

impl<I, St, O, F> Indicator for Accumulate<I, St, O, F>
where
    I: Indicator,
    O: Clone,
    F: FnMut(&mut St, I::Val) -> O,
{
    type Seq = I::Seq;
    type Val = O;

    fn value(&self, seq: I::Seq) -> EvalResult<O> {
        match self.emitted.value(seq) {
            EvalResult::Pending => {}
            settled => return settled,
        }

        let mut state = self.state.borrow_mut();
        let mut fold = self.fold.borrow_mut();
        let mut at = self.emitted.end();
        while at <= seq {
            let next = crate::ready!(self.source.value(at));
            self.emitted.append((&mut *fold)(&mut *state, next));
            at = at.succ();
        }
        self.emitted.value(seq)
    }
}
