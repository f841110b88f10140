//! Forward-fill of a sparse source with a bounded gap length.
//!
//! A present value is passed through. An absent slot takes the last present
//! value as long as the run of consecutive absent slots ending at it is at
//! most `max_run`; past the bound, or with no earlier present value, the
//! result is Invalid.

use super::memo::MemoStore;
use crate::eval::{EvalResult, Presence};
use crate::index::Sequence;
use crate::indicator::Indicator;
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Filled<V> {
    value: V,
    /// Absent slots since the value was last present.
    run: usize,
}

pub struct GapFill<I, V>
where
    I: Indicator<Val = Presence<V>>,
{
    source: I,
    max_run: usize,
    memo: RefCell<MemoStore<I::Seq, EvalResult<Filled<V>>>>,
}

impl<I, V> GapFill<I, V>
where
    I: Indicator<Val = Presence<V>>,
    V: Clone,
{
    pub fn new(source: I, max_run: usize, capacity: usize) -> Self {
        Self {
            source,
            max_run,
            memo: RefCell::new(MemoStore::new(capacity)),
        }
    }

    pub fn max_run(&self) -> usize {
        self.max_run
    }

    fn extend(&self, filled: Filled<V>, absent: usize) -> EvalResult<Filled<V>> {
        let run = filled.run + absent;
        if run > self.max_run {
            EvalResult::Invalid
        } else {
            EvalResult::Ready(Filled {
                value: filled.value,
                run,
            })
        }
    }

    fn resolve(&self, seq: I::Seq) -> EvalResult<Filled<V>> {
        if let Some(hit) = self.memo.borrow().get(&seq).cloned() {
            return hit;
        }

        // Walk back over absent slots until something settles the run.
        let mut absent = 0;
        let mut at = seq;
        let base = loop {
            if at != seq {
                if let Some(hit) = self.memo.borrow().get(&at).cloned() {
                    break hit;
                }
            }
            match self.source.value(at) {
                EvalResult::Pending => return EvalResult::Pending,
                EvalResult::Invalid => break EvalResult::Invalid,
                EvalResult::Ready(Presence::Present(value)) => {
                    break EvalResult::Ready(Filled { value, run: 0 })
                }
                EvalResult::Ready(Presence::Absent) => {
                    absent += 1;
                    if absent > self.max_run {
                        break EvalResult::Invalid;
                    }
                    at = at.pred();
                }
            }
        };

        let result = base.and_then(|filled| self.extend(filled, absent));
        self.memo.borrow_mut().insert(seq, result.clone());
        result
    }
}

impl<I, V> Indicator for GapFill<I, V>
where
    I: Indicator<Val = Presence<V>>,
    V: Clone,
{
    type Seq = I::Seq;
    type Val = V;

    fn value(&self, seq: I::Seq) -> EvalResult<V> {
        self.resolve(seq).map(|filled| filled.value)
    }
}
