//! Memoizing wrapper.

use super::memo::MemoStore;
use crate::eval::EvalResult;
use crate::indicator::Indicator;
use std::cell::{Cell, RefCell};

/// Stores settled results of its source in a bounded table.
///
/// `Pending` is never stored: it would hide values appended later.
pub struct Cached<I: Indicator> {
    source: I,
    memo: RefCell<MemoStore<I::Seq, EvalResult<I::Val>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<I: Indicator> Cached<I>
where
    I::Val: Clone,
{
    pub fn new(source: I, capacity: usize) -> Self {
        Self {
            source,
            memo: RefCell::new(MemoStore::new(capacity)),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.memo.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.borrow().is_empty()
    }

    pub fn source(&self) -> &I {
        &self.source
    }
}

impl<I: Indicator> Indicator for Cached<I>
where
    I::Val: Clone,
{
    type Seq = I::Seq;
    type Val = I::Val;

    fn value(&self, seq: I::Seq) -> EvalResult<I::Val> {
        let hit = self.memo.borrow().get(&seq).cloned();
        if let Some(result) = hit {
            self.hits.set(self.hits.get() + 1);
            return result;
        }
        self.misses.set(self.misses.get() + 1);
        let result = self.source.value(seq);
        if result.is_settled() {
            self.memo.borrow_mut().insert(seq, result.clone());
        }
        result
    }
}
