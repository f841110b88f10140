//! Sparse series: values at some indices, explicit absence at the others.
//!
//! The high-water mark is the greatest index ever written. Indices up to it
//! that carry no value are `Absent`; beyond it everything is `Pending`.

use crate::eval::{EvalResult, Presence};
use crate::index::Sequence;
use crate::indicator::Indicator;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

pub struct SparseSeries<S, V> {
    offset: S,
    values: RefCell<HashMap<S, V>>,
    high_water: Cell<Option<S>>,
}

impl<S: Sequence, V> fmt::Debug for SparseSeries<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseSeries")
            .field("offset", &self.offset)
            .field("len", &self.values.borrow().len())
            .field("high_water", &self.high_water.get())
            .finish()
    }
}

impl<S: Sequence, V> SparseSeries<S, V> {
    pub fn new(offset: S) -> Self {
        Self {
            offset,
            values: RefCell::new(HashMap::new()),
            high_water: Cell::new(None),
        }
    }

    /// Bulk constructor: `values[k]` lands at `offset + k`, `None` marks absence.
    pub fn from_options<T: IntoIterator<Item = Option<V>>>(offset: S, values: T) -> Self {
        let series = Self::new(offset);
        let mut at = offset;
        for value in values {
            match value {
                Some(v) => series.set(at, v),
                None => series.mark_absent(at),
            }
            at = at.succ();
        }
        series
    }

    /// Write a value; `seq` must be past the current high-water mark.
    pub fn set(&self, seq: S, value: V) {
        self.advance_high_water(seq);
        self.values.borrow_mut().insert(seq, value);
    }

    /// Move the high-water mark to `seq` without writing a value.
    pub fn mark_absent(&self, seq: S) {
        self.advance_high_water(seq);
    }

    fn advance_high_water(&self, seq: S) {
        debug_assert!(seq >= self.offset, "sparse write before offset: {seq:?}");
        debug_assert!(
            self.high_water.get().map_or(true, |hw| seq > hw),
            "sparse writes must be strictly increasing: {seq:?}"
        );
        self.high_water.set(Some(seq));
    }

    pub fn offset(&self) -> S {
        self.offset
    }

    pub fn high_water(&self) -> Option<S> {
        self.high_water.get()
    }

    /// Number of indices carrying a value.
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl<S: Sequence, V: Clone> Indicator for SparseSeries<S, V> {
    type Seq = S;
    type Val = Presence<V>;

    fn value(&self, seq: S) -> EvalResult<Presence<V>> {
        if seq < self.offset {
            return EvalResult::Invalid;
        }
        match self.high_water.get() {
            Some(hw) if seq <= hw => {
                EvalResult::Ready(self.values.borrow().get(&seq).cloned().into())
            }
            _ => EvalResult::Pending,
        }
    }
}
