//! Dense series: one value per step from a starting index.

use crate::eval::EvalResult;
use crate::index::Sequence;
use crate::indicator::Indicator;
use std::cell::RefCell;

#[derive(Debug)]
pub struct DenseSeries<S, V> {
    offset: S,
    values: RefCell<Vec<V>>,
}

impl<S: Sequence, V> DenseSeries<S, V> {
    /// Empty series whose first value will land at `offset`.
    pub fn new(offset: S) -> Self {
        Self::from_vec(offset, Vec::new())
    }

    pub fn from_vec(offset: S, values: Vec<V>) -> Self {
        Self {
            offset,
            values: RefCell::new(values),
        }
    }

    pub fn append(&self, value: V) {
        self.values.borrow_mut().push(value);
    }

    pub fn extend<T: IntoIterator<Item = V>>(&self, values: T) {
        self.values.borrow_mut().extend(values);
    }

    pub fn offset(&self) -> S {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// First index that is not yet known.
    pub fn end(&self) -> S {
        self.offset.advance(self.len() as i64)
    }
}

impl<S: Sequence, V: Clone> Indicator for DenseSeries<S, V> {
    type Seq = S;
    type Val = V;

    fn value(&self, seq: S) -> EvalResult<V> {
        if seq < self.offset {
            return EvalResult::Invalid;
        }
        let pos = seq.distance_from(&self.offset) as usize;
        match self.values.borrow().get(pos) {
            Some(v) => EvalResult::Ready(v.clone()),
            None => EvalResult::Pending,
        }
    }
}
