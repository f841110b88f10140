//! Length of the run of equal values ending at each index.

use super::memo::MemoStore;
use crate::eval::EvalResult;
use crate::index::Sequence;
use crate::indicator::Indicator;
use std::cell::RefCell;

pub struct RunCount<I: Indicator> {
    source: I,
    memo: RefCell<MemoStore<I::Seq, usize>>,
}

impl<I> RunCount<I>
where
    I: Indicator,
    I::Val: PartialEq,
{
    pub fn new(source: I, capacity: usize) -> Self {
        Self {
            source,
            memo: RefCell::new(MemoStore::new(capacity)),
        }
    }
}

impl<I> Indicator for RunCount<I>
where
    I: Indicator,
    I::Val: PartialEq,
{
    type Seq = I::Seq;
    type Val = usize;

    fn value(&self, seq: I::Seq) -> EvalResult<usize> {
        let current = crate::ready!(self.source.value(seq));
        if let Some(&count) = self.memo.borrow().get(&seq) {
            return EvalResult::Ready(count);
        }

        let mut count = 1;
        let mut at = seq;
        let total = loop {
            let prev = at.pred();
            match self.source.value(prev) {
                EvalResult::Ready(v) if v == current => {
                    if let Some(&known) = self.memo.borrow().get(&prev) {
                        break count + known;
                    }
                    count += 1;
                    at = prev;
                }
                EvalResult::Pending => return EvalResult::Pending,
                _ => break count,
            }
        };

        self.memo.borrow_mut().insert(seq, total);
        EvalResult::Ready(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TickId;
    use crate::source::DenseSeries;

    #[test]
    fn counts_runs() {
        let src = DenseSeries::from_vec(TickId(0), vec![1, 1, 2, 2, 2, 1]);
        let runs = RunCount::new(src, 16);
        let out: Vec<_> = (0..7).map(|i| runs.value(TickId(i))).collect();
        assert_eq!(
            out,
            vec![
                EvalResult::Ready(1),
                EvalResult::Ready(2),
                EvalResult::Ready(1),
                EvalResult::Ready(2),
                EvalResult::Ready(3),
                EvalResult::Ready(1),
                EvalResult::Pending,
            ]
        );
    }

    #[test]
    fn out_of_order_matches_in_order() {
        let src = DenseSeries::from_vec(TickId(0), vec![0.5; 6]);
        let runs = RunCount::new(&src, 0);
        assert_eq!(runs.value(TickId(5)), EvalResult::Ready(6));
        assert_eq!(runs.value(TickId(2)), EvalResult::Ready(3));
        assert_eq!(runs.value(TickId(-1)), EvalResult::Invalid);
    }
}
