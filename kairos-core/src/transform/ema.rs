//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[i] = EMA[i-1] + alpha * (source[i] - EMA[i-1]), alpha = 2 / (period + 1).
//! Seed: EMA[s0] = seed[s0], where s0 is the first index at which the seed is Ready.
//! Warm-up: indices `s0 <= i < s0 + k` are Invalid, with
//! `k = ceil(ln(1 - accuracy) / ln(1 - alpha))`, the number of steps after
//! which the seed's weight in the estimate has decayed below `1 - accuracy`.
//!
//! The running estimate is kept per instance and advanced in increasing index
//! order. Settled results are memoized, so re-reading a recent index is O(1).

use super::memo::MemoStore;
use crate::eval::EvalResult;
use crate::index::Sequence;
use crate::indicator::Indicator;
use log::warn;
use std::cell::{Cell, RefCell};

/// Smoothing factor for an EMA of the given period.
pub fn alpha_for(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Number of steps needed before the estimate reaches `accuracy`.
pub fn warmup_depth(alpha: f64, accuracy: f64) -> i64 {
    let k = ((1.0 - accuracy).ln() / (1.0 - alpha).ln()).ceil();
    if k.is_finite() && k > 0.0 {
        k as i64
    } else {
        0
    }
}

pub struct Ema<I, D>
where
    I: Indicator<Val = f64>,
    D: Indicator<Seq = I::Seq, Val = f64>,
{
    source: I,
    seed: D,
    alpha: f64,
    warmup: i64,
    /// Last seed-Ready run seen: first index and last index checked Ready.
    run: Cell<Option<(I::Seq, I::Seq)>>,
    /// Running estimate as `(anchor, index, value)`.
    cursor: Cell<Option<(I::Seq, I::Seq, f64)>>,
    memo: RefCell<MemoStore<I::Seq, EvalResult<f64>>>,
}

impl<I, D> Ema<I, D>
where
    I: Indicator<Val = f64>,
    D: Indicator<Seq = I::Seq, Val = f64>,
{
    pub fn new(source: I, seed: D, period: usize, accuracy: f64, capacity: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        assert!(
            accuracy > 0.0 && accuracy < 1.0,
            "EMA accuracy must be in (0, 1)"
        );
        let alpha = alpha_for(period);
        Self {
            source,
            seed,
            alpha,
            warmup: warmup_depth(alpha, accuracy),
            run: Cell::new(None),
            cursor: Cell::new(None),
            memo: RefCell::new(MemoStore::new(capacity)),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn warmup(&self) -> i64 {
        self.warmup
    }

    /// First index of the run of seed-Ready indices that contains `seq`.
    ///
    /// The seed must be Ready at `seq`. A Pending seed inside the run makes
    /// the anchor Pending too, since the run may still grow backwards.
    fn anchor_for(&self, seq: I::Seq) -> EvalResult<I::Seq> {
        if let Some((anchor, end)) = self.run.get() {
            if anchor <= seq && seq <= end {
                return EvalResult::Ready(anchor);
            }
            if seq > end {
                let mut at = end.succ();
                while at < seq {
                    match self.seed.value(at) {
                        EvalResult::Ready(_) => at = at.succ(),
                        EvalResult::Pending => return EvalResult::Pending,
                        EvalResult::Invalid => break,
                    }
                }
                if at >= seq {
                    self.run.set(Some((anchor, seq)));
                    return EvalResult::Ready(anchor);
                }
            }
        }
        let mut anchor = seq;
        loop {
            match self.seed.value(anchor.pred()) {
                EvalResult::Ready(_) => anchor = anchor.pred(),
                EvalResult::Pending => return EvalResult::Pending,
                EvalResult::Invalid => break,
            }
        }
        self.run.set(Some((anchor, seq)));
        EvalResult::Ready(anchor)
    }

    /// Run the recursion from the best available starting point up to `seq`.
    fn estimate(&self, anchor: I::Seq, seq: I::Seq) -> EvalResult<f64> {
        let (mut at, mut est) = match self.cursor.get() {
            Some((a, c, e)) if a == anchor && c <= seq => (c, e),
            previous => {
                if let Some((a, c, _)) = previous {
                    if a == anchor && c > seq {
                        warn!("EMA queried at {seq:?} behind cursor {c:?}; recomputing from {anchor:?}");
                    }
                }
                (anchor, crate::ready!(self.seed.value(anchor)))
            }
        };

        let result = loop {
            if at >= seq {
                break EvalResult::Ready(est);
            }
            let next = at.succ();
            match self.source.value(next) {
                EvalResult::Ready(x) => {
                    est += self.alpha * (x - est);
                    at = next;
                }
                EvalResult::Pending => break EvalResult::Pending,
                EvalResult::Invalid => break EvalResult::Invalid,
            }
        };

        let advanced = match self.cursor.get() {
            Some((a, c, _)) => a != anchor || at > c,
            None => true,
        };
        if advanced {
            self.cursor.set(Some((anchor, at, est)));
        }
        result
    }
}

impl<I, D> Indicator for Ema<I, D>
where
    I: Indicator<Val = f64>,
    D: Indicator<Seq = I::Seq, Val = f64>,
{
    type Seq = I::Seq;
    type Val = f64;

    fn value(&self, seq: I::Seq) -> EvalResult<f64> {
        crate::ready!(self.seed.value(seq));
        if let Some(hit) = self.memo.borrow().get(&seq).copied() {
            return hit;
        }

        let anchor = crate::ready!(self.anchor_for(seq));
        let result = if seq.distance_from(&anchor) < self.warmup {
            EvalResult::Invalid
        } else {
            self.estimate(anchor, seq)
        };

        if result.is_settled() {
            self.memo.borrow_mut().insert(seq, result);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TickId;
    use crate::source::{DenseSeries, SparseSeries};
    use crate::transform::{assert_approx, GapFill, Sma, DEFAULT_EPSILON};
    use std::rc::Rc;

    fn step_series() -> Rc<DenseSeries<TickId, f64>> {
        Rc::new(DenseSeries::from_vec(
            TickId(0),
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 3.0, 3.0],
        ))
    }

    fn expected() -> Vec<EvalResult<f64>> {
        let mut out = vec![EvalResult::Invalid; 5];
        out.extend([2.0, 2.5, 2.75, 2.875, 2.9375].map(EvalResult::Ready));
        out
    }

    #[test]
    fn warmup_depth_for_half_alpha() {
        assert_eq!(warmup_depth(0.5, 0.9), 4);
        assert_eq!(warmup_depth(1.0, 0.9), 0);
        assert_approx(alpha_for(3), 0.5, DEFAULT_EPSILON);
    }

    #[test]
    fn seeded_by_sma_with_accuracy_warmup() {
        let src = step_series();
        let ema = Ema::new(Rc::clone(&src), Sma::new(Rc::clone(&src), 2), 3, 0.9, 64);
        let out: Vec<_> = (0..10).map(|i| ema.value(TickId(i))).collect();
        assert_eq!(out, expected());
        assert_eq!(ema.value(TickId(10)), EvalResult::Pending);
    }

    #[test]
    fn out_of_order_queries_agree() {
        let src = step_series();
        let ema = Ema::new(Rc::clone(&src), Sma::new(Rc::clone(&src), 2), 3, 0.9, 0);
        let order = [9, 2, 7, 5, 0, 8, 6, 1, 3, 4];
        let want = expected();
        for i in order {
            assert_eq!(ema.value(TickId(i)), want[i as usize], "index {i}");
        }
    }

    #[test]
    fn pending_resumes_after_append() {
        let src = Rc::new(DenseSeries::from_vec(TickId(0), vec![1.0, 1.0, 3.0]));
        let ema = Ema::new(Rc::clone(&src), Sma::new(Rc::clone(&src), 1), 1, 0.5, 16);
        assert_eq!(ema.value(TickId(2)), EvalResult::Ready(3.0));
        assert_eq!(ema.value(TickId(3)), EvalResult::Pending);
        src.append(5.0);
        assert_eq!(ema.value(TickId(3)), EvalResult::Ready(5.0));
    }

    #[test]
    fn gapped_seed_restarts_each_run() {
        let src = Rc::new(DenseSeries::from_vec(TickId(0), vec![1.0; 10]));
        let mut slots = vec![Some(1.0); 10];
        slots[2] = None;
        let seed = Rc::new(GapFill::new(
            SparseSeries::from_options(TickId(0), slots),
            0,
            8,
        ));
        let fresh = |i: i64| {
            Ema::new(Rc::clone(&src), Rc::clone(&seed), 3, 0.9, 1).value(TickId(i))
        };

        // second run starts at 3, so index 5 is still warming up
        let ema = Ema::new(Rc::clone(&src), Rc::clone(&seed), 3, 0.9, 1);
        for i in [5, 1, 5, 7, 0, 9, 2, 6, 5] {
            assert_eq!(ema.value(TickId(i)), fresh(i), "index {i}");
        }
        assert_eq!(ema.value(TickId(5)), EvalResult::Invalid);
        assert_eq!(ema.value(TickId(2)), EvalResult::Invalid);
        assert_eq!(ema.value(TickId(7)), EvalResult::Ready(1.0));
    }

    #[test]
    #[should_panic(expected = "EMA accuracy must be in (0, 1)")]
    fn accuracy_out_of_range_panics() {
        let src = step_series();
        Ema::new(Rc::clone(&src), Rc::clone(&src), 3, 1.0, 4);
    }
}
