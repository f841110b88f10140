//! Kairos Core: lazy, pull-based indicator evaluation over append-only series.
//!
//! This crate contains:
//! - Index domains (time at a granularity, transaction ids, tick ids)
//! - The three-state result lattice (`Pending` / `Invalid` / `Ready`)
//! - Append-only dense and sparse sources
//! - Transforms (moving averages, slope, gap-fill, accumulation, memoization)
//! - Combinators (pure functions, crossover, re-indexing, zone classification)
//! - A domain-tagged registry for callers that work with handles
//! - TOML graph descriptions built into the registry

pub mod combinator;
pub mod config;
pub mod eval;
pub mod index;
pub mod indicator;
pub mod registry;
pub mod source;
pub mod transform;

pub use config::{BuiltGraph, ConfigError, GraphSpec, NodeKind, NodeSpec};
pub use eval::{EvalResult, Presence};
pub use index::{seq_range, Granularity, Sequence, TickId, Time, TransactionId};
pub use indicator::{Indicator, IndicatorExt};
pub use registry::{Engine, Handle, IndexDomain, IndexKey, RegistryError, ValueDomain};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::{Cross, CrossState};
    use crate::source::DenseSeries;
    use crate::transform::{Cached, Sma};
    use std::rc::Rc;

    /// Architecture contract: derived indicators compose through shared sources.
    ///
    /// One source feeds two moving averages and a crossover of them; appending
    /// to the source is visible through every path without rebuilding.
    #[test]
    fn shared_source_feeds_diamond() {
        let close = Rc::new(DenseSeries::from_vec(TickId(0), vec![5.0, 4.0, 3.0, 4.0, 6.0]));
        let fast = Rc::new(Cached::new(Sma::new(Rc::clone(&close), 1), 16));
        let slow = Rc::new(Sma::new(Rc::clone(&close), 3));
        let cross = Cross::new(
            Rc::clone(&fast) as Rc<dyn Indicator<Seq = TickId, Val = f64>>,
            Rc::clone(&slow) as Rc<dyn Indicator<Seq = TickId, Val = f64>>,
        );

        assert_eq!(cross.value(TickId(1)), EvalResult::Invalid);
        assert_eq!(cross.value(TickId(2)), EvalResult::Ready(CrossState::NotCrossed));
        assert_eq!(cross.value(TickId(3)), EvalResult::Ready(CrossState::LtToGt));
        assert_eq!(cross.value(TickId(5)), EvalResult::Pending);

        close.append(1.0);
        assert_eq!(cross.value(TickId(5)), EvalResult::Ready(CrossState::GtToLt));
    }

    /// Compile-time check: the public value records are plain data.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send_sync<T: Send + Sync>() {}

        require_send_sync::<EvalResult<f64>>();
        require_send_sync::<Presence<f64>>();
        require_send_sync::<Time>();
        require_send_sync::<IndexKey>();
        require_send_sync::<Handle>();
        require_send_sync::<GraphSpec>();
        require_send_sync::<registry::WireResult<f64>>();
    }
}
