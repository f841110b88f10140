//! Re-index a source through an index map (e.g. tick → time).

use crate::eval::EvalResult;
use crate::indicator::Indicator;

/// `values(map(j))`. Several outer indices may map to the same inner one.
#[derive(Debug, Clone)]
pub struct Reindex<V, M> {
    values: V,
    map: M,
}

impl<V, M> Reindex<V, M>
where
    V: Indicator,
    M: Indicator<Val = V::Seq>,
{
    pub fn new(values: V, map: M) -> Self {
        Self { values, map }
    }
}

impl<V, M> Indicator for Reindex<V, M>
where
    V: Indicator,
    M: Indicator<Val = V::Seq>,
{
    type Seq = M::Seq;
    type Val = V::Val;

    fn value(&self, seq: M::Seq) -> EvalResult<V::Val> {
        let inner = crate::ready!(self.map.value(seq));
        self.values.value(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Granularity, Sequence, TickId, Time};
    use crate::source::DenseSeries;

    #[test]
    fn ticks_read_through_time_map() {
        let t0 = Time::new(0, Granularity::S5);
        let bars = DenseSeries::from_vec(t0, vec![100.0, 101.0]);
        let ticks_to_time = DenseSeries::from_vec(
            TickId(0),
            vec![t0, t0, t0.advance(1), t0.advance(2), t0.advance(-1)],
        );
        let by_tick = Reindex::new(&bars, &ticks_to_time);

        assert_eq!(by_tick.value(TickId(0)), EvalResult::Ready(100.0));
        assert_eq!(by_tick.value(TickId(1)), EvalResult::Ready(100.0));
        assert_eq!(by_tick.value(TickId(2)), EvalResult::Ready(101.0));
        assert_eq!(by_tick.value(TickId(3)), EvalResult::Pending);
        assert_eq!(by_tick.value(TickId(4)), EvalResult::Invalid);
        assert_eq!(by_tick.value(TickId(5)), EvalResult::Pending);
        assert_eq!(by_tick.value(TickId(-1)), EvalResult::Invalid);
    }
}
