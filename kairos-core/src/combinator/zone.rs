//! Zone classification of a base series against envelope lines.
//!
//! Positive lines are ordered ascending, negative lines descending. The zone
//! is the number of positive lines strictly below the base (counting stops at
//! the first line not exceeded) minus the number of negative lines strictly
//! above it. Zero means inside every band.

use crate::eval::EvalResult;
use crate::indicator::Indicator;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub i32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Zone<I> {
    base: I,
    positive: Vec<I>,
    negative: Vec<I>,
}

impl<I> Zone<I>
where
    I: Indicator,
    I::Val: PartialOrd,
{
    pub fn new(base: I, positive: Vec<I>, negative: Vec<I>) -> Self {
        Self {
            base,
            positive,
            negative,
        }
    }
}

impl<I> Indicator for Zone<I>
where
    I: Indicator,
    I::Val: PartialOrd,
{
    type Seq = I::Seq;
    type Val = ZoneId;

    fn value(&self, seq: I::Seq) -> EvalResult<ZoneId> {
        let base = self.base.value(seq);
        let upper: EvalResult<Vec<I::Val>> = self.positive.iter().map(|l| l.value(seq)).collect();
        let lower: EvalResult<Vec<I::Val>> = self.negative.iter().map(|l| l.value(seq)).collect();

        base.zip(upper).zip(lower).map(|((base, upper), lower)| {
            let above = upper.iter().take_while(|line| base > **line).count();
            let below = lower.iter().take_while(|line| base < **line).count();
            ZoneId(above as i32 - below as i32)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TickId;
    use crate::source::DenseSeries;
    use std::rc::Rc;

    fn line(offset: f64) -> Rc<DenseSeries<TickId, f64>> {
        Rc::new(DenseSeries::from_vec(
            TickId(0),
            (0..5).map(|i| i as f64 + offset).collect(),
        ))
    }

    #[test]
    fn classifies_price_against_bands() {
        let price = Rc::new(DenseSeries::from_vec(
            TickId(0),
            vec![1.0, 2.15, 2.85, 4.3, 4.7],
        ));
        let zone = Zone::new(price, vec![line(1.1), line(1.2)], vec![line(0.9), line(0.8)]);

        let out: Vec<_> = (0..5).map(|i| zone.value(TickId(i))).collect();
        assert_eq!(
            out,
            [0, 1, -1, 2, -2]
                .into_iter()
                .map(|z| EvalResult::Ready(ZoneId(z)))
                .collect::<Vec<_>>()
        );
        assert_eq!(zone.value(TickId(5)), EvalResult::Pending);
    }

    #[test]
    fn display_is_signed() {
        assert_eq!(ZoneId(2).to_string(), "+2");
        assert_eq!(ZoneId(-1).to_string(), "-1");
    }
}
