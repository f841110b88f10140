//! Multi-source derived indicators.

pub mod compare;
pub mod cross;
pub mod func;
pub mod reindex;
pub mod zone;

pub use compare::Compare;
pub use cross::{Cross, CrossState};
pub use func::{Func2, FuncN, Map};
pub use reindex::Reindex;
pub use zone::{Zone, ZoneId};
