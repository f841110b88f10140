//! Append-only sources.
//!
//! Sources are the leaves of an indicator graph. They are shared through `Rc`
//! and mutated through `&self` so readers keep their handles while new data
//! arrives. Writes only ever extend the known horizon.

pub mod dense;
pub mod sparse;

pub use dense::DenseSeries;
pub use sparse::SparseSeries;
