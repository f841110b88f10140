//! Single-source derived indicators.
//!
//! Stateless transforms (`Sma`, `Slope`, `Envelope`, `Resample`, `Rolling`)
//! recompute from their source on every query. Stateful ones (`Cached`,
//! `Ema`, `GapFill`, `Accumulate`, `RunCount`) keep private state behind
//! `RefCell` and assume queries arrive in non-decreasing index order; other
//! orders still give correct results, only slower.

pub mod accumulate;
pub mod cached;
pub mod ema;
pub mod envelope;
pub mod gap_fill;
pub mod memo;
pub mod resample;
pub mod rolling;
pub mod run_count;
pub mod slope;
pub mod sma;

pub use accumulate::Accumulate;
pub use cached::Cached;
pub use ema::Ema;
pub use envelope::Envelope;
pub use gap_fill::GapFill;
pub use memo::MemoStore;
pub use resample::Resample;
pub use rolling::{Rolling, Window};
pub use run_count::RunCount;
pub use slope::Slope;
pub use sma::Sma;

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
