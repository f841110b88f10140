//! Wall-clock time index at a fixed granularity.

use super::Sequence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Step size of a time index, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Granularity(i64);

impl Granularity {
    pub const S5: Granularity = Granularity(5);
    pub const S10: Granularity = Granularity(10);
    pub const M1: Granularity = Granularity(60);
    pub const H1: Granularity = Granularity(60 * 60);
    pub const D1: Granularity = Granularity(60 * 60 * 24);

    pub fn new(seconds: i64) -> Self {
        debug_assert!(seconds > 0, "granularity must be positive, got {seconds}");
        Self(seconds)
    }

    pub fn seconds(self) -> i64 {
        self.0
    }

    /// True when `instant` lies on this granularity's grid.
    pub fn is_aligned(self, instant: i64) -> bool {
        instant.rem_euclid(self.0) == 0
    }

    /// Largest aligned instant not after `instant`.
    pub fn floor(self, instant: i64) -> i64 {
        instant - instant.rem_euclid(self.0)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Unix instant (seconds) on a granularity grid.
///
/// Ordering is only defined between indices of the same granularity.
/// Comparing across granularities is a caller bug and trips a debug assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Time {
    instant: i64,
    granularity: Granularity,
}

impl Time {
    pub fn new(instant: i64, granularity: Granularity) -> Self {
        debug_assert!(
            granularity.is_aligned(instant),
            "instant {instant} is not aligned to {granularity}"
        );
        Self {
            instant,
            granularity,
        }
    }

    pub fn instant(&self) -> i64 {
        self.instant
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Re-express this instant at another granularity, if it is aligned there.
    pub fn try_with_granularity(self, granularity: Granularity) -> Option<Time> {
        granularity
            .is_aligned(self.instant)
            .then(|| Time::new(self.instant, granularity))
    }

    pub fn from_datetime(dt: DateTime<Utc>, granularity: Granularity) -> Option<Time> {
        let instant = dt.timestamp();
        granularity
            .is_aligned(instant)
            .then(|| Time::new(instant, granularity))
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.instant, 0)
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert_eq!(
            self.granularity, other.granularity,
            "compared time indices of different granularity"
        );
        self.instant.cmp(&other.instant)
    }
}

impl Sequence for Time {
    #[inline]
    fn advance(self, n: i64) -> Self {
        Time {
            instant: self.instant + n * self.granularity.0,
            granularity: self.granularity,
        }
    }

    #[inline]
    fn distance_from(&self, origin: &Self) -> i64 {
        debug_assert_eq!(self.granularity, origin.granularity);
        (self.instant - origin.instant) / self.granularity.0
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}@{}", dt.to_rfc3339(), self.granularity),
            None => write!(f, "{}@{}", self.instant, self.granularity),
        }
    }
}
