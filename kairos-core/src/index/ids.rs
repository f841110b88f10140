use super::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

/// Monotonically increasing tick sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TickId(pub i64);

macro_rules! integer_sequence {
    ($name:ident, $prefix:literal) => {
        impl Sequence for $name {
            #[inline]
            fn advance(self, n: i64) -> Self {
                $name(self.0 + n)
            }

            #[inline]
            fn distance_from(&self, origin: &Self) -> i64 {
                self.0 - origin.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                $name(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

integer_sequence!(TransactionId, "tx#");
integer_sequence!(TickId, "tick#");
