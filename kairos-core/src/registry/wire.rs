//! Domain tags and fixed-layout records exchanged with callers.

use crate::eval::{EvalResult, Presence};
use crate::index::{Granularity, TickId, Time, TransactionId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Domain tags ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexDomain {
    Time,
    Transaction,
    Tick,
}

impl fmt::Display for IndexDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexDomain::Time => "time",
            IndexDomain::Transaction => "transaction",
            IndexDomain::Tick => "tick",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDomain {
    /// `f64`
    Real,
    /// `i32` codes (crossover state, zone id, run length)
    Signal,
    /// `Presence<f64>`
    Sparse,
    /// index → `Time`
    TimeMap,
}

impl fmt::Display for ValueDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueDomain::Real => "real",
            ValueDomain::Signal => "signal",
            ValueDomain::Sparse => "sparse",
            ValueDomain::TimeMap => "time_map",
        };
        f.write_str(name)
    }
}

// ─── Index keys ──────────────────────────────────────────────────────

/// Domain-tagged index as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum IndexKey {
    Time { instant: i64, granularity: i64 },
    Transaction { id: i64 },
    Tick { id: i64 },
}

impl IndexKey {
    pub fn domain(&self) -> IndexDomain {
        match self {
            IndexKey::Time { .. } => IndexDomain::Time,
            IndexKey::Transaction { .. } => IndexDomain::Transaction,
            IndexKey::Tick { .. } => IndexDomain::Tick,
        }
    }

    /// Move by `n` steps in the key's own domain.
    pub fn advance(self, n: i64) -> IndexKey {
        match self {
            IndexKey::Time {
                instant,
                granularity,
            } => IndexKey::Time {
                instant: instant + n * granularity,
                granularity,
            },
            IndexKey::Transaction { id } => IndexKey::Transaction { id: id + n },
            IndexKey::Tick { id } => IndexKey::Tick { id: id + n },
        }
    }

    /// The bare integer: instant for time keys, id otherwise.
    pub fn raw(&self) -> i64 {
        match *self {
            IndexKey::Time { instant, .. } => instant,
            IndexKey::Transaction { id } | IndexKey::Tick { id } => id,
        }
    }

    /// Build a key from a domain tag and a bare integer.
    pub fn from_raw(domain: IndexDomain, raw: i64, granularity: Option<Granularity>) -> Option<IndexKey> {
        match domain {
            IndexDomain::Time => granularity.map(|g| IndexKey::Time {
                instant: raw,
                granularity: g.seconds(),
            }),
            IndexDomain::Transaction => Some(IndexKey::Transaction { id: raw }),
            IndexDomain::Tick => Some(IndexKey::Tick { id: raw }),
        }
    }
}

impl From<Time> for IndexKey {
    fn from(t: Time) -> Self {
        IndexKey::Time {
            instant: t.instant(),
            granularity: t.granularity().seconds(),
        }
    }
}

impl From<TransactionId> for IndexKey {
    fn from(id: TransactionId) -> Self {
        IndexKey::Transaction { id: id.0 }
    }
}

impl From<TickId> for IndexKey {
    fn from(id: TickId) -> Self {
        IndexKey::Tick { id: id.0 }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IndexKey::Time {
                instant,
                granularity,
            } => write!(f, "{instant}@{granularity}s"),
            IndexKey::Transaction { id } => write!(f, "{}", TransactionId(id)),
            IndexKey::Tick { id } => write!(f, "{}", TickId(id)),
        }
    }
}

// ─── Result records ──────────────────────────────────────────────────

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireStatus {
    Pending = 0,
    Invalid = 1,
    Ready = 2,
}

/// Status discriminant plus payload. The payload is `V::default()` unless
/// the status is `Ready`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireResult<V> {
    pub status: WireStatus,
    pub value: V,
}

impl<V: Default> From<EvalResult<V>> for WireResult<V> {
    fn from(result: EvalResult<V>) -> Self {
        match result {
            EvalResult::Ready(value) => WireResult {
                status: WireStatus::Ready,
                value,
            },
            EvalResult::Pending => WireResult {
                status: WireStatus::Pending,
                value: V::default(),
            },
            EvalResult::Invalid => WireResult {
                status: WireStatus::Invalid,
                value: V::default(),
            },
        }
    }
}

impl<V> From<WireResult<V>> for EvalResult<V> {
    fn from(wire: WireResult<V>) -> Self {
        match wire.status {
            WireStatus::Ready => EvalResult::Ready(wire.value),
            WireStatus::Pending => EvalResult::Pending,
            WireStatus::Invalid => EvalResult::Invalid,
        }
    }
}

/// Nested payload for sparse sources: `is_present` is 0 or 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WirePresence<V> {
    pub is_present: u8,
    pub value: V,
}

impl<V: Default> From<Presence<V>> for WirePresence<V> {
    fn from(presence: Presence<V>) -> Self {
        match presence {
            Presence::Present(value) => WirePresence {
                is_present: 1,
                value,
            },
            Presence::Absent => WirePresence {
                is_present: 0,
                value: V::default(),
            },
        }
    }
}

impl<V> From<WirePresence<V>> for Presence<V> {
    fn from(wire: WirePresence<V>) -> Self {
        if wire.is_present != 0 {
            Presence::Present(wire.value)
        } else {
            Presence::Absent
        }
    }
}
