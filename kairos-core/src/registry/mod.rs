//! Domain-tagged registry: the boundary between callers and the generic core.
//!
//! Callers never see the generic indicator types. They create nodes with
//! domain tags and handles, and read results back as fixed-layout records.
//! Every call is validated before dispatch and fails with [`RegistryError`].

pub mod engine;
pub mod error;
pub mod wire;

pub use engine::{CombineOp, Engine, NodeInfo, QueryValue};
pub use error::RegistryError;
pub use wire::{IndexDomain, IndexKey, ValueDomain, WirePresence, WireResult, WireStatus};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque node identifier handed out by [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(u64);

impl Handle {
    pub(crate) fn new(raw: u64) -> Self {
        Handle(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
