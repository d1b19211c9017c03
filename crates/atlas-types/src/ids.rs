//! Type-safe identifier wrapper for tracked entities.
//!
//! Tracked entities live in the spatial engine and carry integer primary
//! keys assigned by the data import. The wrapper prevents raw row ids from
//! being confused with other integers (graph vertex ids, counts) at
//! compile time.

use serde::{Deserialize, Serialize};

/// Unique identifier for a tracked entity row in the spatial engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Return the inner row id.
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EntityId> for i64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}
