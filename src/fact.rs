//! Facts and record ids.
//!
//! A fact is one immutable entity–attribute–value triple plus the record id
//! it was appended under. Record ids are the only stable handle for
//! retracting one particular fact.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::value::Value;

/// Process-wide unique sequence number of an appended fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic record id counter.
///
/// Never hands out the same id twice, retractions included. Share one
/// allocator (via `Arc`) between everything that appends to the same log.
#[derive(Debug)]
pub struct RecordIdAllocator {
    next: AtomicU64,
}

impl RecordIdAllocator {
    /// Creates an allocator whose first id is `#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an allocator whose first id is `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocates the next id.
    pub fn next_id(&self) -> RecordId {
        RecordId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    #[must_use]
    pub fn peek(&self) -> RecordId {
        RecordId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for RecordIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One immutable fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub record_id: RecordId,
    pub entity: EntityId,
    pub key: String,
    pub value: Value,
}

impl Fact {
    #[must_use]
    pub fn new(
        record_id: RecordId,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            record_id,
            entity,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns true if this fact is about `key` of `entity`.
    #[must_use]
    pub fn matches(&self, entity: EntityId, key: &str) -> bool {
        self.entity == entity && self.key == key
    }

    /// Referenced entity, if the value is a reference.
    #[must_use]
    pub const fn reference(&self) -> Option<EntityId> {
        self.value.as_entity()
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} {} {}]", self.record_id, self.entity, self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_allocator_is_monotonic() {
        let alloc = RecordIdAllocator::new();
        let a = alloc.next_id();
        let b = alloc.next_id();
        assert_eq!(a, RecordId::new(1));
        assert!(b > a);
        assert_eq!(alloc.peek(), RecordId::new(3));
    }

    #[test]
    fn test_allocator_concurrent_ids_are_unique() {
        let alloc = Arc::new(RecordIdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                std::thread::spawn(move || (0..1000).map(|_| alloc.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate record id {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn test_fact_matches() {
        let e = EntityId::new();
        let fact = Fact::new(RecordId::new(1), e, "width", 300);
        assert!(fact.matches(e, "width"));
        assert!(!fact.matches(e, "height"));
        assert!(!fact.matches(EntityId::new(), "width"));
        assert_eq!(fact.reference(), None);
    }

    #[test]
    fn test_fact_reference() {
        let target = EntityId::new();
        let fact = Fact::new(RecordId::new(1), EntityId::new(), "location", target);
        assert_eq!(fact.reference(), Some(target));
    }
}
