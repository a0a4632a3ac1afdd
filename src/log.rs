//! The append-only fact log.
//!
//! A [`FactLog`] is an immutable value. Every `&self` operation returns a
//! new log and leaves the receiver untouched, so a reader holding an older
//! snapshot never observes a half-applied write. The consuming `into_*`
//! forms reuse storage nobody else holds. Retraction moves facts out of the
//! active sequence into an audit trail; nothing is ever rewritten.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::LogError;
use crate::fact::{Fact, RecordId, RecordIdAllocator};
use crate::value::Value;

/// A fact that no longer participates in resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retraction {
    pub fact: Fact,
    pub retracted_at: DateTime<Utc>,
}

/// Immutable, cheaply cloneable fact log.
///
/// # Examples
///
/// ```
/// use factgraph::{EntityId, FactLog, RecordIdAllocator, Value};
///
/// let alloc = RecordIdAllocator::new();
/// let w1 = EntityId::from_name("w1");
///
/// let empty = FactLog::new();
/// let log = empty.add_fact(&alloc, w1, "width", Value::Int(300)).unwrap();
///
/// assert!(empty.is_empty());
/// assert_eq!(log.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FactLog {
    facts: Arc<Vec<Fact>>,
    retracted: Arc<Vec<Retraction>>,
    // Every record id ever appended, active or retracted.
    record_ids: Arc<HashSet<RecordId>>,
    version: u64,
}

impl FactLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from facts in the given order.
    ///
    /// # Errors
    ///
    /// Returns `LogError::DuplicateRecordId` if two facts share a record id.
    pub fn from_facts(facts: impl IntoIterator<Item = Fact>) -> Result<Self, LogError> {
        let mut log = Self::new();
        for fact in facts {
            log = log.push(fact)?;
        }
        Ok(log)
    }

    /// Active facts in log order.
    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Retracted facts in retraction order.
    #[must_use]
    pub fn retracted(&self) -> &[Retraction] {
        &self.retracted
    }

    /// Number of active facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Number of effective mutations applied to reach this log.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Active fact with the given record id.
    #[must_use]
    pub fn get(&self, record_id: RecordId) -> Option<&Fact> {
        self.facts.iter().find(|f| f.record_id == record_id)
    }

    /// Active facts about `entity`, in log order.
    pub fn facts_for(&self, entity: EntityId) -> impl Iterator<Item = &Fact> + '_ {
        self.facts.iter().filter(move |f| f.entity == entity)
    }

    /// Active facts about `key` of `entity`, in log order.
    pub fn facts_matching<'a>(
        &'a self,
        entity: EntityId,
        key: &'a str,
    ) -> impl Iterator<Item = &'a Fact> + 'a {
        self.facts.iter().filter(move |f| f.matches(entity, key))
    }

    /// Returns true if `record_id` was ever appended to this log.
    #[must_use]
    pub fn has_record(&self, record_id: RecordId) -> bool {
        self.record_ids.contains(&record_id)
    }

    /// Appends a pre-built fact.
    ///
    /// # Errors
    ///
    /// Returns `LogError::DuplicateRecordId` if the record id is already
    /// present, including on a retracted fact.
    pub fn append(&self, fact: Fact) -> Result<Self, LogError> {
        self.clone().push(fact)
    }

    /// Appends `(entity, key, value)` under a freshly allocated record id.
    ///
    /// # Errors
    ///
    /// Returns `LogError::DuplicateRecordId` if `alloc` hands out an id this
    /// log already holds (i.e. the log was fed by a different allocator).
    pub fn add_fact(
        &self,
        alloc: &RecordIdAllocator,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, LogError> {
        self.clone().into_added(alloc, entity, key, value)
    }

    /// Retracts every `(entity, key)` fact, then appends the new one.
    ///
    /// Do not use this for multi-valued keys: all accumulated values go.
    ///
    /// # Errors
    ///
    /// Same as [`add_fact`](Self::add_fact).
    pub fn replace_fact(
        &self,
        alloc: &RecordIdAllocator,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, LogError> {
        self.clone().into_replaced(alloc, entity, key, value)
    }

    /// Retracts every `(entity, key)` fact. No-op if none match.
    #[must_use]
    pub fn retract_fact(&self, entity: EntityId, key: &str) -> Self {
        self.clone().into_retracted(entity, key)
    }

    /// Retracts the fact with `record_id`. No-op if absent.
    #[must_use]
    pub fn retract_fact_by_id(&self, record_id: RecordId) -> Self {
        self.clone().into_retracted_by_id(record_id)
    }

    /// Consuming form of [`append`](Self::append).
    ///
    /// Storage is only copied if another log still shares it, so a chain of
    /// pushes on an owned log costs amortized constant time per fact.
    ///
    /// # Errors
    ///
    /// Same as [`append`](Self::append).
    pub fn push(mut self, fact: Fact) -> Result<Self, LogError> {
        if self.has_record(fact.record_id) {
            return Err(LogError::DuplicateRecordId {
                record_id: fact.record_id,
            });
        }
        Arc::make_mut(&mut self.record_ids).insert(fact.record_id);
        Arc::make_mut(&mut self.facts).push(fact);
        self.version += 1;
        Ok(self)
    }

    /// Consuming form of [`add_fact`](Self::add_fact).
    ///
    /// # Errors
    ///
    /// Same as [`add_fact`](Self::add_fact).
    pub fn into_added(
        self,
        alloc: &RecordIdAllocator,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, LogError> {
        self.push(Fact::new(alloc.next_id(), entity, key, value))
    }

    /// Consuming form of [`replace_fact`](Self::replace_fact).
    ///
    /// # Errors
    ///
    /// Same as [`add_fact`](Self::add_fact).
    pub fn into_replaced(
        self,
        alloc: &RecordIdAllocator,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, LogError> {
        let key = key.into();
        let fact = Fact::new(alloc.next_id(), entity, key.clone(), value);
        // Check before retracting so a rejected append leaves no trace.
        if self.has_record(fact.record_id) {
            return Err(LogError::DuplicateRecordId {
                record_id: fact.record_id,
            });
        }
        let version = self.version;
        let mut out = self.retract_where(|f| f.matches(entity, &key)).push(fact)?;
        // One logical mutation.
        out.version = version + 1;
        Ok(out)
    }

    /// Consuming form of [`retract_fact`](Self::retract_fact).
    #[must_use]
    pub fn into_retracted(self, entity: EntityId, key: &str) -> Self {
        self.retract_where(|f| f.matches(entity, key))
    }

    /// Consuming form of [`retract_fact_by_id`](Self::retract_fact_by_id).
    #[must_use]
    pub fn into_retracted_by_id(self, record_id: RecordId) -> Self {
        self.retract_where(|f| f.record_id == record_id)
    }

    fn retract_where(mut self, mut pred: impl FnMut(&Fact) -> bool) -> Self {
        if !self.facts.iter().any(&mut pred) {
            return self;
        }

        let now = Utc::now();
        let facts = Arc::make_mut(&mut self.facts);
        let retracted = Arc::make_mut(&mut self.retracted);
        let mut kept = Vec::with_capacity(facts.len());
        for fact in facts.drain(..) {
            if pred(&fact) {
                retracted.push(Retraction {
                    fact,
                    retracted_at: now,
                });
            } else {
                kept.push(fact);
            }
        }
        *facts = kept;
        self.version += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (RecordIdAllocator, EntityId) {
        (RecordIdAllocator::new(), EntityId::from_name("w1"))
    }

    #[test]
    fn test_add_fact_does_not_mutate_previous() {
        let (alloc, w1) = setup();
        let a = FactLog::new().add_fact(&alloc, w1, "x", 100).unwrap();
        let b = a.add_fact(&alloc, w1, "y", 100).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert_eq!(b.version(), 2);
    }

    #[test]
    fn test_append_rejects_duplicate_record_id() {
        let (_, w1) = setup();
        let log = FactLog::new()
            .append(Fact::new(RecordId::new(1), w1, "x", 1))
            .unwrap();
        let err = log
            .append(Fact::new(RecordId::new(1), w1, "y", 2))
            .unwrap_err();
        assert_eq!(
            err,
            LogError::DuplicateRecordId {
                record_id: RecordId::new(1)
            }
        );
    }

    #[test]
    fn test_duplicate_rejected_after_retraction() {
        let (_, w1) = setup();
        let log = FactLog::new()
            .append(Fact::new(RecordId::new(5), w1, "x", 1))
            .unwrap()
            .retract_fact_by_id(RecordId::new(5));
        assert!(log.is_empty());
        assert!(log.append(Fact::new(RecordId::new(5), w1, "x", 1)).is_err());
    }

    #[test]
    fn test_replace_fact() {
        let (alloc, w1) = setup();
        let log = FactLog::new()
            .add_fact(&alloc, w1, "k", 1)
            .unwrap()
            .add_fact(&alloc, w1, "k", 2)
            .unwrap()
            .add_fact(&alloc, w1, "other", 0)
            .unwrap();

        let replaced = log.replace_fact(&alloc, w1, "k", 3).unwrap();
        let values: Vec<_> = replaced.facts_matching(w1, "k").map(|f| f.value.clone()).collect();
        assert_eq!(values, vec![Value::Int(3)]);
        assert_eq!(replaced.len(), 2);
        assert_eq!(replaced.retracted().len(), 2);
        assert_eq!(replaced.version(), log.version() + 1);
    }

    #[test]
    fn test_retract_fact_noop_when_absent() {
        let (alloc, w1) = setup();
        let log = FactLog::new().add_fact(&alloc, w1, "k", 1).unwrap();
        let same = log.retract_fact(w1, "missing");
        assert_eq!(same.len(), 1);
        assert_eq!(same.version(), log.version());
        assert!(same.retracted().is_empty());
    }

    #[test]
    fn test_retract_by_id_is_precise() {
        let (alloc, w1) = setup();
        let log = FactLog::new()
            .add_fact(&alloc, w1, "k", 1)
            .unwrap()
            .add_fact(&alloc, w1, "k", 1)
            .unwrap();
        let first = log.facts()[0].record_id;
        let second = log.facts()[1].record_id;

        let out = log.retract_fact_by_id(first);
        assert_eq!(out.len(), 1);
        assert!(out.get(second).is_some());
        assert!(out.get(first).is_none());
        assert_eq!(out.retracted()[0].fact.record_id, first);
    }

    #[test]
    fn test_push_on_shared_log_copies() {
        let (alloc, w1) = setup();
        let base = FactLog::new().add_fact(&alloc, w1, "k", 1).unwrap();
        let shared = base.clone();
        let grown = shared.into_added(&alloc, w1, "k", 2).unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(grown.len(), 2);
        assert!(!base.has_record(grown.facts()[1].record_id));
    }

    #[test]
    fn test_large_owned_chain() {
        let (_, w1) = setup();
        let log = FactLog::from_facts(
            (1..=100_000u64).map(|i| Fact::new(RecordId::new(i), w1, "items", 1)),
        )
        .unwrap();
        assert_eq!(log.len(), 100_000);
        assert!(log.has_record(RecordId::new(100_000)));

        let log = log.into_retracted_by_id(RecordId::new(1));
        assert!(log.has_record(RecordId::new(1)));
        assert!(log.push(Fact::new(RecordId::new(1), w1, "x", 1)).is_err());
    }

    #[test]
    fn test_from_facts_preserves_order() {
        let (_, w1) = setup();
        let log = FactLog::from_facts(vec![
            Fact::new(RecordId::new(3), w1, "a", 1),
            Fact::new(RecordId::new(1), w1, "b", 2),
        ])
        .unwrap();
        assert_eq!(log.facts()[0].key, "a");
        assert_eq!(log.facts()[1].key, "b");
        assert_eq!(log.facts_for(w1).count(), 2);
    }
}
