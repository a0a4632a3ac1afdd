//! The fact store: the only write surface.
//!
//! [`FactStore`] holds the current [`FactLog`] snapshot behind a single
//! writer lock. Writes swap in a new immutable log; reads take a snapshot
//! and resolve it without holding the lock, so a resolution in progress is
//! never affected by later writes.

use std::sync::{Arc, RwLock};

use crate::changes::{ChangeHub, ChangeStream, LogChange};
use crate::config::StoreConfig;
use crate::entity::{Entity, EntityId};
use crate::error::{lock_err, FactGraphError, FactGraphResult};
use crate::fact::{RecordId, RecordIdAllocator};
use crate::interner::Interner;
use crate::log::FactLog;
use crate::mutation::{Mutation, MutationOutcome};
use crate::resolver::{self, EntityGraph, Walk};
use crate::schema;
use crate::search::{FoundItem, SearchRect, SearchRequest};
use crate::value::Value;

/// Thread-safe, single-writer fact store.
///
/// # Examples
///
/// ```
/// use factgraph::{FactStore, LngLat};
///
/// let store = FactStore::new();
/// let w1 = store.intern("w1");
/// let loc = store.fresh_id();
///
/// store.add_fact(w1, "location", loc).unwrap();
/// store.add_fact(loc, "geoPosition", LngLat::new(6.083611, 50.775555)).unwrap();
///
/// let graph = store.resolve_all().unwrap();
/// assert_eq!(graph.lookup(w1).geo_markers().len(), 1);
/// assert!(graph.lookup(w1).bounds().is_some());
/// ```
#[derive(Debug)]
pub struct FactStore {
    log: RwLock<FactLog>,
    interner: Arc<Interner>,
    records: Arc<RecordIdAllocator>,
    config: StoreConfig,
    changes: ChangeHub,
}

impl Default for FactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FactStore {
    /// Creates an empty store with its own interner and record allocator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: RwLock::new(FactLog::new()),
            interner: Arc::new(Interner::new()),
            records: Arc::new(RecordIdAllocator::new()),
            config: StoreConfig::default(),
            changes: ChangeHub::default(),
        }
    }

    /// Creates an empty store with a validated configuration.
    pub fn with_config(config: StoreConfig) -> FactGraphResult<Self> {
        Self::with_parts(
            Arc::new(Interner::new()),
            Arc::new(RecordIdAllocator::new()),
            config,
        )
    }

    /// Creates an empty store sharing an interner and record allocator.
    pub fn with_parts(
        interner: Arc<Interner>,
        records: Arc<RecordIdAllocator>,
        config: StoreConfig,
    ) -> FactGraphResult<Self> {
        config.validate()?;
        Ok(Self {
            log: RwLock::new(FactLog::new()),
            interner,
            records,
            config,
            changes: ChangeHub::default(),
        })
    }

    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    pub fn records(&self) -> &Arc<RecordIdAllocator> {
        &self.records
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Shorthand for [`Interner::intern`].
    pub fn intern(&self, name: &str) -> EntityId {
        self.interner.intern(name)
    }

    /// Shorthand for [`Interner::fresh_id`].
    pub fn fresh_id(&self) -> EntityId {
        self.interner.fresh_id()
    }

    /// Appends a fact and returns its record id.
    pub fn add_fact(
        &self,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> FactGraphResult<RecordId> {
        let outcome = self.commit_one(Mutation::add(entity, key, value))?;
        outcome
            .added
            .ok_or_else(|| FactGraphError::internal("add produced no record"))
    }

    /// Replaces every `(entity, key)` fact with one new fact.
    ///
    /// Not meant for multi-valued keys: all accumulated values are dropped.
    pub fn replace_fact(
        &self,
        entity: EntityId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> FactGraphResult<RecordId> {
        let key = key.into();
        if self.config.is_multi_valued(&key) {
            tracing::warn!(
                entity = %entity,
                key = %key,
                "replace on a multi-valued key drops every accumulated value"
            );
        }
        let outcome = self.commit_one(Mutation::replace(entity, key, value))?;
        outcome
            .added
            .ok_or_else(|| FactGraphError::internal("replace produced no record"))
    }

    /// Retracts every `(entity, key)` fact; returns how many were retracted.
    pub fn retract_fact(&self, entity: EntityId, key: &str) -> FactGraphResult<usize> {
        let outcome = self.commit_one(Mutation::retract(entity, key))?;
        Ok(outcome.removed.len())
    }

    /// Retracts one fact by record id; returns whether it was present.
    pub fn retract_fact_by_id(&self, record_id: RecordId) -> FactGraphResult<bool> {
        let outcome = self.commit_one(Mutation::retract_by_id(record_id))?;
        Ok(!outcome.removed.is_empty())
    }

    /// Validates and applies one mutation.
    pub fn apply(&self, mutation: Mutation) -> FactGraphResult<MutationOutcome> {
        mutation.validate()?;
        self.commit_one(mutation)
    }

    /// Validates and applies a batch atomically.
    ///
    /// Either every mutation lands or none does; readers never see a
    /// partially applied batch. Subscribers get a single `batch` change.
    pub fn apply_all(
        &self,
        mutations: impl IntoIterator<Item = Mutation>,
    ) -> FactGraphResult<Vec<MutationOutcome>> {
        let mutations: Vec<Mutation> = mutations.into_iter().collect();
        for m in &mutations {
            m.validate()?;
        }
        self.commit("batch", mutations)
    }

    fn commit_one(&self, mutation: Mutation) -> FactGraphResult<MutationOutcome> {
        let kind = mutation.kind();
        let mut outcomes = self.commit(kind, vec![mutation])?;
        Ok(outcomes.pop().unwrap_or_default())
    }

    fn commit(
        &self,
        kind: &str,
        mutations: Vec<Mutation>,
    ) -> FactGraphResult<Vec<MutationOutcome>> {
        let mut guard = self.log.write().map_err(|_| lock_err("store.commit"))?;

        let mut next = guard.clone();
        let mut outcomes = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            let (log, outcome) = mutation.apply_to(next, &self.records)?;
            next = log;
            outcomes.push(outcome);
        }

        if !outcomes.iter().any(MutationOutcome::is_effective) {
            tracing::trace!(kind, "mutation had no effect");
            return Ok(outcomes);
        }

        let change = LogChange {
            version: next.version(),
            kind: kind.to_string(),
            added: outcomes.iter().filter_map(|o| o.added).collect(),
            removed: outcomes.iter().flat_map(|o| o.removed.iter().copied()).collect(),
        };
        tracing::debug!(
            kind,
            version = change.version,
            added = change.added.len(),
            removed = change.removed.len(),
            "committed mutation"
        );

        *guard = next;
        // Published under the lock so subscribers see versions in order.
        self.changes.publish(&change);
        Ok(outcomes)
    }

    /// Current immutable log.
    pub fn snapshot(&self) -> FactGraphResult<FactLog> {
        let guard = self.log.read().map_err(|_| lock_err("store.snapshot"))?;
        Ok(guard.clone())
    }

    /// Resolves the current log into a fresh entity graph.
    pub fn resolve_all(&self) -> FactGraphResult<EntityGraph> {
        let log = self.snapshot()?;
        Ok(resolver::resolve(&log, &self.config))
    }

    /// Resolves the current log and returns one entity (empty if unknown).
    pub fn lookup(&self, id: EntityId) -> FactGraphResult<Entity> {
        Ok(self.resolve_all()?.lookup(id).into_owned())
    }

    /// Bounded walk from `root` using the configured depth cap.
    pub fn walk(&self, root: EntityId) -> FactGraphResult<Walk> {
        Ok(self.resolve_all()?.walk(root, self.config.max_traversal_depth))
    }

    /// Nested JSON view of `root` using the configured depth cap.
    pub fn json_tree(&self, root: EntityId) -> FactGraphResult<serde_json::Value> {
        Ok(self
            .resolve_all()?
            .to_json_tree(root, self.config.max_traversal_depth))
    }

    /// Subscribes to changes committed after this call.
    pub fn subscribe(&self) -> ChangeStream {
        self.changes.subscribe(self.config.change_channel_capacity)
    }

    /// Replaces the `items` of `search` with a batch of provider results.
    ///
    /// Existing items are retracted and one `items` fact per result is
    /// appended, in order, as one atomic batch. Returns the new record ids.
    pub fn assert_found_items(
        &self,
        search: EntityId,
        items: impl IntoIterator<Item = FoundItem>,
    ) -> FactGraphResult<Vec<RecordId>> {
        let mutations = std::iter::once(Mutation::retract(search, schema::ITEMS))
            .chain(items.into_iter().map(|item| Mutation::add(search, schema::ITEMS, item)));
        let outcomes = self.apply_all(mutations)?;
        Ok(outcomes.into_iter().filter_map(|o| o.added).collect())
    }

    /// Clears the `items` of `search`, e.g. after a failed provider call.
    pub fn clear_found_items(&self, search: EntityId) -> FactGraphResult<usize> {
        self.retract_fact(search, schema::ITEMS)
    }

    /// What a provider needs to run the search configured on `search`.
    ///
    /// `None` until `search` has a `category` and some entity referencing it
    /// has `bounds` to restrict the query to.
    pub fn search_request(&self, search: EntityId) -> FactGraphResult<Option<SearchRequest>> {
        let graph = self.resolve_all()?;
        let entity = graph.lookup(search);
        let Some(category) = entity.value(schema::CATEGORY).and_then(Value::as_string) else {
            return Ok(None);
        };

        let bounds = graph
            .referrers(search)
            .into_iter()
            .find_map(|owner| graph.get(owner).and_then(Entity::bounds));

        Ok(bounds.map(|bounds| SearchRequest {
            category: category.to_string(),
            rect: SearchRect::from_bounds(&bounds),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LngLat;

    #[test]
    fn test_add_and_lookup() {
        let store = FactStore::new();
        let w1 = store.intern("w1");
        store.add_fact(w1, "width", 300).unwrap();
        let entity = store.lookup(w1).unwrap();
        assert_eq!(entity.value("width"), Some(&Value::Int(300)));
    }

    #[test]
    fn test_record_ids_are_never_reused() {
        let store = FactStore::new();
        let w1 = store.intern("w1");
        let a = store.add_fact(w1, "k", 1).unwrap();
        assert!(store.retract_fact_by_id(a).unwrap());
        let b = store.add_fact(w1, "k", 1).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_retract_counts() {
        let store = FactStore::new();
        let w1 = store.intern("w1");
        store.add_fact(w1, "items", 1).unwrap();
        store.add_fact(w1, "items", 2).unwrap();
        assert_eq!(store.retract_fact(w1, "items").unwrap(), 2);
        assert_eq!(store.retract_fact(w1, "items").unwrap(), 0);
        assert!(!store.retract_fact_by_id(RecordId::new(999)).unwrap());
    }

    #[test]
    fn test_apply_rejects_blank_key() {
        let store = FactStore::new();
        let err = store.apply(Mutation::add(store.intern("w1"), "", 1)).unwrap_err();
        assert!(err.is_validation());
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_apply_all_is_atomic() {
        let store = FactStore::new();
        let w1 = store.intern("w1");
        let result = store.apply_all(vec![
            Mutation::add(w1, "a", 1),
            Mutation::add(w1, " ", 2),
        ]);
        assert!(result.is_err());
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let store = FactStore::new();
        let w1 = store.intern("w1");
        store.add_fact(w1, "k", 1).unwrap();
        let before = store.snapshot().unwrap();
        store.replace_fact(w1, "k", 2).unwrap();

        let old = resolver::resolve(&before, store.config());
        assert_eq!(old.lookup(w1).value("k"), Some(&Value::Int(1)));
        assert_eq!(store.lookup(w1).unwrap().value("k"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_search_request_needs_category_and_bounds() {
        let store = FactStore::new();
        let w1 = store.intern("w1");
        let search = store.fresh_id();
        store.add_fact(w1, "poiSearch", search).unwrap();
        assert_eq!(store.search_request(search).unwrap(), None);

        store.add_fact(search, "category", "catering.restaurant").unwrap();
        assert_eq!(store.search_request(search).unwrap(), None);

        let loc = store.fresh_id();
        store.add_fact(w1, "location", loc).unwrap();
        store
            .add_fact(loc, "geoPosition", LngLat::new(6.083611, 50.775555))
            .unwrap();

        let request = store.search_request(search).unwrap().unwrap();
        assert_eq!(request.category, "catering.restaurant");
        assert!(request.rect.north_west.lat > request.rect.south_east.lat);
    }
}
