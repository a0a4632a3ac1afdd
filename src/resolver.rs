//! Entity resolution.
//!
//! Turns a flat fact log into an [`EntityGraph`]: facts are grouped by
//! entity in log order, reference-valued facts point at arena entries
//! instead of embedding copies, and attribute maps are filled in with
//! last-write-wins (or accumulation, for multi-valued keys). The graph is
//! rebuilt from scratch on every read.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::compute;
use crate::config::{StoreConfig, MAX_TRAVERSAL_DEPTH};
use crate::entity::{Attribute, Entity, EntityId};
use crate::error::FactGraphResult;
use crate::fact::{Fact, RecordId};
use crate::log::FactLog;
use crate::value::Value;

/// Value of a resolved fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResolvedValue {
    /// Reference to an entity that is guaranteed to exist in the same graph.
    Entity(EntityId),
    /// Any non-reference value, as asserted.
    Value(Value),
}

impl ResolvedValue {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Entity(id) => Self::Entity(*id),
            other => Self::Value(other.clone()),
        }
    }

    /// Referenced entity, if this is a reference.
    #[must_use]
    pub const fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            Self::Value(_) => None,
        }
    }

    /// The non-reference value, if this is not a reference.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Entity(_) => None,
        }
    }
}

/// A fact as seen from inside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFact {
    pub record_id: RecordId,
    pub entity: EntityId,
    pub key: String,
    pub value: ResolvedValue,
}

impl ResolvedFact {
    fn from_fact(fact: &Fact) -> Self {
        Self {
            record_id: fact.record_id,
            entity: fact.entity,
            key: fact.key.clone(),
            value: ResolvedValue::from_value(&fact.value),
        }
    }

    /// Referenced entity, if the value is a reference.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.value.as_entity()
    }
}

/// Result of a bounded breadth-first walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    /// Visited entities with their distance from the root, in visit order.
    pub visited: Vec<(EntityId, usize)>,
    /// True if some reference was not followed because of the depth cap.
    pub truncated: bool,
}

/// Arena of resolved entities.
///
/// Iteration order is first-seen order in the fact log, never hash order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGraph {
    entities: BTreeMap<EntityId, Entity>,
    order: Vec<EntityId>,
}

impl EntityGraph {
    fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        if !self.entities.contains_key(&id) {
            self.order.push(id);
        }
        self.entities.entry(id).or_insert_with(|| Entity::empty(id))
    }

    pub(crate) fn set_attribute(&mut self, id: EntityId, key: &str, attr: Attribute) {
        self.entity_mut(id).data.insert(key.to_string(), attr);
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entity ids in first-seen order.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Entities in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Returns the entity for `id`, or an empty one if the graph has none.
    ///
    /// Never fails: an id nothing was asserted about is simply an entity
    /// without attributes.
    #[must_use]
    pub fn lookup(&self, id: EntityId) -> Cow<'_, Entity> {
        self.entities
            .get(&id)
            .map_or_else(|| Cow::Owned(Entity::empty(id)), Cow::Borrowed)
    }

    /// Lookup by stringified id. `None` if the key is not a valid id.
    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<Cow<'_, Entity>> {
        key.parse::<EntityId>().ok().map(|id| self.lookup(id))
    }

    /// All entities keyed by stringified id.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Entity> {
        self.iter().map(|e| (e.id.to_string(), e.clone())).collect()
    }

    /// Entities whose facts reference `id`, in first-seen order.
    #[must_use]
    pub fn referrers(&self, id: EntityId) -> Vec<EntityId> {
        self.iter()
            .filter(|e| e.facts.iter().any(|f| f.target() == Some(id)))
            .map(|e| e.id)
            .collect()
    }

    /// Breadth-first walk along references, at most `max_depth` hops from `root`.
    ///
    /// Each entity is visited once, so cycles terminate.
    #[must_use]
    pub fn walk(&self, root: EntityId, max_depth: usize) -> Walk {
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([(root, 0usize)]);
        let mut visited = Vec::new();
        let mut truncated = false;

        while let Some((id, depth)) = queue.pop_front() {
            visited.push((id, depth));
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            for target in entity.references() {
                if seen.contains(&target) {
                    continue;
                }
                if depth >= max_depth {
                    truncated = true;
                    continue;
                }
                seen.insert(target);
                queue.push_back((target, depth + 1));
            }
        }

        Walk { visited, truncated }
    }

    /// Nested JSON view rooted at `root`.
    ///
    /// References are expanded in place up to `max_depth` levels; an entity
    /// that was already expanded, or that lies past the cap, is rendered as
    /// `{"$ref": "<id>"}` instead. `max_depth` is clamped to
    /// [`MAX_TRAVERSAL_DEPTH`].
    #[must_use]
    pub fn to_json_tree(&self, root: EntityId, max_depth: usize) -> serde_json::Value {
        let max_depth = max_depth.min(MAX_TRAVERSAL_DEPTH);
        let mut expanded = HashSet::from([root]);
        let mut stack = vec![self.json_frame(root, 0, None)];

        while let Some(frame) = stack.last_mut() {
            let facts = frame.facts;
            if let Some(fact) = facts.get(frame.next) {
                frame.next += 1;
                match &fact.value {
                    ResolvedValue::Entity(target) => {
                        if frame.depth < max_depth && expanded.insert(*target) {
                            let child = self.json_frame(*target, frame.depth + 1, Some(fact));
                            stack.push(child);
                        } else {
                            frame.push_fact(fact, json_ref(*target));
                        }
                    }
                    ResolvedValue::Value(v) => {
                        let value = serde_json::to_value(v).unwrap_or(serde_json::Value::Null);
                        frame.push_fact(fact, value);
                    }
                }
                continue;
            }

            let Some(done) = stack.pop() else { break };
            let via = done.via;
            let node = self.finish_json_frame(done);
            match (stack.last_mut(), via) {
                (Some(parent), Some(fact)) => parent.push_fact(fact, node),
                _ => return node,
            }
        }

        serde_json::Value::Null
    }

    fn json_frame<'a>(
        &'a self,
        id: EntityId,
        depth: usize,
        via: Option<&'a ResolvedFact>,
    ) -> JsonFrame<'a> {
        JsonFrame {
            id,
            depth,
            via,
            facts: self
                .entities
                .get(&id)
                .map(|e| e.facts.as_slice())
                .unwrap_or_default(),
            next: 0,
            rendered: Vec::new(),
        }
    }

    fn finish_json_frame(&self, frame: JsonFrame<'_>) -> serde_json::Value {
        let data = self
            .entities
            .get(&frame.id)
            .and_then(|e| serde_json::to_value(&e.data).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        serde_json::json!({
            "id": frame.id.to_string(),
            "data": data,
            "facts": frame.rendered,
        })
    }

    /// Stable hex digest of the whole graph.
    ///
    /// Equal digests mean structurally identical graphs, computed
    /// attributes included.
    pub fn digest(&self) -> FactGraphResult<String> {
        let mut hasher = blake3::Hasher::new();
        for entity in self.iter() {
            serde_json::to_writer(&mut hasher, entity)?;
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// One entity being rendered by [`EntityGraph::to_json_tree`].
struct JsonFrame<'a> {
    id: EntityId,
    depth: usize,
    /// Fact of the parent frame this entity is rendered under.
    via: Option<&'a ResolvedFact>,
    facts: &'a [ResolvedFact],
    next: usize,
    rendered: Vec<serde_json::Value>,
}

impl JsonFrame<'_> {
    fn push_fact(&mut self, fact: &ResolvedFact, value: serde_json::Value) {
        self.rendered.push(serde_json::json!({
            "record_id": fact.record_id,
            "key": fact.key,
            "value": value,
        }));
    }
}

fn json_ref(id: EntityId) -> serde_json::Value {
    serde_json::json!({ "$ref": id.to_string() })
}

/// Groups facts into entities without computing derived attributes.
///
/// Keys listed in `multi_valued_keys` accumulate into
/// [`Attribute::List`]; every other key is last-write-wins.
#[must_use]
pub fn resolve_references(facts: &[Fact], multi_valued_keys: &[String]) -> EntityGraph {
    let mut graph = EntityGraph::default();

    for fact in facts {
        // Owner first so first-seen order follows the log.
        graph.entity_mut(fact.entity);
        if let Some(target) = fact.reference() {
            graph.entity_mut(target);
        }

        let entity = graph.entity_mut(fact.entity);
        entity.facts.push(ResolvedFact::from_fact(fact));

        if multi_valued_keys.iter().any(|k| k == &fact.key) {
            match entity.data.get_mut(&fact.key) {
                Some(Attribute::List(values)) => values.push(fact.value.clone()),
                _ => {
                    entity
                        .data
                        .insert(fact.key.clone(), Attribute::List(vec![fact.value.clone()]));
                }
            }
        } else {
            entity
                .data
                .insert(fact.key.clone(), Attribute::Value(fact.value.clone()));
        }
    }

    graph
}

/// Resolves the whole log: references first, then derived attributes.
#[must_use]
pub fn resolve(log: &FactLog, config: &StoreConfig) -> EntityGraph {
    let mut graph = resolve_references(log.facts(), &config.multi_valued_keys);
    compute::apply_computations(&mut graph, config);
    tracing::debug!(
        version = log.version(),
        facts = log.len(),
        entities = graph.len(),
        "resolved fact log"
    );
    graph
}
