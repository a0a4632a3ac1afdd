//! Entity identity and the materialized entity view.
//!
//! An [`EntityId`] is the stable identity token every fact hangs off. An
//! [`Entity`] is never stored: it is rebuilt from the fact log on every
//! resolution pass and lives only inside one [`EntityGraph`](crate::EntityGraph).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compute::GeoMarker;
use crate::geo::{LngLat, LngLatBounds};
use crate::resolver::ResolvedFact;
use crate::schema;
use crate::value::Value;

/// Namespace for name-derived entity ids.
const NAME_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_43c2_9b7e_4d0a_8e55_c1d2_3f40_71b9);

/// Opaque, comparable entity identity token.
///
/// Ids derived from the same name are always equal; random ids are
/// allocated with [`EntityId::new`]. Prefer going through an
/// [`Interner`](crate::Interner), which also guarantees that a named id
/// never aliases a fresh one.
///
/// # Examples
///
/// ```
/// use factgraph::EntityId;
///
/// assert_eq!(EntityId::from_name("w1"), EntityId::from_name("w1"));
/// assert_ne!(EntityId::from_name("w1"), EntityId::from_name("w2"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives the entity ID for an external name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&NAME_NAMESPACE, name.as_bytes()))
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil entity ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EntityId> for Uuid {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// One entry of an entity's `data` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Attribute {
    /// Last-write-wins value of a single-valued key.
    Value(Value),
    /// Accumulated values of a multi-valued key, in log order.
    List(Vec<Value>),
    /// Derived marker collection.
    Markers(Vec<GeoMarker>),
}

impl Attribute {
    /// Returns the single value, if this is a single-valued attribute.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the accumulated values, if this is a multi-valued attribute.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the markers, if this is a marker collection.
    #[must_use]
    pub fn as_markers(&self) -> Option<&[GeoMarker]> {
        match self {
            Self::Markers(v) => Some(v),
            _ => None,
        }
    }
}

/// The materialized view of all facts sharing an entity id.
///
/// `data` holds fact-asserted attributes with computed ones layered on top;
/// `facts` keeps every participating fact in log order. References to other
/// entities are ids into the owning graph, dereferenced on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identity of this entity.
    pub id: EntityId,

    /// Attribute map.
    pub data: BTreeMap<String, Attribute>,

    /// Resolved facts in log order.
    pub facts: Vec<ResolvedFact>,
}

impl Entity {
    /// Creates an entity with no attributes and no facts.
    #[must_use]
    pub fn empty(id: EntityId) -> Self {
        Self {
            id,
            data: BTreeMap::new(),
            facts: Vec::new(),
        }
    }

    /// Returns true if no fact has been asserted about this entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.data.is_empty()
    }

    /// Raw attribute lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.data.get(key)
    }

    /// Single value stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.data.get(key).and_then(Attribute::as_value)
    }

    /// Accumulated values stored under a multi-valued `key`.
    #[must_use]
    pub fn list(&self, key: &str) -> &[Value] {
        self.data.get(key).and_then(Attribute::as_list).unwrap_or(&[])
    }

    /// Referenced entity stored under `key`.
    #[must_use]
    pub fn reference(&self, key: &str) -> Option<EntityId> {
        self.value(key).and_then(Value::as_entity)
    }

    /// Boolean flag stored under `key`; absent or non-boolean reads as false.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.value(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The `name` attribute.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.value(schema::NAME).and_then(Value::as_string)
    }

    /// The `geoPosition` attribute.
    #[must_use]
    pub fn geo_position(&self) -> Option<LngLat> {
        self.value(schema::GEO_POSITION).and_then(Value::as_point)
    }

    /// The `bounds` attribute, asserted or derived.
    #[must_use]
    pub fn bounds(&self) -> Option<LngLatBounds> {
        self.value(schema::BOUNDS).and_then(Value::as_bounds)
    }

    /// The derived `geoMarkers` attribute.
    #[must_use]
    pub fn geo_markers(&self) -> &[GeoMarker] {
        self.data
            .get(schema::GEO_MARKERS)
            .and_then(Attribute::as_markers)
            .unwrap_or(&[])
    }

    /// Ids of entities referenced by this entity's facts, in log order, deduplicated.
    #[must_use]
    pub fn references(&self) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = Vec::new();
        for target in self.facts.iter().filter_map(ResolvedFact::target) {
            if !out.contains(&target) {
                out.push(target);
            }
        }
        out
    }
}
