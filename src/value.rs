//! Value types that facts can hold.
//!
//! Whether a value is an entity reference is decided when the value is
//! built, never by inspecting it later: references are always
//! [`Value::Entity`].

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::geo::{LngLat, LngLatBounds};
use crate::search::FoundItem;

/// Possible values a fact can hold.
///
/// # Examples
///
/// ```
/// use factgraph::{LngLat, Value};
///
/// let bool_val = Value::Bool(true);
/// let float_val = Value::Float(3.14);
/// let point_val = Value::Point(LngLat::new(6.083611, 50.775555));
///
/// assert!(bool_val.is_bool());
/// assert!(float_val.is_float());
/// assert!(point_val.as_point().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Entity(EntityId),
    Point(LngLat),
    Bounds(LngLatBounds),
    Item(FoundItem),
    Structured(serde_json::Value),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_point(&self) -> Option<LngLat> {
        match self {
            Self::Point(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_bounds(&self) -> Option<LngLatBounds> {
        match self {
            Self::Bounds(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_item(&self) -> Option<&FoundItem> {
        match self {
            Self::Item(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Structured(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Entity(_) => "entity",
            Self::Point(_) => "point",
            Self::Bounds(_) => "bounds",
            Self::Item(_) => "item",
            Self::Structured(_) => "structured",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Entity(v) => write!(f, "entity:{v}"),
            Self::Point(v) => write!(f, "{v}"),
            Self::Bounds(v) => write!(f, "{v}"),
            Self::Item(v) => write!(f, "item:{:?}", v.label),
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Self::Entity(v)
    }
}

impl From<LngLat> for Value {
    fn from(v: LngLat) -> Self {
        Self::Point(v)
    }
}

impl From<LngLatBounds> for Value {
    fn from(v: LngLatBounds) -> Self {
        Self::Bounds(v)
    }
}

impl From<FoundItem> for Value {
    fn from(v: FoundItem) -> Self {
        Self::Item(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Structured(v)
    }
}
