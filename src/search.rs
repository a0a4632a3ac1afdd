//! Boundary with the external points-of-interest search provider.
//!
//! The core knows nothing about how results are fetched. It only fixes the
//! shape a found item must have before it is asserted as an `items` fact,
//! and the rectangle a provider query is issued for.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::{LngLat, LngLatBounds};
use crate::schema;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundItem {
    pub geo_point: LngLat,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FoundItem {
    /// Creates an item without tags.
    #[must_use]
    pub fn new(geo_point: LngLat, label: impl Into<String>) -> Self {
        Self {
            geo_point,
            label: label.into(),
            tags: Vec::new(),
        }
    }

    /// Adds a tag (e.g. a provider category such as `wheelchair.yes`).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Returns true if any tag is one of `accepted`.
    #[must_use]
    pub fn has_any_tag(&self, accepted: &[&str]) -> bool {
        self.tags.iter().any(|t| accepted.contains(&t.as_str()))
    }

    /// Returns true if the item is tagged as wheelchair-accessible.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.has_any_tag(schema::ACCESSIBLE_TAGS)
    }

    /// Rejects items with an unusable position or no label.
    pub fn validate(&self) -> Result<(), ValidationError> {
        LngLat::validated(self.geo_point.lng, self.geo_point.lat)?;
        if self.label.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "label".to_string(),
            });
        }
        Ok(())
    }
}

/// Rectangle a provider query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRect {
    pub north_west: LngLat,
    pub south_east: LngLat,
}

impl SearchRect {
    #[must_use]
    pub const fn from_bounds(bounds: &LngLatBounds) -> Self {
        Self {
            north_west: bounds.north_west(),
            south_east: bounds.south_east(),
        }
    }
}

/// Everything a provider needs to run one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub category: String,
    pub rect: SearchRect,
}
