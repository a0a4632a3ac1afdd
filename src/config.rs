//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FactGraphResult, ValidationError};
use crate::schema;

/// Default padding around each marker when deriving bounds.
pub const DEFAULT_MARKER_PADDING_METERS: f64 = 500.0;

/// Default depth cap for consumer-side traversal.
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 32;

/// Hard ceiling for any traversal depth.
///
/// Deeper JSON trees would exhaust the stack when serialized or dropped.
pub const MAX_TRAVERSAL_DEPTH: usize = 1024;

/// Default capacity of each change subscription.
pub const DEFAULT_CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Tunables for resolution, computation and change notification.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use factgraph::StoreConfig;
///
/// let config = StoreConfig::from_json_str(r#"{ "marker_padding_meters": 250.0 }"#).unwrap();
/// assert_eq!(config.marker_padding_meters, 250.0);
/// assert_eq!(config.multi_valued_keys, vec!["items".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Keys that accumulate into a list instead of overwriting.
    pub multi_valued_keys: Vec<String>,

    /// Radius each marker is padded by before bounds are unioned.
    pub marker_padding_meters: f64,

    /// Depth cap for [`EntityGraph::walk`](crate::EntityGraph::walk) and
    /// [`EntityGraph::to_json_tree`](crate::EntityGraph::to_json_tree) calls made
    /// through the store. At most [`MAX_TRAVERSAL_DEPTH`].
    pub max_traversal_depth: usize,

    /// Bounded capacity of each change subscription.
    pub change_channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            multi_valued_keys: vec![schema::ITEMS.to_string()],
            marker_padding_meters: DEFAULT_MARKER_PADDING_METERS,
            max_traversal_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
            change_channel_capacity: DEFAULT_CHANGE_CHANNEL_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> FactGraphResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every tunable is usable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.marker_padding_meters.is_finite() || self.marker_padding_meters < 0.0 {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "marker_padding_meters must be finite and non-negative, got {}",
                    self.marker_padding_meters
                ),
            });
        }
        if self.max_traversal_depth > MAX_TRAVERSAL_DEPTH {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "max_traversal_depth must be at most {MAX_TRAVERSAL_DEPTH}, got {}",
                    self.max_traversal_depth
                ),
            });
        }
        if self.change_channel_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "change_channel_capacity must be at least 1".to_string(),
            });
        }
        if self.multi_valued_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::InvalidConfig {
                reason: "multi_valued_keys must not contain blank keys".to_string(),
            });
        }
        Ok(())
    }

    /// Returns true if `key` accumulates instead of overwriting.
    #[must_use]
    pub fn is_multi_valued(&self, key: &str) -> bool {
        self.multi_valued_keys.iter().any(|k| k == key)
    }
}
