//! Attribute keys with meaning to the engine.
//!
//! The log accepts any key; these are the ones resolution and computation
//! read or write.

/// Multi-valued key that accumulates instead of overwriting.
pub const ITEMS: &str = "items";

/// Display name of an entity.
pub const NAME: &str = "name";

/// Point position of a location entity.
pub const GEO_POSITION: &str = "geoPosition";

/// Region of an entity; asserted by a fact or derived from markers.
pub const BOUNDS: &str = "bounds";

/// Derived marker collection.
pub const GEO_MARKERS: &str = "geoMarkers";

/// Boolean flag restricting search results to accessible places.
pub const ACCESSIBILITY_INFO: &str = "accessibilityInfo";

/// Reference from a widget to a location entity.
pub const LOCATION: &str = "location";

/// Reference from a widget to a search entity.
pub const POI_SEARCH: &str = "poiSearch";

/// Provider category of a search entity.
pub const CATEGORY: &str = "category";

pub const WIDTH: &str = "width";
pub const HEIGHT: &str = "height";
pub const X: &str = "x";
pub const Y: &str = "y";

/// Item tags that satisfy the accessibility flag.
pub const ACCESSIBLE_TAGS: &[&str] = &["wheelchair", "wheelchair.yes", "wheelchair.limited"];
