//! Derived attributes.
//!
//! Runs once per resolution over the finished reference graph and layers
//! `geoMarkers` and `bounds` on top of each entity's fact-asserted data.
//! Nothing computed here is ever written back to the log.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::entity::{Attribute, Entity, EntityId};
use crate::geo::{LngLat, LngLatBounds};
use crate::resolver::EntityGraph;
use crate::schema;
use crate::value::Value;

/// A point contributed to an entity by one of the entities it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMarker {
    pub position: LngLat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Entity the marker was collected for.
    pub owner: EntityId,
    /// Referenced entity the marker came from.
    pub source: EntityId,
    /// Drawn muted: the item fails an active filter on its source.
    #[serde(default)]
    pub muted: bool,
}

/// Collects markers for `entity` from the entities its facts reference.
///
/// Targets are deduplicated by id, so asserting the same reference twice
/// contributes its markers once. Order follows the entity's facts.
#[must_use]
pub fn collect_markers(graph: &EntityGraph, entity: &Entity) -> Vec<GeoMarker> {
    let mut seen = HashSet::new();
    let mut markers = Vec::new();

    for target_id in entity.facts.iter().filter_map(|f| f.target()) {
        if !seen.insert(target_id) {
            continue;
        }
        let Some(target) = graph.get(target_id) else {
            continue;
        };

        if let Some(position) = target.geo_position() {
            markers.push(GeoMarker {
                position,
                label: target.name().map(str::to_string),
                owner: entity.id,
                source: target_id,
                muted: false,
            });
        }

        let filter_accessible = target.flag(schema::ACCESSIBILITY_INFO);
        for item in target.list(schema::ITEMS).iter().filter_map(Value::as_item) {
            markers.push(GeoMarker {
                position: item.geo_point,
                label: Some(item.label.clone()),
                owner: entity.id,
                source: target_id,
                muted: filter_accessible && !item.is_accessible(),
            });
        }
    }

    markers
}

/// Smallest region enclosing every marker, each padded by `padding_meters`.
///
/// `None` when there are no markers.
#[must_use]
pub fn marker_bounds(markers: &[GeoMarker], padding_meters: f64) -> Option<LngLatBounds> {
    let (first, rest) = markers.split_first()?;
    let mut bounds = first.position.to_bounds(padding_meters);
    for marker in rest {
        bounds = bounds.extend(&marker.position.to_bounds(padding_meters));
    }
    Some(bounds)
}

/// Writes `geoMarkers` and, unless a `bounds` fact exists, `bounds` into
/// every entity that collected at least one marker.
///
/// All reads happen before any write, so the outcome does not depend on
/// the order entities are visited in.
pub fn apply_computations(graph: &mut EntityGraph, config: &StoreConfig) {
    let mut updates: Vec<(EntityId, Vec<GeoMarker>, Option<LngLatBounds>)> = Vec::new();

    for entity in graph.iter() {
        let markers = collect_markers(graph, entity);
        if markers.is_empty() {
            continue;
        }
        // An asserted bounds always wins over a derived one.
        let bounds = if entity.data.contains_key(schema::BOUNDS) {
            None
        } else {
            marker_bounds(&markers, config.marker_padding_meters)
        };
        updates.push((entity.id, markers, bounds));
    }

    for (id, markers, bounds) in updates {
        tracing::trace!(
            entity = %id,
            markers = markers.len(),
            derived_bounds = bounds.is_some(),
            "computed geo attributes"
        );
        graph.set_attribute(id, schema::GEO_MARKERS, Attribute::Markers(markers));
        if let Some(bounds) = bounds {
            graph.set_attribute(id, schema::BOUNDS, Attribute::Value(Value::Bounds(bounds)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::RecordIdAllocator;
    use crate::log::FactLog;
    use crate::resolver::resolve_references;
    use crate::search::FoundItem;

    const AACHEN: LngLat = LngLat::new(6.083611, 50.775555);
    const BOSTON: LngLat = LngLat::new(-71.057083, 42.361145);

    fn graph_for(log: &FactLog) -> EntityGraph {
        let config = StoreConfig::default();
        let mut graph = resolve_references(log.facts(), &config.multi_valued_keys);
        apply_computations(&mut graph, &config);
        graph
    }

    #[test]
    fn test_marker_from_location() {
        let alloc = RecordIdAllocator::new();
        let w1 = EntityId::from_name("w1");
        let loc = EntityId::from_name("loc1");
        let log = FactLog::new()
            .add_fact(&alloc, w1, "location", loc)
            .unwrap()
            .add_fact(&alloc, loc, "name", "Aachen")
            .unwrap()
            .add_fact(&alloc, loc, "geoPosition", AACHEN)
            .unwrap();

        let graph = graph_for(&log);
        let w1 = graph.get(w1).unwrap();
        let markers = w1.geo_markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].position, AACHEN);
        assert_eq!(markers[0].label.as_deref(), Some("Aachen"));
        assert_eq!(markers[0].source, loc);
        assert!(w1.bounds().unwrap().contains(AACHEN));

        // The location itself references nothing, so it gets nothing derived.
        assert!(graph.get(loc).unwrap().geo_markers().is_empty());
        assert!(graph.get(loc).unwrap().bounds().is_none());
    }

    #[test]
    fn test_bounds_enclose_all_markers() {
        let alloc = RecordIdAllocator::new();
        let w1 = EntityId::from_name("w1");
        let a = EntityId::from_name("a");
        let b = EntityId::from_name("b");
        let log = FactLog::new()
            .add_fact(&alloc, w1, "location", a)
            .unwrap()
            .add_fact(&alloc, w1, "location", b)
            .unwrap()
            .add_fact(&alloc, a, "geoPosition", AACHEN)
            .unwrap()
            .add_fact(&alloc, b, "geoPosition", BOSTON)
            .unwrap();

        let graph = graph_for(&log);
        let bounds = graph.get(w1).unwrap().bounds().unwrap();
        assert!(bounds.contains(AACHEN));
        assert!(bounds.contains(BOSTON));
        assert_eq!(graph.get(w1).unwrap().geo_markers().len(), 2);
    }

    #[test]
    fn test_items_expand_into_markers() {
        let alloc = RecordIdAllocator::new();
        let w1 = EntityId::from_name("w1");
        let search = EntityId::from_name("search");
        let accessible =
            FoundItem::new(LngLat::new(6.08, 50.77), "Museum").with_tag("wheelchair.yes");
        let plain = FoundItem::new(LngLat::new(6.09, 50.78), "Hotel");

        let log = FactLog::new()
            .add_fact(&alloc, w1, "poiSearch", search)
            .unwrap()
            .add_fact(&alloc, search, "items", accessible)
            .unwrap()
            .add_fact(&alloc, search, "items", plain)
            .unwrap();

        let graph = graph_for(&log);
        let markers = graph.get(w1).unwrap().geo_markers().to_vec();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].label.as_deref(), Some("Museum"));
        assert!(!markers[0].muted);
        assert!(!markers[1].muted);

        let filtered = log
            .add_fact(&alloc, search, "accessibilityInfo", true)
            .unwrap();
        let graph = graph_for(&filtered);
        let markers = graph.get(w1).unwrap().geo_markers();
        assert!(!markers[0].muted);
        assert!(markers[1].muted);
    }

    #[test]
    fn test_malformed_position_is_ignored() {
        let alloc = RecordIdAllocator::new();
        let w1 = EntityId::from_name("w1");
        let loc = EntityId::from_name("loc1");
        let log = FactLog::new()
            .add_fact(&alloc, w1, "location", loc)
            .unwrap()
            .add_fact(&alloc, loc, "geoPosition", "somewhere")
            .unwrap();

        let graph = graph_for(&log);
        let w1 = graph.get(w1).unwrap();
        assert!(w1.geo_markers().is_empty());
        assert!(w1.bounds().is_none());
        assert!(w1.get(schema::GEO_MARKERS).is_none());
    }

    #[test]
    fn test_marker_bounds_empty() {
        assert!(marker_bounds(&[], 500.0).is_none());
    }
}
