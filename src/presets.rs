//! Named locations, search categories and the canned writes the editor
//! issues for them.
//!
//! Each helper goes through [`FactStore`] like any other caller; nothing
//! here bypasses the mutation API.

use crate::entity::EntityId;
use crate::error::FactGraphResult;
use crate::fact::RecordId;
use crate::geo::LngLat;
use crate::mutation::Mutation;
use crate::schema;
use crate::store::FactStore;

/// A selectable option: display name plus value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset<T> {
    /// Label shown to the user and stored as `name`.
    pub name: &'static str,
    pub value: T,
}

pub const AACHEN: Preset<LngLat> = Preset {
    name: "Aachen",
    value: LngLat::new(6.083611, 50.775555),
};

pub const BOSTON: Preset<LngLat> = Preset {
    name: "Boston",
    value: LngLat::new(-71.057083, 42.361145),
};

pub const SAN_FRANCISCO: Preset<LngLat> = Preset {
    name: "San Francisco",
    value: LngLat::new(-122.431297, 37.773972),
};

/// Locations offered by the editor, in display order.
pub const LOCATIONS: &[Preset<LngLat>] = &[AACHEN, BOSTON, SAN_FRANCISCO];

/// Search categories, valued by provider category id.
pub const POI_CATEGORIES: &[Preset<&str>] = &[
    Preset {
        name: "Hotel",
        value: "accommodation.hotel",
    },
    Preset {
        name: "Restaurant",
        value: "catering.restaurant",
    },
    Preset {
        name: "Museum",
        value: "entertainment.museum",
    },
];

/// Looks up a location preset by display name.
#[must_use]
pub fn location(name: &str) -> Option<Preset<LngLat>> {
    LOCATIONS.iter().find(|p| p.name == name).copied()
}

/// Looks up a category preset by provider value.
#[must_use]
pub fn category(value: &str) -> Option<Preset<&'static str>> {
    POI_CATEGORIES.iter().find(|p| p.value == value).copied()
}

/// Creates a location sub-entity for `owner` and returns its id.
pub fn add_location(
    store: &FactStore,
    owner: EntityId,
    preset: Preset<LngLat>,
) -> FactGraphResult<EntityId> {
    let location = store.fresh_id();
    store.apply_all([
        Mutation::add(owner, schema::LOCATION, location),
        Mutation::add(location, schema::NAME, preset.name),
        Mutation::add(location, schema::GEO_POSITION, preset.value),
    ])?;
    Ok(location)
}

/// Moves an existing location entity to another preset.
pub fn set_location(
    store: &FactStore,
    location: EntityId,
    preset: Preset<LngLat>,
) -> FactGraphResult<()> {
    store.apply_all([
        Mutation::replace(location, schema::NAME, preset.name),
        Mutation::replace(location, schema::GEO_POSITION, preset.value),
    ])?;
    Ok(())
}

/// Creates a search sub-entity for `owner` and returns its id.
pub fn add_poi_search(
    store: &FactStore,
    owner: EntityId,
    category: Preset<&'static str>,
) -> FactGraphResult<EntityId> {
    let search = store.fresh_id();
    store.apply_all([
        Mutation::add(owner, schema::POI_SEARCH, search),
        Mutation::add(search, schema::CATEGORY, category.value),
    ])?;
    Ok(search)
}

/// Switches the category of a search, or clears it with `None`.
pub fn set_category(
    store: &FactStore,
    search: EntityId,
    category: Option<Preset<&'static str>>,
) -> FactGraphResult<()> {
    match category {
        Some(preset) => {
            store.replace_fact(search, schema::CATEGORY, preset.value)?;
        }
        None => {
            store.retract_fact(search, schema::CATEGORY)?;
        }
    }
    Ok(())
}

/// Restricts a search's markers to wheelchair-accessible results.
pub fn mark_accessibility_filter(store: &FactStore, search: EntityId) -> FactGraphResult<RecordId> {
    store.add_fact(search, schema::ACCESSIBILITY_INFO, true)
}

/// Asserts the default two-widget layout and returns the widget ids.
pub fn seed_widgets(store: &FactStore) -> FactGraphResult<[EntityId; 2]> {
    let w1 = store.intern("w1");
    let w2 = store.intern("w2");
    let mut batch = Vec::new();
    for (id, x) in [(w1, 100), (w2, 500)] {
        batch.push(Mutation::add(id, schema::WIDTH, 300));
        batch.push(Mutation::add(id, schema::HEIGHT, 300));
        batch.push(Mutation::add(id, schema::X, x));
        batch.push(Mutation::add(id, schema::Y, 100));
    }
    store.apply_all(batch)?;
    Ok([w1, w2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_lookup_presets() {
        assert_eq!(location("Boston"), Some(BOSTON));
        assert_eq!(location("Paris"), None);
        assert_eq!(category("entertainment.museum").unwrap().name, "Museum");
    }

    #[test]
    fn test_add_location_creates_marker() {
        let store = FactStore::new();
        let [w1, _] = seed_widgets(&store).unwrap();
        let loc = add_location(&store, w1, AACHEN).unwrap();

        let graph = store.resolve_all().unwrap();
        let widget = graph.lookup(w1);
        assert_eq!(widget.reference(schema::LOCATION), Some(loc));
        assert_eq!(widget.geo_markers().len(), 1);
        assert_eq!(widget.geo_markers()[0].label.as_deref(), Some("Aachen"));
        assert_eq!(widget.value(schema::WIDTH), Some(&Value::Int(300)));
    }

    #[test]
    fn test_set_location_moves_marker() {
        let store = FactStore::new();
        let [w1, _] = seed_widgets(&store).unwrap();
        let loc = add_location(&store, w1, AACHEN).unwrap();
        set_location(&store, loc, BOSTON).unwrap();

        let widget = store.lookup(w1).unwrap();
        assert_eq!(widget.geo_markers()[0].position, BOSTON.value);
        assert!(widget.bounds().unwrap().contains(BOSTON.value));
        assert!(!widget.bounds().unwrap().contains(AACHEN.value));
        assert_eq!(store.lookup(loc).unwrap().facts.len(), 2);
    }

    #[test]
    fn test_poi_search_category() {
        let store = FactStore::new();
        let w1 = store.intern("w1");
        let search = add_poi_search(&store, w1, POI_CATEGORIES[0]).unwrap();
        assert_eq!(
            store.lookup(search).unwrap().value(schema::CATEGORY),
            Some(&Value::from("accommodation.hotel"))
        );

        set_category(&store, search, None).unwrap();
        assert!(store.lookup(search).unwrap().value(schema::CATEGORY).is_none());

        mark_accessibility_filter(&store, search).unwrap();
        assert!(store.lookup(search).unwrap().flag(schema::ACCESSIBILITY_INFO));
    }
}
