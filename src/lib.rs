//! # factgraph - an append-only fact log materialized into an entity graph
//!
//! Every piece of application state is a [`Fact`]: an `(entity, key, value)`
//! triple tagged with a unique [`RecordId`]. The [`FactLog`] is the single
//! source of truth; the [`EntityGraph`] is derived from it on demand and is
//! never written to directly.
//!
//! ## Core Concepts
//!
//! - **Interner**: maps human-readable names to stable [`EntityId`]s
//! - **FactLog**: immutable, versioned sequence of facts
//! - **Resolver**: groups facts by entity and links references between them
//! - **Computations**: derived `geoMarkers` and `bounds` for map-bearing entities
//! - **FactStore**: the single write surface, with change subscriptions
//!
//! ## Usage
//!
//! ```rust
//! use factgraph::{FactStore, FoundItem, LngLat};
//!
//! let store = FactStore::new();
//! let w1 = store.intern("w1");
//! let search = store.fresh_id();
//!
//! store.add_fact(w1, "poiSearch", search)?;
//! store.add_fact(search, "category", "catering.restaurant")?;
//! store.assert_found_items(
//!     search,
//!     [FoundItem::new(LngLat::new(6.0839, 50.7753), "Café")],
//! )?;
//!
//! let graph = store.resolve_all()?;
//! assert_eq!(graph.lookup(w1).geo_markers().len(), 1);
//! # Ok::<(), factgraph::FactGraphError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod entity;
pub mod error;
pub mod fact;
pub mod geo;
pub mod schema;
pub mod search;
pub mod value;

// Log, resolution and derived attributes
pub mod compute;
pub mod config;
pub mod interner;
pub mod log;
pub mod resolver;

// Write surface
pub mod changes;
pub mod mutation;
pub mod presets;
pub mod store;

pub use entity::{Attribute, Entity, EntityId};
pub use error::{FactGraphError, FactGraphResult, LogError, ValidationError};
pub use fact::{Fact, RecordId, RecordIdAllocator};
pub use geo::{LngLat, LngLatBounds};
pub use search::{FoundItem, SearchRect, SearchRequest};
pub use value::Value;

pub use compute::{apply_computations, GeoMarker};
pub use config::StoreConfig;
pub use interner::Interner;
pub use log::{FactLog, Retraction};
pub use resolver::{
    resolve, resolve_references, EntityGraph, ResolvedFact, ResolvedValue, Walk,
};

pub use changes::{ChangeStream, LogChange};
pub use mutation::{Mutation, MutationOutcome};
pub use store::FactStore;
