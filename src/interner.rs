//! Identity interner.
//!
//! Maps stable external names to canonical [`EntityId`] tokens and hands out
//! fresh, unnamed tokens. Tokens are never removed: they live as long as the
//! interner does.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::entity::EntityId;

#[derive(Debug, Default)]
struct InternerState {
    by_name: HashMap<String, EntityId>,
    // `None` marks a fresh id that has no external name.
    names: HashMap<EntityId, Option<String>>,
}

impl InternerState {
    fn unused_random_id(&self) -> EntityId {
        loop {
            let id = EntityId::new();
            if !self.names.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Thread-safe name table.
///
/// Construct one per store (or share one via `Arc`); there is no ambient
/// global table, so tests can build isolated instances.
///
/// # Examples
///
/// ```
/// use factgraph::Interner;
///
/// let interner = Interner::new();
/// let a = interner.intern("w1");
/// assert_eq!(interner.intern("w1"), a);
/// assert_ne!(interner.fresh_id(), a);
/// ```
#[derive(Debug, Default)]
pub struct Interner {
    state: RwLock<InternerState>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token for `name`, registering it on first use.
    ///
    /// The token is derived from the name, so the same name maps to the same
    /// token across interner instances. Should the derived token already be
    /// held by something else, a random unused token is registered instead.
    pub fn intern(&self, name: &str) -> EntityId {
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(id) = state.by_name.get(name) {
                return *id;
            }
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have registered it in between.
        if let Some(id) = state.by_name.get(name) {
            return *id;
        }

        let derived = EntityId::from_name(name);
        let id = if state.names.contains_key(&derived) {
            tracing::warn!(
                name,
                %derived,
                "derived entity id already taken; allocating a random one"
            );
            state.unused_random_id()
        } else {
            derived
        };

        state.by_name.insert(name.to_string(), id);
        state.names.insert(id, Some(name.to_string()));
        tracing::trace!(name, %id, "interned entity name");
        id
    }

    /// Allocates a token with no external name.
    ///
    /// Two calls never return the same token, and a fresh token never
    /// collides with a named one.
    pub fn fresh_id(&self) -> EntityId {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let id = state.unused_random_id();
        state.names.insert(id, None);
        id
    }

    /// Returns the external name of `id`, if it was interned by name.
    #[must_use]
    pub fn name_of(&self, id: EntityId) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.names.get(&id).cloned().flatten()
    }

    /// Returns the name of `id`, or its UUID when it has none.
    #[must_use]
    pub fn label(&self, id: EntityId) -> String {
        self.name_of(id).unwrap_or_else(|| id.to_string())
    }

    /// Returns the token for `name` without registering it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<EntityId> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.by_name.get(name).copied()
    }

    /// Returns true if `id` was issued by this interner.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.names.contains_key(&id)
    }

    /// Number of issued tokens, named and fresh.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.names.len()
    }

    /// Returns true if no token has been issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_intern_same_name_same_id() {
        let interner = Interner::new();
        let a = interner.intern("w1");
        let b = interner.intern("w1");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_distinct_names() {
        let interner = Interner::new();
        assert_ne!(interner.intern("w1"), interner.intern("w2"));
    }

    #[test]
    fn test_intern_is_deterministic_across_instances() {
        let a = Interner::new();
        let b = Interner::new();
        assert_eq!(a.intern("loc1"), b.intern("loc1"));
    }

    #[test]
    fn test_fresh_ids_never_alias() {
        let interner = Interner::new();
        let named = interner.intern("w1");
        let f1 = interner.fresh_id();
        let f2 = interner.fresh_id();
        assert_ne!(f1, f2);
        assert_ne!(f1, named);
        assert_eq!(interner.name_of(f1), None);
        assert_eq!(interner.len(), 3);
    }

    #[test]
    fn test_name_lookup() {
        let interner = Interner::new();
        let id = interner.intern("loc1");
        assert_eq!(interner.name_of(id).as_deref(), Some("loc1"));
        assert_eq!(interner.label(id), "loc1");
        assert_eq!(interner.get("loc1"), Some(id));
        assert_eq!(interner.get("missing"), None);

        let fresh = interner.fresh_id();
        assert_eq!(interner.label(fresh), fresh.to_string());
        assert!(interner.contains(fresh));
        assert!(!interner.contains(EntityId::nil()));
    }

    #[test]
    fn test_concurrent_interning() {
        let interner = Arc::new(Interner::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = Arc::clone(&interner);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| interner.intern(&format!("n{i}")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<EntityId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for other in &results[1..] {
            assert_eq!(&results[0], other);
        }
        assert_eq!(interner.len(), 50);
    }
}
