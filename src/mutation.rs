//! Mutation payloads.
//!
//! A [`Mutation`] is the serializable form of one write. Applying it to a
//! log is pure: the input log is left untouched and the outcome reports
//! exactly which record ids were added and removed.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{LogError, ValidationError};
use crate::fact::{RecordId, RecordIdAllocator};
use crate::geo::LngLat;
use crate::log::FactLog;
use crate::value::Value;

/// One write against the fact log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Append a fact.
    Add {
        entity: EntityId,
        key: String,
        value: Value,
    },

    /// Retract every `(entity, key)` fact, then append one.
    Replace {
        entity: EntityId,
        key: String,
        value: Value,
    },

    /// Retract every `(entity, key)` fact.
    Retract {
        entity: EntityId,
        key: String,
    },

    /// Retract one fact by record id.
    RetractById {
        record_id: RecordId,
    },
}

/// What a mutation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<RecordId>,
}

impl MutationOutcome {
    /// Returns true if the log changed.
    #[must_use]
    pub fn is_effective(&self) -> bool {
        self.added.is_some() || !self.removed.is_empty()
    }
}

impl Mutation {
    #[must_use]
    pub fn add(entity: EntityId, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Add {
            entity,
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn replace(entity: EntityId, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Replace {
            entity,
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn retract(entity: EntityId, key: impl Into<String>) -> Self {
        Self::Retract {
            entity,
            key: key.into(),
        }
    }

    #[must_use]
    pub const fn retract_by_id(record_id: RecordId) -> Self {
        Self::RetractById { record_id }
    }

    /// Short name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Replace { .. } => "replace",
            Self::Retract { .. } => "retract",
            Self::RetractById { .. } => "retract_by_id",
        }
    }

    /// Checks a mutation that came from outside the process.
    ///
    /// The direct API accepts any key and value; payloads going through
    /// [`FactStore::apply`](crate::FactStore::apply) must name a key and
    /// carry usable coordinates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Add { key, value, .. } | Self::Replace { key, value, .. } => {
                validate_key(key)?;
                match value {
                    Value::Point(p) => LngLat::validated(p.lng, p.lat).map(|_| ()),
                    Value::Item(item) => item.validate(),
                    _ => Ok(()),
                }
            }
            Self::Retract { key, .. } => validate_key(key),
            Self::RetractById { .. } => Ok(()),
        }
    }

    /// Applies this mutation to `log`, returning the new log.
    ///
    /// Takes the log by value so a batch applied to one working copy only
    /// pays for the copy once.
    ///
    /// # Errors
    ///
    /// Returns `LogError::DuplicateRecordId` if `alloc` is not the allocator
    /// that fed `log`.
    pub fn apply_to(
        self,
        log: FactLog,
        alloc: &RecordIdAllocator,
    ) -> Result<(FactLog, MutationOutcome), LogError> {
        match self {
            Self::Add { entity, key, value } => {
                let next = log.into_added(alloc, entity, key, value)?;
                let added = next.facts().last().map(|f| f.record_id);
                Ok((next, MutationOutcome { added, removed: Vec::new() }))
            }
            Self::Replace { entity, key, value } => {
                let removed = log.facts_matching(entity, &key).map(|f| f.record_id).collect();
                let next = log.into_replaced(alloc, entity, key, value)?;
                let added = next.facts().last().map(|f| f.record_id);
                Ok((next, MutationOutcome { added, removed }))
            }
            Self::Retract { entity, key } => {
                let removed = log.facts_matching(entity, &key).map(|f| f.record_id).collect();
                let next = log.into_retracted(entity, &key);
                Ok((next, MutationOutcome { added: None, removed }))
            }
            Self::RetractById { record_id } => {
                let removed = log
                    .get(record_id)
                    .map(|f| vec![f.record_id])
                    .unwrap_or_default();
                let next = log.into_retracted_by_id(record_id);
                Ok((next, MutationOutcome { added: None, removed }))
            }
        }
    }
}

fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::EmptyKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FoundItem;

    #[test]
    fn test_validate_rejects_blank_key() {
        let m = Mutation::add(EntityId::new(), "  ", 1);
        assert_eq!(m.validate(), Err(ValidationError::EmptyKey));
        assert!(Mutation::retract_by_id(RecordId::new(1)).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_coordinates() {
        let e = EntityId::new();
        let m = Mutation::replace(e, "geoPosition", LngLat::new(6.0, 95.0));
        assert!(matches!(m.validate(), Err(ValidationError::InvalidCoordinate { .. })));

        let item = FoundItem::new(LngLat::new(6.0, 50.0), " ");
        let m = Mutation::add(e, "items", item);
        assert!(matches!(m.validate(), Err(ValidationError::MissingField { .. })));
    }

    #[test]
    fn test_apply_replace_reports_removed() {
        let alloc = RecordIdAllocator::new();
        let e = EntityId::from_name("e");
        let (log, first) = Mutation::add(e, "k", 1).apply_to(FactLog::new(), &alloc).unwrap();
        let (log, second) = Mutation::replace(e, "k", 2).apply_to(log, &alloc).unwrap();

        assert_eq!(second.removed, vec![first.added.unwrap()]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.facts()[0].record_id, second.added.unwrap());
    }

    #[test]
    fn test_apply_retract_missing_is_ineffective() {
        let alloc = RecordIdAllocator::new();
        let (log, outcome) = Mutation::retract(EntityId::new(), "k")
            .apply_to(FactLog::new(), &alloc)
            .unwrap();
        assert!(!outcome.is_effective());
        assert_eq!(log.version(), 0);

        let (_, outcome) = Mutation::retract_by_id(RecordId::new(42))
            .apply_to(log, &alloc)
            .unwrap();
        assert!(!outcome.is_effective());
    }

    #[test]
    fn test_mutation_json_shape() {
        let json = serde_json::json!({
            "op": "replace",
            "entity": EntityId::from_name("w1"),
            "key": "width",
            "value": {"type": "int", "value": 300}
        });
        let m: Mutation = serde_json::from_value(json).unwrap();
        assert_eq!(m, Mutation::replace(EntityId::from_name("w1"), "width", 300));
        assert_eq!(m.kind(), "replace");
    }
}
