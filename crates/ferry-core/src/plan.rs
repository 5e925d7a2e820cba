//! Population plan types.
//!
//! A population plan is the output of the schema walker: a recursive
//! structure mirroring a schema's shape that tells a store's query API which
//! attributes to fetch eagerly. The plan is built by the engine and passed
//! opaquely to [`crate::ContentStore::fetch_entries`]; it never executes
//! fetches itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a single attribute should be populated when fetching entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldSelect {
    /// Fetch the full media asset record (with renditions).
    Media,
    /// Fetch only the identifying fields of the referenced entries
    /// (stable identifier and locale).
    RelationKeys,
    /// Recurse into the fragment with the nested plan.
    Fragment(PopulationPlan),
    /// Recurse into each possible union member, keyed by the member tag.
    /// A member selection is itself a [`FieldSelect`]: a nested fragment
    /// plan, or [`FieldSelect::All`] when the member schema is unknown or
    /// the depth limit was reached.
    Union(BTreeMap<String, FieldSelect>),
    /// Bounded-depth fallback: fetch everything below this point.
    All,
}

/// Recursive population plan for one schema level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PopulationPlan {
    pub fields: BTreeMap<String, FieldSelect>,
}

impl PopulationPlan {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields populated at this level (not recursive).
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}
