//! Canonical issue record and change history entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One canonical issue, built incrementally from up to three sources.
///
/// A bare record may hold only CSV-derived fields; it is promoted to full
/// detail when XML fields are merged (XML replaces CSV wholesale) and
/// enriched with [`Change`] entries when change-history HTML is merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Scalar fields keyed by their upstream name (CSV column or XML tag)
    pub fields: BTreeMap<String, String>,

    /// Long-description entries, one sub-record per repeated XML child
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub long_desc: Vec<BTreeMap<String, String>>,

    /// Change history, in the order the tracker rendered it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
}

impl IssueRecord {
    /// The tracker-assigned issue id, if known.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("bug_id").map(String::as_str)
    }

    /// Get a scalar field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// One field change from an issue's activity table. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Acting user
    pub changed_by: String,

    /// Canonical field name (normalized through the alias table)
    pub field: String,

    /// Old value
    pub removed: String,

    /// New value
    pub added: String,

    /// Change timestamp as a timezone-naive ISO string
    pub date: String,
}
