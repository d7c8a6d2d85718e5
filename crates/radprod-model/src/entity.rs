use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Category of a raw-name-to-canonical-name mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    Institution,
    Physician,
}

impl EntityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Institution => "institution",
            EntityCategory::Physician => "physician",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "institution" | "institutions" => Ok(EntityCategory::Institution),
            "physician" | "physicians" => Ok(EntityCategory::Physician),
            _ => Err(format!("Unknown entity category: {s}")),
        }
    }
}

/// A persistent mapping from a raw spreadsheet name to its canonical form.
///
/// Created once per unique (category, raw name) at first sight during
/// ingestion, with `formal_name` defaulting to the raw name. An operator may
/// later edit the formal name; that edit is authoritative and auto-discovery
/// must never overwrite it (`operator_edited` records the fact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameMapping {
    pub category: EntityCategory,
    pub raw_name: String,
    pub formal_name: String,
    /// Optional link to a canonical entity managed elsewhere in the system.
    pub formal_id: Option<u64>,
    pub operator_edited: bool,
    pub created_at: NaiveDateTime,
}

impl NameMapping {
    /// A freshly discovered mapping: formal name mirrors the raw name.
    pub fn discovered(
        category: EntityCategory,
        raw_name: impl Into<String>,
        created_at: NaiveDateTime,
    ) -> Self {
        let raw_name = raw_name.into();
        Self {
            category,
            formal_name: raw_name.clone(),
            raw_name,
            formal_id: None,
            operator_edited: false,
            created_at,
        }
    }
}
