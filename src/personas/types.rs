//! Persona record types
//!
//! Row types mirror the `personas`, `persona_versions` and
//! `persona_templates` tables. `New*` types carry the caller-supplied
//! columns of an insert; everything else is defaulted by the database.

use crate::db::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, versioned configuration profile for a conversational agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: i64,
    pub name: String,
    pub scenario_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub version: i64,
    /// Lineage back-reference; resolve with `PersonaStore::parent_of`
    pub parent_id: Option<i64>,
    pub config: Option<Document>,
}

/// Insert request for a persona
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPersona {
    pub name: String,
    #[serde(default)]
    pub scenario_type: Option<String>,
    /// Defaults to true when omitted
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Defaults to 1 when omitted
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub config: Option<Document>,
}

impl NewPersona {
    /// Persona with only a name; all other columns take their defaults
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update for a persona. `None` leaves a column unchanged.
///
/// `parent_id` uses a nested option so the parent can be cleared
/// (`Some(None)`) as well as replaced.
#[derive(Debug, Clone, Default)]
pub struct PersonaUpdate {
    pub name: Option<String>,
    pub scenario_type: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub version: Option<i64>,
    pub parent_id: Option<Option<i64>>,
    pub config: Option<Option<Document>>,
}

impl PersonaUpdate {
    /// True when the update would not touch any column
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.scenario_type.is_none()
            && self.is_active.is_none()
            && self.version.is_none()
            && self.parent_id.is_none()
            && self.config.is_none()
    }
}

/// Immutable snapshot of a persona's configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaVersion {
    pub id: i64,
    pub persona_id: i64,
    pub version_number: i64,
    pub config: Option<Document>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub change_notes: Option<String>,
}

/// Insert request for a persona version
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPersonaVersion {
    pub persona_id: i64,
    pub version_number: i64,
    #[serde(default)]
    pub config: Option<Document>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub change_notes: Option<String>,
}

/// Reusable starting configuration, not linked to persona instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub base_config: Option<Document>,
    pub category: Option<String>,
}

/// Insert request for a persona template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPersonaTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_config: Option<Document>,
    #[serde(default)]
    pub category: Option<String>,
}
