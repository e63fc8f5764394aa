//! Persona store backed by the shared SQLite database
//!
//! Uniqueness and referential integrity are enforced by the schema; this
//! layer only maps rows and surfaces rejected writes as typed errors. It does
//! not keep `Persona.version` in step with inserted versions.

use crate::db::{decode_document, encode_document, parse_timestamp, Database};
use crate::error::{Error, Result};
use crate::personas::types::*;
use rusqlite::types::ToSql;
use rusqlite::{params, OptionalExtension, Row};

const PERSONA_COLUMNS: &str =
    "id, name, scenario_type, created_at, updated_at, is_active, version, parent_id, config_json";

const VERSION_COLUMNS: &str =
    "id, persona_id, version_number, config_json, created_at, created_by, change_notes";

const TEMPLATE_COLUMNS: &str = "id, name, description, base_config, category";

/// Persona, version and template persistence
#[derive(Debug, Clone)]
pub struct PersonaStore {
    db: Database,
}

impl PersonaStore {
    /// Create a store over an open database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Personas
    // =========================================================================

    /// Insert a persona. Fails with `UniqueViolation` on a duplicate name and
    /// `ForeignKeyViolation` when `parent_id` does not exist.
    pub fn create_persona(&self, req: NewPersona) -> Result<Persona> {
        let conn = self.db.conn()?;
        let config = encode_document(req.config.as_ref())?;

        conn.execute(
            "INSERT INTO personas (name, scenario_type, is_active, version, parent_id, config_json)
             VALUES (?1, ?2, COALESCE(?3, 1), COALESCE(?4, 1), ?5, ?6)",
            params![
                req.name,
                req.scenario_type,
                req.is_active,
                req.version,
                req.parent_id,
                config
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, name = %req.name, "Created persona");

        drop(conn);
        self.require_persona(id)
    }

    /// Get a persona by id
    pub fn get_persona(&self, id: i64) -> Result<Option<Persona>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM personas WHERE id = ?1", PERSONA_COLUMNS),
                [id],
                RawPersona::from_row,
            )
            .optional()?;
        raw.map(RawPersona::into_persona).transpose()
    }

    /// Get a persona by its unique name
    pub fn get_persona_by_name(&self, name: &str) -> Result<Option<Persona>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM personas WHERE name = ?1", PERSONA_COLUMNS),
                [name],
                RawPersona::from_row,
            )
            .optional()?;
        raw.map(RawPersona::into_persona).transpose()
    }

    /// List personas ordered by id, optionally only active ones
    pub fn list_personas(&self, active_only: bool) -> Result<Vec<Persona>> {
        let conn = self.db.conn()?;
        let sql = if active_only {
            format!(
                "SELECT {} FROM personas WHERE is_active = 1 ORDER BY id",
                PERSONA_COLUMNS
            )
        } else {
            format!("SELECT {} FROM personas ORDER BY id", PERSONA_COLUMNS)
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RawPersona::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawPersona::into_persona).collect()
    }

    /// Apply a partial update. `updated_at` is refreshed by the database.
    pub fn update_persona(&self, id: i64, update: PersonaUpdate) -> Result<Persona> {
        if update.is_empty() {
            return self.require_persona(id);
        }

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(name) = update.name {
            assignments.push("name = ?");
            values.push(Box::new(name));
        }
        if let Some(scenario_type) = update.scenario_type {
            assignments.push("scenario_type = ?");
            values.push(Box::new(scenario_type));
        }
        if let Some(is_active) = update.is_active {
            assignments.push("is_active = ?");
            values.push(Box::new(is_active));
        }
        if let Some(version) = update.version {
            assignments.push("version = ?");
            values.push(Box::new(version));
        }
        if let Some(parent_id) = update.parent_id {
            assignments.push("parent_id = ?");
            values.push(Box::new(parent_id));
        }
        if let Some(config) = update.config {
            assignments.push("config_json = ?");
            values.push(Box::new(encode_document(config.as_ref())?));
        }
        values.push(Box::new(id));

        let sql = format!(
            "UPDATE personas SET {} WHERE id = ?",
            assignments.join(", ")
        );
        let conn = self.db.conn()?;
        let changed = conn.execute(
            &sql,
            rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
        )?;
        drop(conn);

        if changed == 0 {
            return Err(Error::NotFound(format!("Persona {} not found", id)));
        }
        tracing::debug!(id, "Updated persona");
        self.require_persona(id)
    }

    /// Resolve the parent of a persona, if it has one
    pub fn parent_of(&self, persona: &Persona) -> Result<Option<Persona>> {
        match persona.parent_id {
            Some(parent_id) => self.get_persona(parent_id),
            None => Ok(None),
        }
    }

    fn require_persona(&self, id: i64) -> Result<Persona> {
        self.get_persona(id)?
            .ok_or_else(|| Error::NotFound(format!("Persona {} not found", id)))
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Insert a version snapshot. Fails with `ForeignKeyViolation` when the
    /// owning persona does not exist.
    pub fn create_version(&self, req: NewPersonaVersion) -> Result<PersonaVersion> {
        let conn = self.db.conn()?;
        let config = encode_document(req.config.as_ref())?;

        conn.execute(
            "INSERT INTO persona_versions (persona_id, version_number, config_json, created_by, change_notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                req.persona_id,
                req.version_number,
                config,
                req.created_by,
                req.change_notes
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(
            id,
            persona_id = req.persona_id,
            version_number = req.version_number,
            "Created persona version"
        );

        let raw = conn.query_row(
            &format!("SELECT {} FROM persona_versions WHERE id = ?1", VERSION_COLUMNS),
            [id],
            RawVersion::from_row,
        )?;
        raw.into_version()
    }

    /// Versions of a persona ordered by version number
    pub fn list_versions(&self, persona_id: i64) -> Result<Vec<PersonaVersion>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM persona_versions WHERE persona_id = ?1 ORDER BY version_number, id",
            VERSION_COLUMNS
        ))?;
        let rows = stmt
            .query_map([persona_id], RawVersion::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawVersion::into_version).collect()
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Insert a template. Fails with `UniqueViolation` on a duplicate name.
    pub fn create_template(&self, req: NewPersonaTemplate) -> Result<PersonaTemplate> {
        let conn = self.db.conn()?;
        let base_config = encode_document(req.base_config.as_ref())?;

        conn.execute(
            "INSERT INTO persona_templates (name, description, base_config, category)
             VALUES (?1, ?2, ?3, ?4)",
            params![req.name, req.description, base_config, req.category],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, name = %req.name, "Created persona template");

        Ok(PersonaTemplate {
            id,
            name: req.name,
            description: req.description,
            base_config: req.base_config,
            category: req.category,
        })
    }

    /// Get a template by its unique name
    pub fn get_template(&self, name: &str) -> Result<Option<PersonaTemplate>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM persona_templates WHERE name = ?1",
                    TEMPLATE_COLUMNS
                ),
                [name],
                RawTemplate::from_row,
            )
            .optional()?;
        raw.map(RawTemplate::into_template).transpose()
    }

    /// List templates ordered by name, optionally within one category
    pub fn list_templates(&self, category: Option<&str>) -> Result<Vec<PersonaTemplate>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM persona_templates
             WHERE ?1 IS NULL OR category = ?1
             ORDER BY name",
            TEMPLATE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([category], RawTemplate::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawTemplate::into_template).collect()
    }
}

// =============================================================================
// Row mapping
// =============================================================================

struct RawPersona {
    id: i64,
    name: String,
    scenario_type: Option<String>,
    created_at: String,
    updated_at: String,
    is_active: bool,
    version: i64,
    parent_id: Option<i64>,
    config_json: Option<String>,
}

impl RawPersona {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            scenario_type: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            is_active: row.get(5)?,
            version: row.get(6)?,
            parent_id: row.get(7)?,
            config_json: row.get(8)?,
        })
    }

    fn into_persona(self) -> Result<Persona> {
        Ok(Persona {
            id: self.id,
            name: self.name,
            scenario_type: self.scenario_type,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            is_active: self.is_active,
            version: self.version,
            parent_id: self.parent_id,
            config: decode_document(self.config_json)?,
        })
    }
}

struct RawVersion {
    id: i64,
    persona_id: i64,
    version_number: i64,
    config_json: Option<String>,
    created_at: String,
    created_by: Option<String>,
    change_notes: Option<String>,
}

impl RawVersion {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            persona_id: row.get(1)?,
            version_number: row.get(2)?,
            config_json: row.get(3)?,
            created_at: row.get(4)?,
            created_by: row.get(5)?,
            change_notes: row.get(6)?,
        })
    }

    fn into_version(self) -> Result<PersonaVersion> {
        Ok(PersonaVersion {
            id: self.id,
            persona_id: self.persona_id,
            version_number: self.version_number,
            config: decode_document(self.config_json)?,
            created_at: parse_timestamp(&self.created_at)?,
            created_by: self.created_by,
            change_notes: self.change_notes,
        })
    }
}

struct RawTemplate {
    id: i64,
    name: String,
    description: Option<String>,
    base_config: Option<String>,
    category: Option<String>,
}

impl RawTemplate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            base_config: row.get(3)?,
            category: row.get(4)?,
        })
    }

    fn into_template(self) -> Result<PersonaTemplate> {
        Ok(PersonaTemplate {
            id: self.id,
            name: self.name,
            description: self.description,
            base_config: decode_document(self.base_config)?,
            category: self.category,
        })
    }
}
