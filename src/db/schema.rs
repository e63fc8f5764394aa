//! Relational schema for the persona store
//!
//! Applied idempotently on every open. Timestamps are UTC text in
//! `YYYY-MM-DD HH:MM:SS.SSS` form; documents are JSON text.

use rusqlite::Connection;

use crate::error::Result;

/// Tables owned by this schema, in creation order
pub const TABLES: [&str; 5] = [
    "conversations",
    "events",
    "personas",
    "persona_versions",
    "persona_templates",
];

/// Apply the schema to a connection.
pub fn apply(conn: &Connection) -> Result<()> {
    tracing::debug!("Applying persona store schema");
    conn.execute_batch(SCHEMA)?;
    tracing::info!(tables = TABLES.len(), "Persona store schema ready");
    Ok(())
}

const SCHEMA: &str = r#"

-- ============================================================================
-- Conversations
-- ============================================================================

CREATE TABLE IF NOT EXISTS conversations (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    transcription   TEXT,
    response        TEXT,
    persona         TEXT,
    scenario        TEXT,
    audio_file      TEXT,
    meta_data       TEXT
);

-- ============================================================================
-- Events (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS events (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    event_type      TEXT,
    details         TEXT
);
CREATE INDEX IF NOT EXISTS idx_events_event_type ON events(event_type);

-- ============================================================================
-- Personas
-- ============================================================================

CREATE TABLE IF NOT EXISTS personas (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    scenario_type   TEXT,
    created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    is_active       INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    version         INTEGER NOT NULL DEFAULT 1,
    parent_id       INTEGER REFERENCES personas(id),
    config_json     TEXT
);
CREATE INDEX IF NOT EXISTS idx_personas_scenario_type ON personas(scenario_type);
CREATE INDEX IF NOT EXISTS idx_personas_parent_id     ON personas(parent_id);

CREATE TRIGGER IF NOT EXISTS trg_personas_updated_at
AFTER UPDATE ON personas
FOR EACH ROW
WHEN NEW.updated_at = OLD.updated_at
BEGIN
    UPDATE personas
       SET updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
     WHERE id = NEW.id;
END;

-- ============================================================================
-- Persona Versions
-- ============================================================================

CREATE TABLE IF NOT EXISTS persona_versions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    persona_id      INTEGER NOT NULL REFERENCES personas(id),
    version_number  INTEGER NOT NULL,
    config_json     TEXT,
    created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    created_by      TEXT,
    change_notes    TEXT
);
CREATE INDEX IF NOT EXISTS idx_persona_versions_persona ON persona_versions(persona_id, version_number);

-- ============================================================================
-- Persona Templates
-- ============================================================================

CREATE TABLE IF NOT EXISTS persona_templates (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    description     TEXT,
    base_config     TEXT,
    category        TEXT
);
CREATE INDEX IF NOT EXISTS idx_persona_templates_category ON persona_templates(category);
"#;
