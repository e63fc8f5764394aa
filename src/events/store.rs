//! Event store backed by the shared SQLite database

use crate::db::{decode_document, encode_document, parse_timestamp, Database};
use crate::error::Result;
use crate::events::types::*;
use rusqlite::{params, OptionalExtension, Row};

/// Append-only event log
#[derive(Debug, Clone)]
pub struct EventStore {
    db: Database,
}

impl EventStore {
    /// Create a store over an open database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append an event; the timestamp is assigned by the database
    pub fn append(&self, req: NewEvent) -> Result<Event> {
        let conn = self.db.conn()?;
        let details = encode_document(req.details.as_ref())?;

        conn.execute(
            "INSERT INTO events (event_type, details) VALUES (?1, ?2)",
            params![req.event_type, details],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, event_type = ?req.event_type, "Appended event");

        let raw = conn.query_row(
            "SELECT id, timestamp, event_type, details FROM events WHERE id = ?1",
            [id],
            RawEvent::from_row,
        )?;
        raw.into_event()
    }

    /// Get a single event by id
    pub fn get(&self, id: i64) -> Result<Option<Event>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                "SELECT id, timestamp, event_type, details FROM events WHERE id = ?1",
                [id],
                RawEvent::from_row,
            )
            .optional()?;
        raw.map(RawEvent::into_event).transpose()
    }

    /// Most recent events of one type, newest first
    pub fn list_by_type(&self, event_type: &str, limit: usize) -> Result<Vec<Event>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_type, details FROM events
             WHERE event_type = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![event_type, limit as i64], RawEvent::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawEvent::into_event).collect()
    }
}

struct RawEvent {
    id: i64,
    timestamp: String,
    event_type: Option<String>,
    details: Option<String>,
}

impl RawEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            event_type: row.get(2)?,
            details: row.get(3)?,
        })
    }

    fn into_event(self) -> Result<Event> {
        Ok(Event {
            id: self.id,
            timestamp: parse_timestamp(&self.timestamp)?,
            event_type: self.event_type,
            details: decode_document(self.details)?,
        })
    }
}
