//! Conversation store backed by the shared SQLite database

use crate::conversations::types::*;
use crate::db::{decode_document, encode_document, parse_timestamp, Database};
use crate::error::Result;
use rusqlite::{params, OptionalExtension, Row};

const COLUMNS: &str =
    "id, timestamp, transcription, response, persona, scenario, audio_file, meta_data";

/// Conversation transcript persistence
#[derive(Debug, Clone)]
pub struct ConversationStore {
    db: Database,
}

impl ConversationStore {
    /// Create a store over an open database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a conversation; the timestamp is assigned by the database
    pub fn record(&self, req: NewConversation) -> Result<Conversation> {
        let conn = self.db.conn()?;
        let metadata = encode_document(req.metadata.as_ref())?;

        conn.execute(
            "INSERT INTO conversations (transcription, response, persona, scenario, audio_file, meta_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                req.transcription,
                req.response,
                req.persona,
                req.scenario,
                req.audio_file,
                metadata
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, persona = ?req.persona, "Recorded conversation");

        let raw = conn.query_row(
            &format!("SELECT {} FROM conversations WHERE id = ?1", COLUMNS),
            [id],
            RawConversation::from_row,
        )?;
        raw.into_conversation()
    }

    /// Get a conversation by id
    pub fn get(&self, id: i64) -> Result<Option<Conversation>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM conversations WHERE id = ?1", COLUMNS),
                [id],
                RawConversation::from_row,
            )
            .optional()?;
        raw.map(RawConversation::into_conversation).transpose()
    }

    /// Most recent conversations, newest first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Conversation>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM conversations ORDER BY id DESC LIMIT ?1",
            COLUMNS
        ))?;
        let rows = stmt
            .query_map([limit as i64], RawConversation::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(RawConversation::into_conversation)
            .collect()
    }
}

struct RawConversation {
    id: i64,
    timestamp: String,
    transcription: Option<String>,
    response: Option<String>,
    persona: Option<String>,
    scenario: Option<String>,
    audio_file: Option<String>,
    meta_data: Option<String>,
}

impl RawConversation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            transcription: row.get(2)?,
            response: row.get(3)?,
            persona: row.get(4)?,
            scenario: row.get(5)?,
            audio_file: row.get(6)?,
            meta_data: row.get(7)?,
        })
    }

    fn into_conversation(self) -> Result<Conversation> {
        Ok(Conversation {
            id: self.id,
            timestamp: parse_timestamp(&self.timestamp)?,
            transcription: self.transcription,
            response: self.response,
            persona: self.persona,
            scenario: self.scenario,
            audio_file: self.audio_file,
            metadata: decode_document(self.meta_data)?,
        })
    }
}
