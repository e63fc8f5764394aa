//! Conversation record types

use crate::db::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded exchange: what was heard and what was answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub transcription: Option<String>,
    pub response: Option<String>,
    pub persona: Option<String>,
    pub scenario: Option<String>,
    pub audio_file: Option<String>,
    pub metadata: Option<Document>,
}

/// Insert request for a conversation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub metadata: Option<Document>,
}
