//! Event record types

use crate::db::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: Option<String>,
    pub details: Option<Document>,
}

/// Insert request for an event (id and timestamp are database-generated)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub event_type: Option<String>,
    #[serde(default)]
    pub details: Option<Document>,
}

impl NewEvent {
    /// Event with a type tag and details document
    pub fn new(event_type: impl Into<String>, details: Document) -> Self {
        Self {
            event_type: Some(event_type.into()),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let mut details = Document::new();
        details.insert("persona".to_string(), serde_json::json!("Dispatcher"));
        let event = Event {
            id: 1,
            timestamp: Utc::now(),
            event_type: Some("persona.activated".to_string()),
            details: Some(details),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"eventType\":\"persona.activated\""));
        assert!(json.contains("\"persona\":\"Dispatcher\""));
    }

    #[test]
    fn test_new_event_without_details() {
        let req: NewEvent = serde_json::from_str(r#"{"eventType":"startup"}"#).unwrap();
        assert_eq!(req.event_type.as_deref(), Some("startup"));
        assert!(req.details.is_none());
    }
}
