//! Core Dispatch 2.0 - conversational agent backend
//!
//! Two loosely coupled parts:
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │        Persona Store         │      │       Response Client        │
//! │  personas ─┬─ versions       │      │  prompt                      │
//! │            └─ parent (self)  │      │    │  system + user message  │
//! │  persona_templates           │      │    ▼                         │
//! │  conversations               │      │  POST {base}/chat/completions│
//! │  events (append-only)        │      │    │                         │
//! │         SQLite               │      │    ▼  first choice or None   │
//! └──────────────────────────────┘      └──────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`]: HTTP status endpoints
//! - [`config`]: Configuration loading and validation
//! - [`db`]: Pooled SQLite database and schema
//! - [`personas`]: Personas, version snapshots, templates
//! - [`conversations`]: Conversation transcripts
//! - [`events`]: Append-only event log
//! - [`llm`]: Chat-completion response client

pub mod api;
pub mod config;
pub mod conversations;
pub mod db;
pub mod error;
pub mod events;
pub mod llm;
pub mod personas;

pub use config::CoreDispatchConfig;
pub use error::{Error, Result};
