//! Conversations module — transcripts of agent exchanges
//!
//! Independent of persona lineage: the persona and scenario are stored as
//! plain labels.

pub mod store;
pub mod types;

pub use store::ConversationStore;
pub use types::{Conversation, NewConversation};
