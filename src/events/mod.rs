//! Events module — append-only audit log
//!
//! Each event carries a type tag and a free-form details document. Rows are
//! never updated or deleted.

pub mod store;
pub mod types;

pub use store::EventStore;
pub use types::{Event, NewEvent};
