//! Personas module — versioned agent identity records
//!
//! Personas carry a free-form configuration document, an optional parent for
//! lineage, and a version counter. Version snapshots and reusable templates
//! live alongside them in the same database.

pub mod store;
pub mod types;

pub use store::PersonaStore;
pub use types::{
    NewPersona, NewPersonaTemplate, NewPersonaVersion, Persona, PersonaTemplate, PersonaUpdate,
    PersonaVersion,
};
