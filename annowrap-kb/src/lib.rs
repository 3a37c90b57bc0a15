//! Annowrap KB - knowledge-base wrappers built on annowrap-core
//!
//! Concepts carry a name, identifiers, mentions and a provenance tag.
//! Entities and relations are concepts; a relation's arguments are an
//! ordered list of entities. Mentions point back at their concept, so the
//! wrapper graph can be cyclic.

pub mod concept;
pub mod mention;
pub mod question;
pub mod relation;
pub mod schema;

use annowrap_core::{RegistryError, TypeSystem, WrapperRegistry};

pub use concept::{ConceptWrapper, EntityWrapper};
pub use mention::ConceptMentionWrapper;
pub use question::{QuestionType, QuestionWrapper};
pub use relation::RelationWrapper;
pub use schema::type_system;

/// Builds the registry of every knowledge-base wrapper, validated against
/// `types` (normally the result of [`type_system`]).
pub fn registry(types: &TypeSystem) -> Result<WrapperRegistry, RegistryError> {
    let mut registry = WrapperRegistry::new();
    registry
        .register::<ConceptWrapper>()?
        .register::<EntityWrapper>()?
        .register::<RelationWrapper>()?
        .register::<ConceptMentionWrapper>()?
        .register::<QuestionWrapper>()?;
    registry.validate(types)?;
    log::debug!("registered {} knowledge-base wrappers", registry.len());
    Ok(registry)
}
