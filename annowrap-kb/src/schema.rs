//! Node types and feature names of the knowledge-base graph.

use annowrap_core::{GraphError, TypeCode, TypeSystem};

pub const CONCEPT: TypeCode = TypeCode(1);
pub const ENTITY: TypeCode = TypeCode(2);
pub const RELATION: TypeCode = TypeCode(3);
pub const CONCEPT_MENTION: TypeCode = TypeCode(4);
pub const QUESTION: TypeCode = TypeCode(5);

pub mod feature {
    pub const NAME: &str = "name";
    pub const IDS: &str = "ids";
    pub const MENTIONS: &str = "mentions";
    pub const PROVENANCE: &str = "provenance";
    pub const SEMANTIC_TYPE: &str = "semanticType";
    pub const ARGUMENTS: &str = "arguments";
    pub const BEGIN: &str = "begin";
    pub const END: &str = "end";
    pub const TEXT: &str = "text";
    pub const CONCEPT: &str = "concept";
    pub const ID: &str = "id";
    pub const SOURCE: &str = "source";
    pub const QUESTION_TYPE: &str = "questionType";
}

/// Returns the type system with every knowledge-base type declared.
pub fn type_system() -> Result<TypeSystem, GraphError> {
    let mut types = TypeSystem::new();
    types
        .declare(CONCEPT, "kb.Concept", None)?
        .declare(ENTITY, "kb.Entity", Some(CONCEPT))?
        .declare(RELATION, "kb.Relation", Some(CONCEPT))?
        .declare(CONCEPT_MENTION, "kb.ConceptMention", None)?
        .declare(QUESTION, "kb.Question", None)?;
    Ok(types)
}
