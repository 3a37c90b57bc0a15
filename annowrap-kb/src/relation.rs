use annowrap_core::{
    wrap_list, ContentHasher, Graph, Key, NodeHandle, NodeReader, TypeCode, WrapError, Wrapper,
    WrapperId, WrapperIndexer, WrapperKind,
};

use crate::concept::{ConceptWrapper, EntityWrapper};
use crate::schema::{feature, RELATION};

/// A relation between entities.
///
/// Argument order is significant (subject before object) and is preserved
/// through wrap and unwrap.
#[derive(Debug, Clone, Default)]
pub struct RelationWrapper {
    pub concept: ConceptWrapper,
    pub arguments: Vec<WrapperId>,
}

impl RelationWrapper {
    pub fn new(concept: ConceptWrapper, arguments: Vec<WrapperId>) -> Self {
        RelationWrapper { concept, arguments }
    }

    pub fn name(&self) -> &str {
        &self.concept.name
    }
}

impl Wrapper for RelationWrapper {
    fn declared_type(&self) -> TypeCode {
        RELATION
    }

    fn provenance(&self) -> Option<&str> {
        self.concept.provenance.as_deref()
    }

    fn wrap(
        &mut self,
        node: NodeHandle,
        graph: &dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        let reader = NodeReader::new(graph, node, RELATION)?;
        self.concept.wrap_fields(&reader, indexer)?;
        self.arguments =
            wrap_list::<EntityWrapper>(indexer, graph, reader.ref_array(feature::ARGUMENTS)?)?;
        Ok(())
    }

    fn unwrap_into(
        &self,
        node: NodeHandle,
        target: &mut dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        self.concept.write_fields(node, target, indexer)?;
        let arguments = annowrap_core::unwrap_list(indexer, &self.arguments, target)?;
        target.set_feature(node, feature::ARGUMENTS, arguments.into())?;
        Ok(())
    }

    fn content_key(&self, hasher: &mut ContentHasher<'_>) -> Result<Key, WrapError> {
        let concept = self.concept.content(hasher)?;
        let arguments = hasher.keys_of(&self.arguments)?;
        Ok(Key::of(&(RELATION, concept, arguments)))
    }
}

impl WrapperKind for RelationWrapper {
    const TYPE_CODE: TypeCode = RELATION;
}
