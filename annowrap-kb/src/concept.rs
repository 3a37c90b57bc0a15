use annowrap_core::{
    wrap_list, ContentHasher, FeatureValue, Graph, Key, NodeHandle, NodeReader, TypeCode,
    WrapError, Wrapper, WrapperId, WrapperIndexer, WrapperKind,
};
use serde::Serialize;

use crate::mention::ConceptMentionWrapper;
use crate::schema::{feature, CONCEPT, ENTITY};

/// Fields shared by every concept: a canonical name, external identifiers,
/// the mentions that refer to it and the producer's tag.
#[derive(Debug, Clone, Default)]
pub struct ConceptWrapper {
    pub name: String,
    pub ids: Vec<String>,
    pub mentions: Vec<WrapperId>,
    pub provenance: Option<String>,
}

/// Content of the shared concept fields, with mentions replaced by their keys.
#[derive(Serialize)]
pub(crate) struct ConceptContent<'a> {
    name: &'a str,
    ids: &'a [String],
    mentions: Vec<Key>,
}

impl ConceptWrapper {
    pub fn new(name: impl Into<String>, ids: Vec<String>, mentions: Vec<WrapperId>) -> Self {
        ConceptWrapper {
            name: name.into(),
            ids,
            mentions,
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }

    /// Reads the shared concept fields; used by every concept subtype.
    pub(crate) fn wrap_fields(
        &mut self,
        reader: &NodeReader<'_>,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        self.name = reader.str(feature::NAME)?.to_string();
        self.ids = reader.str_array(feature::IDS)?.to_vec();
        self.provenance = reader.opt_str(feature::PROVENANCE)?.map(str::to_string);
        self.mentions = wrap_list::<ConceptMentionWrapper>(
            indexer,
            reader.graph(),
            reader.ref_array_or_empty(feature::MENTIONS)?,
        )?;
        Ok(())
    }

    /// Writes the shared concept fields onto an allocated node.
    pub(crate) fn write_fields(
        &self,
        node: NodeHandle,
        target: &mut dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        let mentions = annowrap_core::unwrap_list(indexer, &self.mentions, target)?;
        target.set_feature(node, feature::NAME, self.name.as_str().into())?;
        target.set_feature(node, feature::IDS, FeatureValue::StrArray(self.ids.clone()))?;
        target.set_feature(node, feature::MENTIONS, mentions.into())?;
        if let Some(provenance) = &self.provenance {
            target.set_feature(node, feature::PROVENANCE, provenance.as_str().into())?;
        }
        Ok(())
    }

    pub(crate) fn content<'a>(
        &'a self,
        hasher: &mut ContentHasher<'_>,
    ) -> Result<ConceptContent<'a>, WrapError> {
        Ok(ConceptContent {
            name: &self.name,
            ids: &self.ids,
            mentions: hasher.keys_of(&self.mentions)?,
        })
    }
}

impl Wrapper for ConceptWrapper {
    fn declared_type(&self) -> TypeCode {
        CONCEPT
    }

    fn provenance(&self) -> Option<&str> {
        self.provenance.as_deref()
    }

    fn wrap(
        &mut self,
        node: NodeHandle,
        graph: &dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        let reader = NodeReader::new(graph, node, CONCEPT)?;
        self.wrap_fields(&reader, indexer)
    }

    fn unwrap_into(
        &self,
        node: NodeHandle,
        target: &mut dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        self.write_fields(node, target, indexer)
    }

    fn content_key(&self, hasher: &mut ContentHasher<'_>) -> Result<Key, WrapError> {
        Ok(Key::of(&(CONCEPT, self.content(hasher)?)))
    }
}

impl WrapperKind for ConceptWrapper {
    const TYPE_CODE: TypeCode = CONCEPT;
}

/// A named entity: a concept with an optional semantic type.
#[derive(Debug, Clone, Default)]
pub struct EntityWrapper {
    pub concept: ConceptWrapper,
    pub semantic_type: Option<String>,
}

impl EntityWrapper {
    pub fn new(concept: ConceptWrapper, semantic_type: Option<String>) -> Self {
        EntityWrapper {
            concept,
            semantic_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.concept.name
    }
}

impl Wrapper for EntityWrapper {
    fn declared_type(&self) -> TypeCode {
        ENTITY
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
        let reader = NodeReader::new(graph, node, ENTITY)?;
        self.concept.wrap_fields(&reader, indexer)?;
        self.semantic_type = reader.opt_str(feature::SEMANTIC_TYPE)?.map(str::to_string);
        Ok(())
    }

    fn unwrap_into(
        &self,
        node: NodeHandle,
        target: &mut dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        self.concept.write_fields(node, target, indexer)?;
        if let Some(semantic_type) = &self.semantic_type {
            target.set_feature(node, feature::SEMANTIC_TYPE, semantic_type.as_str().into())?;
        }
        Ok(())
    }

    fn content_key(&self, hasher: &mut ContentHasher<'_>) -> Result<Key, WrapError> {
        let concept = self.concept.content(hasher)?;
        Ok(Key::of(&(ENTITY, concept, &self.semantic_type)))
    }
}

impl WrapperKind for EntityWrapper {
    const TYPE_CODE: TypeCode = ENTITY;
}
