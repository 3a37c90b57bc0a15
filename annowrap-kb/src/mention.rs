use annowrap_core::{
    ContentHasher, Graph, Key, NodeHandle, NodeReader, TypeCode, WrapError, Wrapper, WrapperId,
    WrapperIndexer, WrapperKind,
};
use serde::Serialize;

use crate::concept::ConceptWrapper;
use crate::schema::{feature, CONCEPT_MENTION};

/// A span of text that mentions a concept.
///
/// The back-reference to the concept closes the cycle concept -> mention ->
/// concept, which the indexer resolves to the already pending concept wrapper.
#[derive(Debug, Clone, Default)]
pub struct ConceptMentionWrapper {
    pub begin: i64,
    pub end: i64,
    pub text: Option<String>,
    pub concept: Option<WrapperId>,
    pub provenance: Option<String>,
}

#[derive(Serialize)]
struct MentionContent<'a> {
    ty: TypeCode,
    begin: i64,
    end: i64,
    text: Option<&'a str>,
    concept: Option<Key>,
}

impl ConceptMentionWrapper {
    pub fn new(begin: i64, end: i64, text: Option<String>, concept: Option<WrapperId>) -> Self {
        ConceptMentionWrapper {
            begin,
            end,
            text,
            concept,
            provenance: None,
        }
    }
}

impl Wrapper for ConceptMentionWrapper {
    fn declared_type(&self) -> TypeCode {
        CONCEPT_MENTION
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
        let reader = NodeReader::new(graph, node, CONCEPT_MENTION)?;
        self.begin = reader.int(feature::BEGIN)?;
        self.end = reader.int(feature::END)?;
        self.text = reader.opt_str(feature::TEXT)?.map(str::to_string);
        self.provenance = reader.opt_str(feature::PROVENANCE)?.map(str::to_string);
        self.concept = match reader.opt_ref(feature::CONCEPT)? {
            Some(concept) => Some(indexer.wrap_as::<ConceptWrapper>(graph, concept)?),
            None => None,
        };
        Ok(())
    }

    fn unwrap_into(
        &self,
        node: NodeHandle,
        target: &mut dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        target.set_feature(node, feature::BEGIN, self.begin.into())?;
        target.set_feature(node, feature::END, self.end.into())?;
        if let Some(text) = &self.text {
            target.set_feature(node, feature::TEXT, text.as_str().into())?;
        }
        if let Some(provenance) = &self.provenance {
            target.set_feature(node, feature::PROVENANCE, provenance.as_str().into())?;
        }
        if let Some(concept) = self.concept {
            let concept = indexer.unwrap(concept, target)?;
            target.set_feature(node, feature::CONCEPT, concept.into())?;
        }
        Ok(())
    }

    fn content_key(&self, hasher: &mut ContentHasher<'_>) -> Result<Key, WrapError> {
        Ok(Key::of(&MentionContent {
            ty: CONCEPT_MENTION,
            begin: self.begin,
            end: self.end,
            text: self.text.as_deref(),
            concept: hasher.opt_key_of(self.concept)?,
        }))
    }
}

impl WrapperKind for ConceptMentionWrapper {
    const TYPE_CODE: TypeCode = CONCEPT_MENTION;
}
