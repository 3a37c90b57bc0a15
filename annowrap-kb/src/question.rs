use annowrap_core::{
    ContentHasher, Graph, Key, NodeHandle, NodeReader, TypeCode, WrapError, Wrapper,
    WrapperIndexer, WrapperKind,
};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::schema::{feature, QUESTION};

/// Kind of question, as assigned by question classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Factoid,
    Definition,
    MultiSentence,
    Compound,
    Abbreviation,
    #[default]
    Unclassified,
    List,
    Opinion,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Factoid => "FACTOID",
            QuestionType::Definition => "DEFINITION",
            QuestionType::MultiSentence => "MULTI_SENTENCE",
            QuestionType::Compound => "COMPOUND",
            QuestionType::Abbreviation => "ABBREVIATION",
            QuestionType::Unclassified => "UNCLASSIFIED",
            QuestionType::List => "LIST",
            QuestionType::Opinion => "OPINION",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown question type {0:?}")]
pub struct UnknownQuestionType(String);

impl FromStr for QuestionType {
    type Err = UnknownQuestionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FACTOID" => Ok(QuestionType::Factoid),
            "DEFINITION" => Ok(QuestionType::Definition),
            "MULTI_SENTENCE" => Ok(QuestionType::MultiSentence),
            "COMPOUND" => Ok(QuestionType::Compound),
            "ABBREVIATION" => Ok(QuestionType::Abbreviation),
            "UNCLASSIFIED" => Ok(QuestionType::Unclassified),
            "LIST" => Ok(QuestionType::List),
            "OPINION" => Ok(QuestionType::Opinion),
            other => Err(UnknownQuestionType(other.to_string())),
        }
    }
}

/// The input question of a processing unit.
#[derive(Debug, Clone, Default)]
pub struct QuestionWrapper {
    pub begin: i64,
    pub end: i64,
    pub id: String,
    pub source: String,
    pub text: String,
    pub question_type: QuestionType,
    pub provenance: Option<String>,
}

#[derive(Serialize)]
struct QuestionContent<'a> {
    ty: TypeCode,
    begin: i64,
    end: i64,
    id: &'a str,
    source: &'a str,
    text: &'a str,
    question_type: QuestionType,
}

impl Wrapper for QuestionWrapper {
    fn declared_type(&self) -> TypeCode {
        QUESTION
    }

    fn provenance(&self) -> Option<&str> {
        self.provenance.as_deref()
    }

    fn wrap(
        &mut self,
        node: NodeHandle,
        graph: &dyn Graph,
        _indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        let reader = NodeReader::new(graph, node, QUESTION)?;
        self.begin = reader.int(feature::BEGIN)?;
        self.end = reader.int(feature::END)?;
        self.id = reader.str(feature::ID)?.to_string();
        self.source = reader.str(feature::SOURCE)?.to_string();
        self.text = reader.str(feature::TEXT)?.to_string();
        let question_type = reader.str(feature::QUESTION_TYPE)?;
        self.question_type = question_type.parse().map_err(|_| WrapError::InvalidValue {
            node,
            feature: feature::QUESTION_TYPE.to_string(),
            value: question_type.to_string(),
        })?;
        self.provenance = reader.opt_str(feature::PROVENANCE)?.map(str::to_string);
        Ok(())
    }

    fn unwrap_into(
        &self,
        node: NodeHandle,
        target: &mut dyn Graph,
        _indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError> {
        target.set_feature(node, feature::BEGIN, self.begin.into())?;
        target.set_feature(node, feature::END, self.end.into())?;
        target.set_feature(node, feature::ID, self.id.as_str().into())?;
        target.set_feature(node, feature::SOURCE, self.source.as_str().into())?;
        target.set_feature(node, feature::TEXT, self.text.as_str().into())?;
        target.set_feature(node, feature::QUESTION_TYPE, self.question_type.as_str().into())?;
        if let Some(provenance) = &self.provenance {
            target.set_feature(node, feature::PROVENANCE, provenance.as_str().into())?;
        }
        Ok(())
    }

    fn content_key(&self, _hasher: &mut ContentHasher<'_>) -> Result<Key, WrapError> {
        Ok(Key::of(&QuestionContent {
            ty: QUESTION,
            begin: self.begin,
            end: self.end,
            id: &self.id,
            source: &self.source,
            text: &self.text,
            question_type: self.question_type,
        }))
    }
}

impl WrapperKind for QuestionWrapper {
    const TYPE_CODE: TypeCode = QUESTION;
}
