use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::{self, Debug};

use crate::content::ContentHasher;
use crate::graph::{FeatureValue, Graph, GraphError, GraphId, NodeHandle, TypeCode};
use crate::indexer::WrapperIndexer;
use crate::key::Key;

/// Opaque identity of a wrapper, minted by the indexer that owns it.
///
/// Identity is independent of content: two wrappers with equal content still
/// have distinct ids.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct WrapperId(pub(crate) u64);

impl WrapperId {
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WrapperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Error type for wrap and unwrap operations.
#[derive(Debug, thiserror::Error)]
pub enum WrapError {
    #[error("node {node} has type {found}, expected {expected} or a subtype")]
    TypeMismatch {
        node: NodeHandle,
        expected: TypeCode,
        found: TypeCode,
    },
    #[error("wrapper {wrapper} has type {found}, expected {expected} or a subtype")]
    WrapperTypeMismatch {
        wrapper: WrapperId,
        expected: TypeCode,
        found: TypeCode,
    },
    #[error("node {node} is missing required feature {feature}")]
    MissingFeature { node: NodeHandle, feature: String },
    #[error("feature {feature} of {node} holds a {found}, expected a {expected}")]
    FeatureKind {
        node: NodeHandle,
        feature: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("feature {feature} of {node} has invalid value {value:?}")]
    InvalidValue {
        node: NodeHandle,
        feature: String,
        value: String,
    },
    #[error("no wrapper registered for type code {0}")]
    UnknownTypeCode(TypeCode),
    #[error("wrapper {0} is not held by this indexer")]
    UnknownWrapper(WrapperId),
    #[error("wrapper {wrapper} was already unwrapped to {node}, not into graph {target:?}")]
    CrossGraph {
        wrapper: WrapperId,
        node: NodeHandle,
        target: GraphId,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Downcasting support for type-erased wrappers.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A value object mirroring the content of one graph node.
///
/// Wrappers reference other wrappers by [`WrapperId`]; the indexer owns the
/// records. Referenced sub-nodes must be wrapped and unwrapped through the
/// indexer passed in, never a fresh one, so shared nodes map to one wrapper.
pub trait Wrapper: AsAny + Debug + Send + Sync {
    /// Returns the node type this wrapper mirrors.
    fn declared_type(&self) -> TypeCode;

    /// Returns the tag identifying the producer of this value, if any.
    fn provenance(&self) -> Option<&str>;

    /// Populates this wrapper from a node's features.
    fn wrap(
        &mut self,
        node: NodeHandle,
        graph: &dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError>;

    /// Writes this wrapper's fields onto a node already allocated in `target`.
    fn unwrap_into(
        &self,
        node: NodeHandle,
        target: &mut dyn Graph,
        indexer: &mut WrapperIndexer,
    ) -> Result<(), WrapError>;

    /// Computes the content key from semantic fields only.
    ///
    /// Referenced wrappers contribute their own keys through the hasher.
    fn content_key(&self, hasher: &mut ContentHasher<'_>) -> Result<Key, WrapError>;
}

/// A concrete wrapper type that can be built by the registry.
pub trait WrapperKind: Wrapper + Default {
    /// The node type this wrapper mirrors.
    const TYPE_CODE: TypeCode;
}

/// Typed read access to one node's feature slots.
///
/// Construction checks the node's type, so a reader only exists for nodes a
/// wrapper can accept.
#[derive(Clone, Copy)]
pub struct NodeReader<'g> {
    graph: &'g dyn Graph,
    node: NodeHandle,
}

impl<'g> NodeReader<'g> {
    /// Creates a reader, failing if the node's type is not `expected` or a subtype.
    pub fn new(
        graph: &'g dyn Graph,
        node: NodeHandle,
        expected: TypeCode,
    ) -> Result<Self, WrapError> {
        let found = graph.type_of(node)?;
        if !graph.types().subsumes(expected, found) {
            return Err(WrapError::TypeMismatch {
                node,
                expected,
                found,
            });
        }
        Ok(NodeReader { graph, node })
    }

    pub fn node(&self) -> NodeHandle {
        self.node
    }

    pub fn graph(&self) -> &'g dyn Graph {
        self.graph
    }

    pub fn get(&self, feature: &str) -> Result<Option<&'g FeatureValue>, WrapError> {
        Ok(self.graph.feature(self.node, feature)?)
    }

    fn required(&self, feature: &str) -> Result<&'g FeatureValue, WrapError> {
        self.get(feature)?.ok_or_else(|| WrapError::MissingFeature {
            node: self.node,
            feature: feature.to_string(),
        })
    }

    fn kind_error(&self, feature: &str, expected: &'static str, found: &FeatureValue) -> WrapError {
        WrapError::FeatureKind {
            node: self.node,
            feature: feature.to_string(),
            expected,
            found: found.kind(),
        }
    }

    pub fn str(&self, feature: &str) -> Result<&'g str, WrapError> {
        match self.required(feature)? {
            FeatureValue::Str(s) => Ok(s),
            other => Err(self.kind_error(feature, "string", other)),
        }
    }

    pub fn opt_str(&self, feature: &str) -> Result<Option<&'g str>, WrapError> {
        match self.get(feature)? {
            None => Ok(None),
            Some(FeatureValue::Str(s)) => Ok(Some(s)),
            Some(other) => Err(self.kind_error(feature, "string", other)),
        }
    }

    pub fn int(&self, feature: &str) -> Result<i64, WrapError> {
        match self.required(feature)? {
            FeatureValue::Int(v) => Ok(*v),
            other => Err(self.kind_error(feature, "integer", other)),
        }
    }

    /// Reads a string array; an absent slot reads as empty.
    pub fn str_array(&self, feature: &str) -> Result<&'g [String], WrapError> {
        match self.get(feature)? {
            None => Ok(&[]),
            Some(FeatureValue::StrArray(items)) => Ok(items),
            Some(other) => Err(self.kind_error(feature, "string array", other)),
        }
    }

    pub fn opt_ref(&self, feature: &str) -> Result<Option<NodeHandle>, WrapError> {
        match self.get(feature)? {
            None => Ok(None),
            Some(FeatureValue::Ref(node)) => Ok(Some(*node)),
            Some(other) => Err(self.kind_error(feature, "reference", other)),
        }
    }

    /// Reads a required reference array.
    pub fn ref_array(&self, feature: &str) -> Result<&'g [NodeHandle], WrapError> {
        match self.required(feature)? {
            FeatureValue::RefArray(nodes) => Ok(nodes),
            other => Err(self.kind_error(feature, "reference array", other)),
        }
    }

    /// Reads a reference array; an absent slot reads as empty.
    pub fn ref_array_or_empty(&self, feature: &str) -> Result<&'g [NodeHandle], WrapError> {
        match self.get(feature)? {
            None => Ok(&[]),
            Some(FeatureValue::RefArray(nodes)) => Ok(nodes),
            Some(other) => Err(self.kind_error(feature, "reference array", other)),
        }
    }
}
