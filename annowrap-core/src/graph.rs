use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric code identifying a node type in a graph's type system.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct TypeCode(pub u32);

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-unique identifier of one graph instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct GraphId(pub u32);

/// Stable handle of a node, unique while the node is live.
///
/// The graph id is part of the handle, so handles minted by two different
/// graphs never compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeHandle {
    graph: GraphId,
    index: u32,
}

impl NodeHandle {
    pub fn new(graph: GraphId, index: u32) -> Self {
        NodeHandle { graph, index }
    }

    /// Returns the graph that minted this handle.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Returns the slot index inside the owning graph.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}:n{}", self.graph.0, self.index)
    }
}

/// Value stored in a node's feature slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Ref(NodeHandle),
    RefArray(Vec<NodeHandle>),
    StrArray(Vec<String>),
}

impl FeatureValue {
    /// Short name of the slot kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Str(_) => "string",
            FeatureValue::Int(_) => "integer",
            FeatureValue::Float(_) => "float",
            FeatureValue::Bool(_) => "boolean",
            FeatureValue::Ref(_) => "reference",
            FeatureValue::RefArray(_) => "reference array",
            FeatureValue::StrArray(_) => "string array",
        }
    }

    /// Iterates over every node handle this value points at.
    pub fn references(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        let slice: &[NodeHandle] = match self {
            FeatureValue::Ref(node) => std::slice::from_ref(node),
            FeatureValue::RefArray(nodes) => nodes,
            _ => &[],
        };
        slice.iter().copied()
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Str(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Str(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<NodeHandle> for FeatureValue {
    fn from(v: NodeHandle) -> Self {
        FeatureValue::Ref(v)
    }
}

impl From<Vec<NodeHandle>> for FeatureValue {
    fn from(v: Vec<NodeHandle>) -> Self {
        FeatureValue::RefArray(v)
    }
}

impl From<Vec<String>> for FeatureValue {
    fn from(v: Vec<String>) -> Self {
        FeatureValue::StrArray(v)
    }
}

/// Error type for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeHandle),
    #[error("type {0} is not declared")]
    UnknownType(TypeCode),
    #[error("type {0} is declared twice")]
    DuplicateType(TypeCode),
    #[error("type {ty} names undeclared parent {parent}")]
    UnknownParent { ty: TypeCode, parent: TypeCode },
    #[error("feature {feature} of {node} points at missing node {target}")]
    DanglingReference {
        node: NodeHandle,
        feature: String,
        target: NodeHandle,
    },
}

/// A declared node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub parent: Option<TypeCode>,
}

/// The set of node types a graph accepts, with single inheritance.
///
/// Parents must be declared before their children, so the parent relation
/// can never form a cycle.
#[derive(Debug, Clone, Default)]
pub struct TypeSystem {
    types: IndexMap<TypeCode, TypeDecl>,
}

impl TypeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a type, optionally as a subtype of an already declared one.
    pub fn declare(
        &mut self,
        code: TypeCode,
        name: impl Into<String>,
        parent: Option<TypeCode>,
    ) -> Result<&mut Self, GraphError> {
        if self.types.contains_key(&code) {
            return Err(GraphError::DuplicateType(code));
        }
        if let Some(parent) = parent {
            if !self.types.contains_key(&parent) {
                return Err(GraphError::UnknownParent { ty: code, parent });
            }
        }
        self.types.insert(
            code,
            TypeDecl {
                name: name.into(),
                parent,
            },
        );
        Ok(self)
    }

    pub fn contains(&self, code: TypeCode) -> bool {
        self.types.contains_key(&code)
    }

    pub fn get(&self, code: TypeCode) -> Option<&TypeDecl> {
        self.types.get(&code)
    }

    pub fn name(&self, code: TypeCode) -> Option<&str> {
        self.types.get(&code).map(|decl| decl.name.as_str())
    }

    pub fn parent(&self, code: TypeCode) -> Option<TypeCode> {
        self.types.get(&code).and_then(|decl| decl.parent)
    }

    /// Looks up a type code by its declared name.
    pub fn by_name(&self, name: &str) -> Option<TypeCode> {
        self.types
            .iter()
            .find(|(_, decl)| decl.name == name)
            .map(|(code, _)| *code)
    }

    /// Returns true if `sub` is `sup` or one of its transitive subtypes.
    pub fn subsumes(&self, sup: TypeCode, sub: TypeCode) -> bool {
        let mut current = Some(sub);
        while let Some(code) = current {
            if code == sup {
                return true;
            }
            current = self.parent(code);
        }
        false
    }

    /// Iterates over `code` and then each of its ancestors, nearest first.
    pub fn ancestry(&self, code: TypeCode) -> impl Iterator<Item = TypeCode> + '_ {
        std::iter::successors(Some(code), move |c| self.parent(*c))
    }

    pub fn codes(&self) -> impl Iterator<Item = TypeCode> + '_ {
        self.types.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A backing annotation graph.
///
/// Node types are immutable once allocated. Implementations decide how nodes
/// are stored; the wrapping layer only needs these operations.
pub trait Graph {
    /// Returns the process-unique id of this graph.
    fn id(&self) -> GraphId;

    /// Returns the type system this graph accepts.
    fn types(&self) -> &TypeSystem;

    /// Returns the type of a live node.
    fn type_of(&self, node: NodeHandle) -> Result<TypeCode, GraphError>;

    /// Reads a feature slot, or `None` if the slot was never written.
    fn feature(&self, node: NodeHandle, name: &str) -> Result<Option<&FeatureValue>, GraphError>;

    /// Lists every node of exactly `ty` (subtypes excluded), in allocation order.
    fn enumerate(&self, ty: TypeCode) -> Vec<NodeHandle>;

    /// Allocates a new node of the given type.
    fn allocate(&mut self, ty: TypeCode) -> Result<NodeHandle, GraphError>;

    /// Writes a feature slot, replacing any previous value.
    fn set_feature(
        &mut self,
        node: NodeHandle,
        name: &str,
        value: FeatureValue,
    ) -> Result<(), GraphError>;
}
