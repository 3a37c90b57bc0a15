use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::graph::{FeatureValue, Graph, GraphError, GraphId, NodeHandle, TypeCode, TypeSystem};

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug)]
struct NodeRecord {
    ty: TypeCode,
    features: IndexMap<String, FeatureValue>,
}

/// An in-memory graph backed by a vector of node records.
///
/// Useful for testing and as a reference implementation. Handles are never
/// reused, so a handle stays unique for the lifetime of the graph.
#[derive(Debug)]
pub struct MemoryGraph {
    id: GraphId,
    types: TypeSystem,
    nodes: Vec<NodeRecord>,
    by_type: HashMap<TypeCode, Vec<NodeHandle>>,
}

impl MemoryGraph {
    /// Creates an empty graph accepting the given types.
    pub fn new(types: TypeSystem) -> Self {
        MemoryGraph {
            id: GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)),
            types,
            nodes: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// Allocates a node and writes all the given features in order.
    pub fn create<I, K>(&mut self, ty: TypeCode, features: I) -> Result<NodeHandle, GraphError>
    where
        I: IntoIterator<Item = (K, FeatureValue)>,
        K: AsRef<str>,
    {
        let node = self.allocate(ty)?;
        for (name, value) in features {
            self.set_feature(node, name.as_ref(), value)?;
        }
        Ok(node)
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn record(&self, node: NodeHandle) -> Result<&NodeRecord, GraphError> {
        if node.graph() != self.id {
            return Err(GraphError::UnknownNode(node));
        }
        self.nodes
            .get(node.index() as usize)
            .ok_or(GraphError::UnknownNode(node))
    }

    fn contains(&self, node: NodeHandle) -> bool {
        self.record(node).is_ok()
    }
}

impl Graph for MemoryGraph {
    fn id(&self) -> GraphId {
        self.id
    }

    fn types(&self) -> &TypeSystem {
        &self.types
    }

    fn type_of(&self, node: NodeHandle) -> Result<TypeCode, GraphError> {
        Ok(self.record(node)?.ty)
    }

    fn feature(&self, node: NodeHandle, name: &str) -> Result<Option<&FeatureValue>, GraphError> {
        Ok(self.record(node)?.features.get(name))
    }

    fn enumerate(&self, ty: TypeCode) -> Vec<NodeHandle> {
        self.by_type.get(&ty).cloned().unwrap_or_default()
    }

    fn allocate(&mut self, ty: TypeCode) -> Result<NodeHandle, GraphError> {
        if !self.types.contains(ty) {
            return Err(GraphError::UnknownType(ty));
        }
        let node = NodeHandle::new(self.id, self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            ty,
            features: IndexMap::new(),
        });
        self.by_type.entry(ty).or_default().push(node);
        Ok(node)
    }

    fn set_feature(
        &mut self,
        node: NodeHandle,
        name: &str,
        value: FeatureValue,
    ) -> Result<(), GraphError> {
        self.record(node)?;
        if let Some(target) = value.references().find(|target| !self.contains(*target)) {
            return Err(GraphError::DanglingReference {
                node,
                feature: name.to_string(),
                target,
            });
        }
        self.nodes[node.index() as usize]
            .features
            .insert(name.to_string(), value);
        Ok(())
    }
}
