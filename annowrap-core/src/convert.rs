//! Batch conversion between node lists and wrapper lists.
//!
//! All functions are fail-fast: the first element that fails aborts the call
//! and no partial list is returned.

use crate::graph::{Graph, NodeHandle, TypeCode};
use crate::indexer::WrapperIndexer;
use crate::wrapper::{WrapError, WrapperId, WrapperKind};

/// Wraps an ordered list of nodes that must all be `T` or a subtype of it.
pub fn wrap_list<T: WrapperKind>(
    indexer: &mut WrapperIndexer,
    graph: &dyn Graph,
    nodes: &[NodeHandle],
) -> Result<Vec<WrapperId>, WrapError> {
    wrap_list_bounded(indexer, graph, nodes, T::TYPE_CODE)
}

/// Wraps an ordered list of nodes that must all be `bound` or a subtype of it.
pub fn wrap_list_bounded(
    indexer: &mut WrapperIndexer,
    graph: &dyn Graph,
    nodes: &[NodeHandle],
    bound: TypeCode,
) -> Result<Vec<WrapperId>, WrapError> {
    let mut wrapped = Vec::with_capacity(nodes.len());
    for node in nodes {
        wrapped.push(indexer.wrap_bounded(graph, *node, bound)?);
    }
    Ok(wrapped)
}

/// Unwraps an ordered list of wrappers into `target`, preserving order.
pub fn unwrap_list(
    indexer: &mut WrapperIndexer,
    wrappers: &[WrapperId],
    target: &mut dyn Graph,
) -> Result<Vec<NodeHandle>, WrapError> {
    let mut nodes = Vec::with_capacity(wrappers.len());
    for id in wrappers {
        nodes.push(indexer.unwrap(*id, target)?);
    }
    Ok(nodes)
}

/// Wraps every node of exactly type `ty`, using the factory registered for it.
///
/// Nodes already wrapped through the indexer (for example as a reference of
/// an earlier node) keep their existing wrapper.
pub fn enumerate_and_wrap_by_type(
    indexer: &mut WrapperIndexer,
    graph: &dyn Graph,
    ty: TypeCode,
) -> Result<Vec<WrapperId>, WrapError> {
    let factory = indexer
        .registry()
        .factory(ty)
        .ok_or(WrapError::UnknownTypeCode(ty))?;

    let nodes = graph.enumerate(ty);
    let mut wrapped = Vec::with_capacity(nodes.len());
    for node in nodes {
        let id = match indexer.wrapper_for(node) {
            Some(id) => id,
            None => indexer.wrap_with(graph, node, factory)?,
        };
        wrapped.push(id);
    }
    Ok(wrapped)
}
