use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;

use crate::content::ContentHasher;
use crate::convert;
use crate::graph::{Graph, NodeHandle, TypeCode};
use crate::key::Key;
use crate::registry::{Factory, WrapperRegistry};
use crate::wrapper::{WrapError, Wrapper, WrapperId, WrapperKind};

/// Keeps graph nodes and wrappers in one-to-one correspondence.
///
/// Responsibilities:
/// - Arena: owns every wrapper record, addressed by [`WrapperId`]
/// - Correspondence: node handle -> wrapper (filled while wrapping) and
///   wrapper -> node handle (filled while unwrapping)
/// - Type index: lazily computed set of wrappers per type code
///
/// Both correspondence maps are registered before recursing into a node's or
/// wrapper's references, so a cycle finds the pending entry and stops.
///
/// One indexer serves one processing unit and is dropped with it. Sharing it
/// across independent units would match their nodes against stale entries.
pub struct WrapperIndexer {
    registry: Arc<WrapperRegistry>,
    next_id: u64,
    wrappers: HashMap<WrapperId, Arc<dyn Wrapper>>,
    // Declared type of every minted id, including wraps still in progress.
    kinds: HashMap<WrapperId, TypeCode>,
    type_index: HashMap<TypeCode, IndexSet<WrapperId>>,
    node_to_wrapper: HashMap<NodeHandle, WrapperId>,
    wrapper_to_node: HashMap<WrapperId, NodeHandle>,
    // Wrappers registered by the unwrap in progress, newest last.
    unwrap_log: Vec<WrapperId>,
}

impl WrapperIndexer {
    /// Creates an empty indexer dispatching through the given registry.
    pub fn new(registry: Arc<WrapperRegistry>) -> Self {
        WrapperIndexer {
            registry,
            next_id: 0,
            wrappers: HashMap::new(),
            kinds: HashMap::new(),
            type_index: HashMap::new(),
            node_to_wrapper: HashMap::new(),
            wrapper_to_node: HashMap::new(),
            unwrap_log: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<WrapperRegistry> {
        &self.registry
    }

    fn mint(&mut self, ty: TypeCode) -> WrapperId {
        let id = WrapperId(self.next_id);
        self.next_id += 1;
        self.kinds.insert(id, ty);
        id
    }

    /// Adds a wrapper built outside of `wrap`, returning its new identity.
    pub fn insert<W: Wrapper>(&mut self, wrapper: W) -> WrapperId {
        let id = self.mint(wrapper.declared_type());
        self.wrappers.insert(id, Arc::new(wrapper));
        id
    }

    /// Returns the wrapper record for an id.
    ///
    /// Ids whose wrap is still in progress have no record yet.
    pub fn wrapper(&self, id: WrapperId) -> Option<&dyn Wrapper> {
        self.wrappers.get(&id).map(|w| &**w)
    }

    /// Returns a shared handle to the wrapper record for an id.
    pub fn wrapper_arc(&self, id: WrapperId) -> Option<Arc<dyn Wrapper>> {
        self.wrappers.get(&id).cloned()
    }

    /// Returns the wrapper as `T`, if it exists and has that concrete type.
    pub fn get<T: WrapperKind>(&self, id: WrapperId) -> Option<&T> {
        self.wrapper(id).and_then(|w| w.as_any().downcast_ref::<T>())
    }

    /// Returns the wrapper as a mutable `T`.
    ///
    /// Returns `None` while another handle from
    /// [`wrapper_arc`](Self::wrapper_arc) is alive.
    pub fn get_mut<T: WrapperKind>(&mut self, id: WrapperId) -> Option<&mut T> {
        self.wrappers
            .get_mut(&id)
            .and_then(Arc::get_mut)
            .and_then(|w| w.as_any_mut().downcast_mut::<T>())
    }

    /// Returns the declared type of a minted id.
    pub fn declared_type(&self, id: WrapperId) -> Option<TypeCode> {
        self.kinds.get(&id).copied()
    }

    /// Returns the number of wrapper records held.
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    // Type index

    /// Returns the wrappers of exactly type `ty` in `graph`, one per distinct content.
    ///
    /// The set is computed on the first call and served from the cache until
    /// [`invalidate_type`](Self::invalidate_type). Each node is wrapped once,
    /// so content-equal nodes all stay wrapped even though only the first of
    /// their wrappers is listed.
    pub fn wrappers_of_type(
        &mut self,
        graph: &dyn Graph,
        ty: TypeCode,
    ) -> Result<&IndexSet<WrapperId>, WrapError> {
        self.populate(graph, ty)?;
        Ok(&self.type_index[&ty])
    }

    /// Applies [`wrappers_of_type`](Self::wrappers_of_type) to each type code.
    ///
    /// The result is positionally aligned with `types`.
    pub fn wrappers_of_types(
        &mut self,
        graph: &dyn Graph,
        types: &[TypeCode],
    ) -> Result<Vec<&IndexSet<WrapperId>>, WrapError> {
        for ty in types {
            self.populate(graph, *ty)?;
        }
        Ok(types.iter().map(|ty| &self.type_index[ty]).collect())
    }

    fn populate(&mut self, graph: &dyn Graph, ty: TypeCode) -> Result<(), WrapError> {
        if self.type_index.contains_key(&ty) {
            return Ok(());
        }
        let wrapped = convert::enumerate_and_wrap_by_type(self, graph, ty)?;
        let ids = self.distinct_by_content(&wrapped)?;
        log::debug!(
            "indexed {} distinct of {} wrappers of type {}",
            ids.len(),
            wrapped.len(),
            ty
        );
        self.type_index.insert(ty, ids.into_iter().collect());
        Ok(())
    }

    /// Drops the cached set for one type code.
    pub fn invalidate_type(&mut self, ty: TypeCode) -> bool {
        let removed = self.type_index.remove(&ty).is_some();
        if removed {
            log::debug!("invalidated type index for {}", ty);
        }
        removed
    }

    /// Drops every cached type set. Correspondence entries are kept.
    pub fn invalidate_all(&mut self) {
        log::debug!("invalidated {} type index entries", self.type_index.len());
        self.type_index.clear();
    }

    // Node -> wrapper correspondence

    pub fn is_wrapped(&self, node: NodeHandle) -> bool {
        self.node_to_wrapper.contains_key(&node)
    }

    pub fn wrapper_for(&self, node: NodeHandle) -> Option<WrapperId> {
        self.node_to_wrapper.get(&node).copied()
    }

    /// Records that `node` is represented by `wrapper`.
    ///
    /// Any other node previously registered for the same wrapper is dropped.
    /// Returns the wrapper previously registered for `node`.
    pub fn register_wrapped(
        &mut self,
        node: NodeHandle,
        wrapper: WrapperId,
    ) -> Option<WrapperId> {
        self.node_to_wrapper.retain(|other, w| *w != wrapper || *other == node);
        self.node_to_wrapper.insert(node, wrapper)
    }

    pub fn unregister_wrapped_node(&mut self, node: NodeHandle) -> Option<WrapperId> {
        self.node_to_wrapper.remove(&node)
    }

    /// Removes every entry that maps to `wrapper`, whatever node it is keyed by.
    pub fn unregister_wrapped(&mut self, wrapper: WrapperId) -> usize {
        let before = self.node_to_wrapper.len();
        self.node_to_wrapper.retain(|_, w| *w != wrapper);
        let removed = before - self.node_to_wrapper.len();
        if removed > 1 {
            log::warn!("cleared {} stale node entries for wrapper {}", removed, wrapper);
        }
        removed
    }

    // Wrapper -> node correspondence, keyed by identity

    pub fn is_unwrapped(&self, wrapper: WrapperId) -> bool {
        self.wrapper_to_node.contains_key(&wrapper)
    }

    pub fn node_for(&self, wrapper: WrapperId) -> Option<NodeHandle> {
        self.wrapper_to_node.get(&wrapper).copied()
    }

    /// Records that `wrapper` was emitted as `node`.
    ///
    /// Any other wrapper previously registered for the same node is dropped.
    /// Returns the node previously registered for `wrapper`.
    pub fn register_unwrapped(
        &mut self,
        wrapper: WrapperId,
        node: NodeHandle,
    ) -> Option<NodeHandle> {
        self.wrapper_to_node.retain(|other, n| *n != node || *other == wrapper);
        self.wrapper_to_node.insert(wrapper, node)
    }

    pub fn unregister_unwrapped(&mut self, wrapper: WrapperId) -> Option<NodeHandle> {
        self.wrapper_to_node.remove(&wrapper)
    }

    /// Removes every entry that maps to `node`, whatever wrapper it is keyed by.
    pub fn unregister_unwrapped_node(&mut self, node: NodeHandle) -> usize {
        let before = self.wrapper_to_node.len();
        self.wrapper_to_node.retain(|_, n| *n != node);
        let removed = before - self.wrapper_to_node.len();
        if removed > 1 {
            log::warn!("cleared {} stale wrapper entries for node {}", removed, node);
        }
        removed
    }

    // Wrapping

    /// Wraps a node with the wrapper registered for its type.
    ///
    /// An already wrapped node returns its existing wrapper. A node whose exact
    /// type has no wrapper uses its nearest registered ancestor's.
    pub fn wrap_node(
        &mut self,
        graph: &dyn Graph,
        node: NodeHandle,
    ) -> Result<WrapperId, WrapError> {
        if let Some(id) = self.wrapper_for(node) {
            return Ok(id);
        }
        let found = graph.type_of(node)?;
        let (_, factory) = self
            .registry
            .resolve(graph.types(), found)
            .ok_or(WrapError::UnknownTypeCode(found))?;
        self.wrap_with(graph, node, factory)
    }

    /// Wraps a node that must be a `T` or one of its subtypes.
    ///
    /// The concrete wrapper is still chosen by the node's own type, so a
    /// subtype with its own registration keeps its richer wrapper.
    pub fn wrap_as<T: WrapperKind>(
        &mut self,
        graph: &dyn Graph,
        node: NodeHandle,
    ) -> Result<WrapperId, WrapError> {
        self.wrap_bounded(graph, node, T::TYPE_CODE)
    }

    /// Wraps a node that must be of type `bound` or one of its subtypes.
    pub fn wrap_bounded(
        &mut self,
        graph: &dyn Graph,
        node: NodeHandle,
        bound: TypeCode,
    ) -> Result<WrapperId, WrapError> {
        let found = graph.type_of(node)?;
        if !graph.types().subsumes(bound, found) {
            return Err(WrapError::TypeMismatch {
                node,
                expected: bound,
                found,
            });
        }
        let id = self.wrap_node(graph, node)?;
        match self.declared_type(id) {
            Some(kind) if graph.types().subsumes(bound, kind) => Ok(id),
            Some(kind) => Err(WrapError::WrapperTypeMismatch {
                wrapper: id,
                expected: bound,
                found: kind,
            }),
            None => Err(WrapError::UnknownWrapper(id)),
        }
    }

    /// Wraps an unwrapped node with a wrapper built by `factory`.
    pub(crate) fn wrap_with(
        &mut self,
        graph: &dyn Graph,
        node: NodeHandle,
        factory: Factory,
    ) -> Result<WrapperId, WrapError> {
        let mut wrapper = factory();
        let id = self.mint(wrapper.declared_type());
        self.node_to_wrapper.insert(node, id);
        log::trace!("wrapping {} as {}", node, id);

        if let Err(err) = wrapper.wrap(node, graph, self) {
            self.discard_from(id);
            return Err(err);
        }
        self.wrappers.insert(id, Arc::from(wrapper));
        Ok(id)
    }

    // Nested wrappers minted during a failed wrap may point at its pending id.
    fn discard_from(&mut self, first: WrapperId) {
        let discarded = self.next_id - first.0;
        self.kinds.retain(|id, _| *id < first);
        self.wrappers.retain(|id, _| *id < first);
        self.node_to_wrapper.retain(|_, id| *id < first);
        log::debug!("discarded {} wrappers after failed wrap of {}", discarded, first);
    }

    // Unwrapping

    /// Emits a wrapper as a node of `target`, or returns the node it was
    /// already emitted as.
    ///
    /// The node is allocated and registered before the wrapper writes its
    /// fields, so references back to it (cycles) reuse the same node. On
    /// failure every wrapper registered during the call is unregistered again;
    /// nodes already allocated in `target` stay behind, unreferenced.
    pub fn unwrap(
        &mut self,
        id: WrapperId,
        target: &mut dyn Graph,
    ) -> Result<NodeHandle, WrapError> {
        if let Some(node) = self.node_for(id) {
            if node.graph() != target.id() {
                return Err(WrapError::CrossGraph {
                    wrapper: id,
                    node,
                    target: target.id(),
                });
            }
            return Ok(node);
        }
        let wrapper = self.wrapper_arc(id).ok_or(WrapError::UnknownWrapper(id))?;
        let node = target.allocate(wrapper.declared_type())?;
        let mark = self.unwrap_log.len();
        self.wrapper_to_node.insert(id, node);
        self.unwrap_log.push(id);
        log::trace!("unwrapping {} into {}", id, node);

        if let Err(err) = wrapper.unwrap_into(node, target, self) {
            let discarded = self.unwrap_log.split_off(mark);
            for id in &discarded {
                self.wrapper_to_node.remove(id);
            }
            log::debug!(
                "discarded {} node entries after failed unwrap of {}",
                discarded.len(),
                id
            );
            return Err(err);
        }
        if mark == 0 {
            self.unwrap_log.clear();
        }
        Ok(node)
    }

    // Content

    /// Computes the content key of a wrapper.
    pub fn content_key(&self, id: WrapperId) -> Result<Key, WrapError> {
        ContentHasher::new(self).key_of(id)
    }

    /// Compares two wrappers by content, ignoring identity and provenance.
    pub fn content_eq(&self, a: WrapperId, b: WrapperId) -> Result<bool, WrapError> {
        Ok(a == b || self.content_key(a)? == self.content_key(b)?)
    }

    /// Keeps the first wrapper of each distinct content, preserving order.
    pub fn distinct_by_content<'a, I>(&self, ids: I) -> Result<Vec<WrapperId>, WrapError>
    where
        I: IntoIterator<Item = &'a WrapperId>,
    {
        let mut seen = IndexSet::new();
        let mut distinct = Vec::new();
        for id in ids {
            if seen.insert(self.content_key(*id)?) {
                distinct.push(*id);
            }
        }
        Ok(distinct)
    }
}

impl std::fmt::Debug for WrapperIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperIndexer")
            .field("wrappers", &self.wrappers.len())
            .field("indexed_types", &self.type_index.len())
            .field("wrapped", &self.node_to_wrapper.len())
            .field("unwrapped", &self.wrapper_to_node.len())
            .finish()
    }
}
