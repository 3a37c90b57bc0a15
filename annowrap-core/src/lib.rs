//! Annowrap maps a typed annotation graph onto content-comparable wrappers.
//!
//! Core concepts:
//! - **Graph**: Typed nodes addressed by stable handles, with feature slots
//! - **Wrapper**: A value object mirroring one node, compared by content
//! - **WrapperIndexer**: Keeps nodes and wrappers in one-to-one correspondence
//!   and caches the wrappers of each type
//! - **WrapperRegistry**: Static mapping from type code to wrapper factory
//! - **Key**: A Blake3 hash of a wrapper's semantic content
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use annowrap_core::{MemoryGraph, TypeCode, TypeSystem, WrapperIndexer, WrapperRegistry};
//!
//! let mut types = TypeSystem::new();
//! types.declare(TypeCode(1), "doc", None).unwrap();
//! let graph = MemoryGraph::new(types);
//!
//! // No wrapper is registered for "doc", so the registry refuses it up front
//! let registry = WrapperRegistry::new();
//! assert!(registry.require(&[TypeCode(1)]).is_err());
//!
//! let mut indexer = WrapperIndexer::new(Arc::new(registry));
//! assert!(indexer.wrappers_of_type(&graph, TypeCode(1)).is_err());
//! ```
//!
//! # Identity
//!
//! Node handles and wrapper ids are separate identity spaces. Lookups while
//! wrapping go by handle, lookups while unwrapping go by wrapper id; content
//! equality never merges two wrappers in the indexer.

mod config;
mod content;
pub mod convert;
mod graph;
mod indexer;
mod key;
mod memory;
mod registry;
mod wrapper;

pub use config::{ConfigError, StageConfig};
pub use content::ContentHasher;
pub use convert::{enumerate_and_wrap_by_type, unwrap_list, wrap_list, wrap_list_bounded};
pub use graph::{
    FeatureValue, Graph, GraphError, GraphId, NodeHandle, TypeCode, TypeDecl, TypeSystem,
};
pub use indexer::WrapperIndexer;
pub use key::Key;
pub use memory::MemoryGraph;
pub use registry::{Factory, RegistryError, WrapperRegistry};
pub use wrapper::{AsAny, NodeReader, WrapError, Wrapper, WrapperId, WrapperKind};
