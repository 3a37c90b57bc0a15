//! Content keys for wrappers, including cyclic wrapper graphs.
//!
//! A wrapper's key hashes its semantic fields with every referenced wrapper
//! replaced by that wrapper's key. A reference to a wrapper already on the
//! current path is encoded by its distance up the path instead of being
//! expanded, so hashing terminates and isomorphic cycles hash the same.

use std::collections::HashMap;

use crate::indexer::WrapperIndexer;
use crate::key::Key;
use crate::wrapper::{WrapError, WrapperId};

/// Computes content keys over the wrappers held by one indexer.
///
/// A hasher is meant for a single root; subtrees whose keys do not depend on
/// anything above them on the path are memoised for the rest of that pass.
pub struct ContentHasher<'a> {
    indexer: &'a WrapperIndexer,
    path: Vec<WrapperId>,
    memo: HashMap<WrapperId, Key>,
    // Lowest path position referenced from inside the frame being hashed.
    low: usize,
}

impl<'a> ContentHasher<'a> {
    pub fn new(indexer: &'a WrapperIndexer) -> Self {
        ContentHasher {
            indexer,
            path: Vec::new(),
            memo: HashMap::new(),
            low: usize::MAX,
        }
    }

    /// Returns the key of a referenced wrapper.
    pub fn key_of(&mut self, id: WrapperId) -> Result<Key, WrapError> {
        if let Some(pos) = self.path.iter().rposition(|on_path| *on_path == id) {
            self.low = self.low.min(pos);
            return Ok(Key::back_reference(self.path.len() - 1 - pos));
        }
        if let Some(key) = self.memo.get(&id) {
            return Ok(*key);
        }

        let indexer = self.indexer;
        let wrapper = indexer.wrapper(id).ok_or(WrapError::UnknownWrapper(id))?;
        let depth = self.path.len();
        let outer_low = std::mem::replace(&mut self.low, usize::MAX);

        self.path.push(id);
        let result = wrapper.content_key(self);
        self.path.pop();

        let low = self.low;
        self.low = outer_low.min(low);
        let key = result?;
        if low >= depth {
            self.memo.insert(id, key);
        }
        Ok(key)
    }

    /// Returns the keys of a list of references, preserving order.
    pub fn keys_of(&mut self, ids: &[WrapperId]) -> Result<Vec<Key>, WrapError> {
        ids.iter().map(|id| self.key_of(*id)).collect()
    }

    /// Returns the key of an optional reference.
    pub fn opt_key_of(&mut self, id: Option<WrapperId>) -> Result<Option<Key>, WrapError> {
        id.map(|id| self.key_of(id)).transpose()
    }
}
