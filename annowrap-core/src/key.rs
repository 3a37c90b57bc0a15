use serde::{Serialize, Serializer};
use std::fmt;

/// A 32-byte Blake3 hash of a wrapper's semantic content.
///
/// Keys are serialized as CBOR byte strings (major type 2), not as arrays,
/// so a key embedded in a parent's content record hashes compactly.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key([u8; 32]);

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl Key {
    /// Hashes the canonical CBOR encoding of a content record.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        let mut encoded = Vec::new();
        ciborium::into_writer(value, &mut encoded).expect("serialization should not fail");
        Key(blake3::hash(&encoded).into())
    }

    /// Key standing in for a reference back to a wrapper `distance` steps up
    /// the current hashing path (0 is a self reference).
    pub fn back_reference(distance: usize) -> Self {
        Key::of(&("back-reference", distance as u64))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}
