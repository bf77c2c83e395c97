//! Deterministic component type hashing.

/// Stable cross-process key of a component type.
///
/// Derived from the component name alone, so it matches between builds and
/// processes even when registration indices do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeHash(i32);

impl TypeHash {
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl From<i32> for TypeHash {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<TypeHash> for i32 {
    fn from(hash: TypeHash) -> Self {
        hash.0
    }
}

/// Computes the stable hash of a component name.
///
/// The first four bytes of the BLAKE3 digest, read little-endian.
#[must_use]
pub fn type_hash(name: &str) -> TypeHash {
    let digest = blake3::hash(name.as_bytes());
    let bytes = digest.as_bytes();
    TypeHash(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
