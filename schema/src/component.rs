//! Component marker trait, type descriptors and mask bits.

use std::fmt;

use crate::error::{SchemaError, SchemaResult};
use crate::hash::{type_hash, TypeHash};

/// Maximum number of component types one entity mask can track.
///
/// Bit 0 of the mask is reserved, leaving 31 usable bits.
pub const MAX_COMPONENT_TYPES: usize = 31;

/// A plain-data value type storable in a component pool.
///
/// `NAME` is the stable identity of the type: it feeds [`type_hash`] and must
/// be identical in every process that exchanges serialized state.
pub trait Component: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;
}

/// Bitmask of component types attached to an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentBits(u32);

impl ComponentBits {
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit of `bits` is set.
    #[must_use]
    pub const fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    /// Returns `true` if any bit of `bits` is set.
    #[must_use]
    pub const fn intersects(self, bits: u32) -> bool {
        self.0 & bits != 0
    }

    pub fn insert(&mut self, bits: u32) {
        self.0 |= bits;
    }

    pub fn remove(&mut self, bits: u32) {
        self.0 &= !bits;
    }

    /// Iterates the single-bit masks that are set, lowest first.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..u32::BITS)
            .map(|shift| 1u32 << shift)
            .filter(move |bit| self.0 & bit != 0)
    }
}

impl From<u32> for ComponentBits {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Registered identity of one component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ComponentType {
    index: u8,
    bit: u32,
    hash: TypeHash,
    name: &'static str,
}

impl ComponentType {
    /// Describes a type registered at `index`, with mask bit `1 << (index + 1)`.
    pub fn new(index: usize, name: &'static str) -> SchemaResult<Self> {
        if index >= MAX_COMPONENT_TYPES {
            return Err(SchemaError::TooManyComponentTypes {
                max: MAX_COMPONENT_TYPES,
            });
        }
        Ok(Self {
            index: index as u8,
            bit: 1u32 << (index + 1),
            hash: type_hash(name),
            name,
        })
    }

    pub fn of<C: Component>(index: usize) -> SchemaResult<Self> {
        Self::new(index, C::NAME)
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    #[must_use]
    pub const fn bit(&self) -> u32 {
        self.bit
    }

    #[must_use]
    pub const fn hash(&self) -> TypeHash {
        self.hash
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}
