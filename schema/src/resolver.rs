//! Per-component wire adapters.
//!
//! A resolver translates between an in-memory component and its wire form.
//! Code generators usually emit a `Data` struct per component implementing
//! [`SerializableData`] plus [`ComponentData`]; [`DataResolver`] turns that
//! pair into a [`ComponentResolver`]. Components that are their own wire form
//! use [`PlainResolver`].

use std::fmt;
use std::marker::PhantomData;

use bitstream::{BitRead, BitResult, BitWrite};

use crate::Component;

/// A value with a hand-written or generated bit-level encoding.
///
/// `deserialize` must issue exactly the reads mirroring `serialize`'s writes.
pub trait SerializableData {
    fn serialize(&self, writer: &mut dyn BitWrite) -> BitResult<()>;
    fn deserialize(&mut self, reader: &mut dyn BitRead) -> BitResult<()>;
}

/// Wire-form companion of a component.
pub trait ComponentData<C: Component>: SerializableData + Default {
    /// Copies the serialized fields out of `component`.
    fn fill_from(&mut self, component: &C);

    /// Writes the serialized fields into `component`.
    fn fill_component(&self, component: &mut C);
}

/// Serializes and deserializes one component type.
pub trait ComponentResolver<C>: Send + Sync {
    fn serialize(&self, component: &C, writer: &mut dyn BitWrite) -> BitResult<()>;
    fn deserialize(&self, reader: &mut dyn BitRead) -> BitResult<C>;
}

/// Resolver going through a [`ComponentData`] wire struct.
///
/// Fields the data struct does not carry keep their `Default` value on read.
pub struct DataResolver<C, D> {
    _marker: PhantomData<fn() -> (C, D)>,
}

impl<C, D> DataResolver<C, D> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C, D> Default for DataResolver<C, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, D> fmt::Debug for DataResolver<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataResolver").finish()
    }
}

impl<C, D> ComponentResolver<C> for DataResolver<C, D>
where
    C: Component,
    D: ComponentData<C>,
{
    fn serialize(&self, component: &C, writer: &mut dyn BitWrite) -> BitResult<()> {
        let mut data = D::default();
        data.fill_from(component);
        data.serialize(writer)
    }

    fn deserialize(&self, reader: &mut dyn BitRead) -> BitResult<C> {
        let mut data = D::default();
        data.deserialize(reader)?;
        let mut component = C::default();
        data.fill_component(&mut component);
        Ok(component)
    }
}

/// Resolver for components that implement [`SerializableData`] themselves.
pub struct PlainResolver<C> {
    _marker: PhantomData<fn() -> C>,
}

impl<C> PlainResolver<C> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C> Default for PlainResolver<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for PlainResolver<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainResolver").finish()
    }
}

impl<C> ComponentResolver<C> for PlainResolver<C>
where
    C: Component + SerializableData,
{
    fn serialize(&self, component: &C, writer: &mut dyn BitWrite) -> BitResult<()> {
        component.serialize(writer)
    }

    fn deserialize(&self, reader: &mut dyn BitRead) -> BitResult<C> {
        let mut component = C::default();
        component.deserialize(reader)?;
        Ok(component)
    }
}
