//! Per-component-type pools behind a type-erased interface.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bitstream::{BitRead, BitWrite};
use schema::{Component, ComponentResolver, ComponentType};

use crate::error::{CorruptReason, EcsError, EcsResult};
use crate::pool::SparsePool;

/// Operations [`EcsState`](crate::EcsState) needs from a pool of any type.
pub trait AnyPool: Send + Sync {
    fn component_type(&self) -> ComponentType;

    /// Whether the pool can write its rows; pools without a resolver cannot.
    fn is_serializable(&self) -> bool;

    fn contains(&self, entity_id: u32) -> bool;
    fn mark_as_removed(&mut self, entity_id: u32) -> bool;
    fn remove_by_entity_id(&mut self, entity_id: u32) -> bool;
    fn process_removed(&mut self);
    fn reserve(&mut self, additional: usize);
    fn clear(&mut self);

    /// Number of physical rows, disabled rows included.
    fn len(&self) -> usize;
    fn live_len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of enabled rows in ascending order.
    fn entity_ids(&self) -> Vec<u32>;

    /// Writes `[cannot_serialize: bool]` and, when serializable,
    /// `[count: i32]` followed by `count` times `(entity_id: u32, component)`.
    fn serialize(&self, writer: &mut dyn BitWrite) -> EcsResult<()>;

    /// Replaces every row with those read from `reader`.
    fn deserialize(&mut self, reader: &mut dyn BitRead) -> EcsResult<()>;

    fn clone_boxed(&self) -> Box<dyn AnyPool>;

    /// Overwrites `target` with this pool's rows if both hold the same type.
    fn copy_into(&self, target: &mut dyn AnyPool) -> bool;

    /// Copies the row of `entity_id` into `target`, overwriting any enabled
    /// row there. Returns `Ok(false)` if this pool has no such row.
    fn copy_entity_into(&self, entity_id: u32, target: &mut dyn AnyPool) -> EcsResult<bool>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Storage for one component type plus the resolver that serializes it.
pub struct ComponentPool<C> {
    ty: ComponentType,
    resolver: Option<Arc<dyn ComponentResolver<C>>>,
    rows: SparsePool<C>,
}

impl<C: Component> ComponentPool<C> {
    #[must_use]
    pub fn new(ty: ComponentType, resolver: Option<Arc<dyn ComponentResolver<C>>>) -> Self {
        Self {
            ty,
            resolver,
            rows: SparsePool::new(),
        }
    }

    /// The type's mask bit, for entity bookkeeping done by the caller.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.ty.bit()
    }

    #[must_use]
    pub const fn rows(&self) -> &SparsePool<C> {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut SparsePool<C> {
        &mut self.rows
    }
}

impl<C> Clone for ComponentPool<C>
where
    C: Component,
{
    fn clone(&self) -> Self {
        Self {
            ty: self.ty,
            resolver: self.resolver.clone(),
            rows: self.rows.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.ty = source.ty;
        self.resolver.clone_from(&source.resolver);
        self.rows.clone_from(&source.rows);
    }
}

impl<C: Component> fmt::Debug for ComponentPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentPool")
            .field("type", &self.ty.name())
            .field("serializable", &self.resolver.is_some())
            .field("rows", &self.rows)
            .finish()
    }
}

pub(crate) fn write_count(writer: &mut dyn BitWrite, count: usize) -> EcsResult<()> {
    let count = i32::try_from(count).map_err(|_| EcsError::CountOverflow { count })?;
    writer.write_i32(count)?;
    Ok(())
}

pub(crate) fn read_count(reader: &mut dyn BitRead) -> EcsResult<usize> {
    let count = reader.read_i32()?;
    usize::try_from(count).map_err(|_| CorruptReason::NegativeCount { count }.into())
}

impl<C: Component> AnyPool for ComponentPool<C> {
    fn component_type(&self) -> ComponentType {
        self.ty
    }

    fn is_serializable(&self) -> bool {
        self.resolver.is_some()
    }

    fn contains(&self, entity_id: u32) -> bool {
        self.rows.contains(entity_id)
    }

    fn mark_as_removed(&mut self, entity_id: u32) -> bool {
        self.rows.mark_as_removed(entity_id)
    }

    fn remove_by_entity_id(&mut self, entity_id: u32) -> bool {
        self.rows.remove_by_entity_id(entity_id)
    }

    fn process_removed(&mut self) {
        self.rows.process_removed();
    }

    fn reserve(&mut self, additional: usize) {
        self.rows.reserve(additional);
    }

    fn clear(&mut self) {
        self.rows.clear();
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn live_len(&self) -> usize {
        self.rows.live_len()
    }

    fn entity_ids(&self) -> Vec<u32> {
        self.rows.ids().collect()
    }

    fn serialize(&self, writer: &mut dyn BitWrite) -> EcsResult<()> {
        let Some(resolver) = &self.resolver else {
            writer.write_bool(true)?;
            return Ok(());
        };
        writer.write_bool(false)?;
        write_count(writer, self.rows.live_len())?;
        for (entity_id, component) in &self.rows {
            writer.write_u32(entity_id)?;
            resolver.serialize(component, writer)?;
        }
        Ok(())
    }

    fn deserialize(&mut self, reader: &mut dyn BitRead) -> EcsResult<()> {
        self.rows.clear();
        if reader.read_bool()? {
            return Ok(());
        }
        let resolver = self.resolver.as_ref().ok_or(EcsError::MissingResolver {
            name: self.ty.name(),
        })?;
        let count = read_count(reader)?;
        self.rows.reserve(count.min(reader.bits_remaining() / 32));
        for _ in 0..count {
            let entity_id = reader.read_u32()?;
            let component = resolver.deserialize(reader)?;
            self.rows.add(entity_id, component)?;
        }
        Ok(())
    }

    fn clone_boxed(&self) -> Box<dyn AnyPool> {
        Box::new(self.clone())
    }

    fn copy_into(&self, target: &mut dyn AnyPool) -> bool {
        match target.as_any_mut().downcast_mut::<Self>() {
            Some(target) => {
                target.clone_from(self);
                true
            }
            None => false,
        }
    }

    fn copy_entity_into(&self, entity_id: u32, target: &mut dyn AnyPool) -> EcsResult<bool> {
        let Some(component) = self.rows.get(entity_id) else {
            return Ok(false);
        };
        let target = target
            .as_any_mut()
            .downcast_mut::<Self>()
            .ok_or(EcsError::UnregisteredComponent {
                name: self.ty.name(),
            })?;
        match target.rows.get_mut(entity_id) {
            Some(slot) => *slot = *component,
            None => {
                target.rows.add(entity_id, *component)?;
            }
        }
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
