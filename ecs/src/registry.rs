//! Explicit component registration.
//!
//! Registration order fixes each type's index and mask bit. Every process
//! exchanging serialized state must register the same names; the order may
//! differ because pools travel keyed by [`TypeHash`].

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use schema::{
    Component, ComponentResolver, ComponentType, SchemaError, SchemaResult, TypeHash,
    MAX_COMPONENT_TYPES,
};

use crate::component_pool::{AnyPool, ComponentPool};
use crate::error::{EcsError, EcsResult};

type PoolFactory = Box<dyn Fn() -> Box<dyn AnyPool> + Send + Sync>;

struct Entry {
    ty: ComponentType,
    type_id: TypeId,
    factory: PoolFactory,
}

/// The set of component types a state can hold.
pub struct ComponentRegistry {
    entries: Vec<Entry>,
    by_type: HashMap<TypeId, usize>,
    by_hash: BTreeMap<TypeHash, usize>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks up the registered descriptor of `C`.
    pub fn component_type<C: Component>(&self) -> EcsResult<ComponentType> {
        self.by_type
            .get(&TypeId::of::<C>())
            .map(|&index| self.entries[index].ty)
            .ok_or(EcsError::UnregisteredComponent { name: C::NAME })
    }

    #[must_use]
    pub fn by_hash(&self, hash: TypeHash) -> Option<ComponentType> {
        self.by_hash.get(&hash).map(|&index| self.entries[index].ty)
    }

    #[must_use]
    pub fn by_index(&self, index: usize) -> Option<ComponentType> {
        self.entries.get(index).map(|entry| entry.ty)
    }

    /// Descriptor owning a single mask bit.
    #[must_use]
    pub fn by_bit(&self, bit: u32) -> Option<ComponentType> {
        if !bit.is_power_of_two() || bit == 1 {
            return None;
        }
        self.by_index(bit.trailing_zeros() as usize - 1)
    }

    /// Builds an empty pool for the type registered under `hash`.
    pub fn create_pool(&self, hash: TypeHash) -> EcsResult<Box<dyn AnyPool>> {
        let index = self
            .by_hash
            .get(&hash)
            .ok_or(EcsError::UnknownComponentHash { hash })?;
        Ok((self.entries[*index].factory)())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered descriptors in registration order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = ComponentType> + '_ {
        self.entries.iter().map(|entry| entry.ty)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.ty.name()))
            .finish()
    }
}

/// Collects registrations and validates them in [`build`](Self::build).
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
    error: Option<SchemaError>,
}

impl RegistryBuilder {
    /// Registers `C` without a resolver; its pool is skipped on the wire.
    #[must_use]
    pub fn register<C: Component>(self) -> Self {
        self.push::<C>(None)
    }

    /// Registers `C` with the resolver that serializes it.
    #[must_use]
    pub fn register_with<C, R>(self, resolver: R) -> Self
    where
        C: Component,
        R: ComponentResolver<C> + 'static,
    {
        self.push::<C>(Some(Arc::new(resolver)))
    }

    fn push<C: Component>(mut self, resolver: Option<Arc<dyn ComponentResolver<C>>>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.entries.iter().any(|e| e.type_id == TypeId::of::<C>()) {
            self.error = Some(SchemaError::DuplicateComponent { name: C::NAME });
            return self;
        }
        let ty = match ComponentType::of::<C>(self.entries.len()) {
            Ok(ty) => ty,
            Err(err) => {
                self.error = Some(err);
                return self;
            }
        };
        let factory: PoolFactory = Box::new(move || {
            Box::new(ComponentPool::<C>::new(ty, resolver.clone())) as Box<dyn AnyPool>
        });
        self.entries.push(Entry {
            ty,
            type_id: TypeId::of::<C>(),
            factory,
        });
        self
    }

    pub fn build(self) -> SchemaResult<ComponentRegistry> {
        if let Some(err) = self.error {
            return Err(err);
        }
        debug_assert!(self.entries.len() <= MAX_COMPONENT_TYPES);
        let mut by_type = HashMap::with_capacity(self.entries.len());
        let mut by_hash = BTreeMap::new();
        for (index, entry) in self.entries.iter().enumerate() {
            by_type.insert(entry.type_id, index);
            if let Some(&other) = by_hash.get(&entry.ty.hash()) {
                let first: &Entry = &self.entries[other];
                return Err(SchemaError::HashCollision {
                    first: first.ty.name(),
                    second: entry.ty.name(),
                    hash: entry.ty.hash(),
                });
            }
            by_hash.insert(entry.ty.hash(), index);
        }
        Ok(ComponentRegistry {
            entries: self.entries,
            by_type,
            by_hash,
        })
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("registered", &self.entries.len())
            .field("error", &self.error)
            .finish()
    }
}
