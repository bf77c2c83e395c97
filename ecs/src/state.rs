//! One tick's worth of entities and components.
//!
//! An [`EcsState`] owns the entity pool, every component pool (keyed by the
//! component's [`TypeHash`]) and the entity spaces ids are allocated from.
//! Destroying an entity or removing a component only soft-deletes rows;
//! [`EcsState::process_removed`] compacts everything in one pass.
//!
//! # State blob
//!
//! ```text
//! [pool_count: i32]
//! pool_count x ([type_hash: i32] [pool blob])     ascending hash order
//! [entity_count: i32]
//! entity_count x ([id: u32] [index: i32])          ascending id order
//! ```
//!
//! Entity masks are not transmitted. Deserialization rebuilds them from pool
//! membership.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use bitstream::{BitRead, BitReader, BitVecWriter, BitWrite};
use schema::{Component, ComponentBits, ComponentType, TypeHash};
use tracing::trace;

use crate::component_pool::{read_count, write_count, AnyPool, ComponentPool};
use crate::config::StateConfig;
use crate::entity::Entity;
use crate::entity_space::EntitySpace;
use crate::error::{CorruptReason, EcsError, EcsResult};
use crate::pool::{Iter, SparsePool};
use crate::registry::ComponentRegistry;

/// Digest of a serialized state, compared across peers to detect desyncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateChecksum(u64);

impl StateChecksum {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The first eight bytes of the BLAKE3 digest of `bytes`, little-endian.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = blake3::hash(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        Self(u64::from_le_bytes(head))
    }
}

impl fmt::Display for StateChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

type PoolMap = BTreeMap<TypeHash, Box<dyn AnyPool>>;

/// Entities, components and id spaces for one simulation tick.
pub struct EcsState {
    registry: Arc<ComponentRegistry>,
    config: StateConfig,
    local_tick: u32,
    sim_tick: u32,
    locked: bool,
    entities: SparsePool<Entity>,
    spaces: BTreeMap<u32, EntitySpace>,
    pools: PoolMap,
}

impl EcsState {
    /// Creates an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `config` does not validate.
    pub fn new(registry: Arc<ComponentRegistry>, config: StateConfig) -> EcsResult<Self> {
        config.validate()?;
        let mut entities = SparsePool::new();
        entities.reserve(config.initial_capacity);
        Ok(Self {
            registry,
            config,
            local_tick: 0,
            sim_tick: 0,
            locked: false,
            entities,
            spaces: BTreeMap::new(),
            pools: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &StateConfig {
        &self.config
    }

    // Ticks and locking

    #[must_use]
    pub const fn local_tick(&self) -> u32 {
        self.local_tick
    }

    #[must_use]
    pub const fn sim_tick(&self) -> u32 {
        self.sim_tick
    }

    pub fn set_local_tick(&mut self, tick: u32) {
        self.local_tick = tick;
    }

    pub fn set_sim_tick(&mut self, tick: u32) {
        self.sim_tick = tick;
    }

    pub(crate) fn advance_ticks(&mut self) {
        self.local_tick = self.local_tick.wrapping_add(1);
        self.sim_tick = self.sim_tick.wrapping_add(1);
    }

    /// Publishes the state as read-only history.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    fn ensure_unlocked(&self) -> EcsResult<()> {
        if self.locked {
            return Err(EcsError::StateLocked);
        }
        Ok(())
    }

    // Entities

    /// Space that owns `entity_id`.
    #[must_use]
    pub const fn owner_of(&self, entity_id: u32) -> u32 {
        entity_id / self.config.entities_per_space
    }

    #[must_use]
    pub fn space(&self, space_id: u32) -> Option<&EntitySpace> {
        self.spaces.get(&space_id)
    }

    /// Allocates an id from `space_id`, creating the space on first use.
    ///
    /// # Errors
    ///
    /// - [`EcsError::StateLocked`] on a locked state.
    /// - [`EcsError::SpaceOutOfRange`] if the space does not fit the id range.
    /// - [`EcsError::EntitySpaceFull`] if the space has no ids left.
    pub fn create_entity(&mut self, space_id: u32) -> EcsResult<u32> {
        self.ensure_unlocked()?;
        let space = space_mut(&mut self.spaces, space_id, self.config.entities_per_space)?;
        let id = space.get_new_entity_id()?;
        if let Err(err) = self.entities.add(id, Entity::new(id)) {
            space.release_entity_id(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Releases the id and soft-deletes the entity and its components.
    pub fn destroy_entity(&mut self, entity_id: u32) -> EcsResult<()> {
        self.ensure_unlocked()?;
        let entity = *self
            .entities
            .get(entity_id)
            .ok_or(EcsError::EntityNotFound { entity_id })?;
        let owner = self.owner_of(entity_id);
        if let Some(space) = self.spaces.get_mut(&owner) {
            space.release_entity_id(entity_id);
        }
        self.entities.mark_as_removed(entity_id);
        for bit in entity.components().iter() {
            let Some(ty) = self.registry.by_bit(bit) else {
                continue;
            };
            if let Some(pool) = self.pools.get_mut(&ty.hash()) {
                pool.mark_as_removed(entity_id);
            }
        }
        Ok(())
    }

    pub fn destroy_all_entities(&mut self) -> EcsResult<()> {
        self.ensure_unlocked()?;
        let ids: Vec<u32> = self.entities.ids().collect();
        for id in ids {
            self.destroy_entity(id)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn entity(&self, entity_id: u32) -> Option<&Entity> {
        self.entities.get(entity_id)
    }

    #[must_use]
    pub fn contains_entity(&self, entity_id: u32) -> bool {
        self.entities.contains(entity_id)
    }

    /// Live entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter().map(|(_, entity)| entity)
    }

    pub(crate) fn entity_rows(&self) -> Iter<'_, Entity> {
        self.entities.iter()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.live_len()
    }

    // Components

    /// Attaches `value` to the entity and returns the stored slot.
    ///
    /// # Errors
    ///
    /// - [`EcsError::StateLocked`] on a locked state.
    /// - [`EcsError::UnregisteredComponent`] if `C` is not registered.
    /// - [`EcsError::EntityNotFound`] if the entity is not live.
    /// - [`EcsError::DuplicateKey`] if the entity already has a `C`.
    pub fn add_component<C: Component>(&mut self, entity_id: u32, value: C) -> EcsResult<&mut C> {
        self.ensure_unlocked()?;
        let ty = self.registry.component_type::<C>()?;
        let entity = self
            .entities
            .get_mut(entity_id)
            .ok_or(EcsError::EntityNotFound { entity_id })?;
        let pool = typed_pool_mut::<C>(&mut self.pools, &self.registry, ty)?;
        let slot = pool.rows_mut().add(entity_id, value)?;
        entity.attach(ty.bit());
        Ok(slot)
    }

    /// Soft-deletes the entity's `C` and clears its mask bit.
    ///
    /// Returns `Ok(false)` if the entity has no `C`.
    pub fn remove_component<C: Component>(&mut self, entity_id: u32) -> EcsResult<bool> {
        self.ensure_unlocked()?;
        let ty = self.registry.component_type::<C>()?;
        let entity = self
            .entities
            .get_mut(entity_id)
            .ok_or(EcsError::EntityNotFound { entity_id })?;
        let removed = self
            .pools
            .get_mut(&ty.hash())
            .is_some_and(|pool| pool.mark_as_removed(entity_id));
        if removed {
            entity.detach(ty.bit());
        }
        Ok(removed)
    }

    #[must_use]
    pub fn get_component<C: Component>(&self, entity_id: u32) -> Option<&C> {
        self.pool::<C>()?.get(entity_id)
    }

    /// Mutable access to a stored value. Values stay writable on a locked
    /// state; the lock only guards structure.
    pub fn get_component_mut<C: Component>(&mut self, entity_id: u32) -> Option<&mut C> {
        self.existing_pool_mut::<C>()?.rows_mut().get_mut(entity_id)
    }

    #[must_use]
    pub fn has_component<C: Component>(&self, entity_id: u32) -> bool {
        self.pool::<C>().is_some_and(|pool| pool.contains(entity_id))
    }

    /// Storage of `C`, if the type is registered and has been used.
    #[must_use]
    pub fn pool<C: Component>(&self) -> Option<&SparsePool<C>> {
        let ty = self.registry.component_type::<C>().ok()?;
        self.pools
            .get(&ty.hash())?
            .as_any()
            .downcast_ref::<ComponentPool<C>>()
            .map(ComponentPool::rows)
    }

    /// Live `(entity_id, &C)` pairs in ascending id order.
    pub fn components<C: Component>(&self) -> impl Iterator<Item = (u32, &C)> + '_ {
        self.pool::<C>().into_iter().flat_map(SparsePool::iter)
    }

    /// Live `(entity_id, &mut C)` pairs in ascending id order.
    pub fn components_mut<C: Component>(&mut self) -> impl Iterator<Item = (u32, &mut C)> + '_ {
        self.existing_pool_mut::<C>()
            .into_iter()
            .flat_map(|pool| pool.rows_mut().iter_mut())
    }

    fn existing_pool_mut<C: Component>(&mut self) -> Option<&mut ComponentPool<C>> {
        let ty = self.registry.component_type::<C>().ok()?;
        self.pools
            .get_mut(&ty.hash())?
            .as_any_mut()
            .downcast_mut::<ComponentPool<C>>()
    }

    /// Recomputes the entity's mask by probing every pool.
    pub fn restore_entity_mask(&mut self, entity_id: u32) -> EcsResult<()> {
        let mut bits = ComponentBits::EMPTY;
        for pool in self.pools.values() {
            if pool.contains(entity_id) {
                bits.insert(pool.component_type().bit());
            }
        }
        let entity = self
            .entities
            .get_mut(entity_id)
            .ok_or(EcsError::EntityNotFound { entity_id })?;
        entity.set_components(bits);
        Ok(())
    }

    // Bulk operations

    /// Physically drops every soft-deleted entity and component row.
    pub fn process_removed(&mut self) {
        self.entities.process_removed();
        for pool in self.pools.values_mut() {
            pool.process_removed();
        }
    }

    /// Drops every entity, component and space. Ticks are kept.
    pub fn clear(&mut self) -> EcsResult<()> {
        self.ensure_unlocked()?;
        self.clear_rows();
        Ok(())
    }

    fn clear_rows(&mut self) {
        self.entities.clear();
        self.spaces.clear();
        for pool in self.pools.values_mut() {
            pool.clear();
        }
    }

    /// Compacts both states and makes `other` an independent copy of this one.
    ///
    /// `other` keeps its own lock flag, which must be clear.
    pub fn copy_to(&mut self, other: &mut Self) -> EcsResult<()> {
        other.ensure_unlocked()?;
        self.process_removed();
        other.process_removed();
        other.clone_from(self);
        other.locked = false;
        Ok(())
    }

    /// Copies every live entity and its components into `other`.
    ///
    /// Components already present on `other` are overwritten. Entities only
    /// `other` has are kept.
    pub fn merge_into(&self, other: &mut Self) -> EcsResult<()> {
        other.ensure_unlocked()?;
        let per_space = other.config.entities_per_space;
        for (entity_id, entity) in &self.entities {
            if !other.entities.contains(entity_id) {
                let space = space_mut(&mut other.spaces, entity_id / per_space, per_space)?;
                space.claim(entity_id);
                other.entities.add(entity_id, Entity::new(entity_id))?;
            }
            for bit in entity.components().iter() {
                let Some(ty) = self.registry.by_bit(bit) else {
                    continue;
                };
                let Some(source) = self.pools.get(&ty.hash()) else {
                    continue;
                };
                let target = pool_entry(&mut other.pools, &other.registry, ty.hash())?;
                if source.copy_entity_into(entity_id, target)? {
                    if let Some(row) = other.entities.get_mut(entity_id) {
                        row.attach(bit);
                    }
                }
            }
        }
        Ok(())
    }

    // Serialization

    /// Writes the state blob. Only live rows are written.
    pub fn serialize(&self, writer: &mut dyn BitWrite) -> EcsResult<()> {
        write_count(writer, self.pools.len())?;
        for (hash, pool) in &self.pools {
            writer.write_i32(hash.raw())?;
            pool.serialize(writer)?;
        }
        write_count(writer, self.entities.live_len())?;
        for (index, entity_id) in self.entities.ids().enumerate() {
            writer.write_u32(entity_id)?;
            write_count(writer, index)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> EcsResult<Vec<u8>> {
        let mut writer = BitVecWriter::new();
        self.serialize(&mut writer)?;
        Ok(writer.finish())
    }

    /// Replaces the contents of this state with a state blob.
    ///
    /// Ticks are kept. On error the state is left empty.
    pub fn deserialize(&mut self, reader: &mut dyn BitRead) -> EcsResult<()> {
        self.ensure_unlocked()?;
        self.clear_rows();
        let result = self.read_blob(reader);
        if result.is_err() {
            self.clear_rows();
        }
        result
    }

    pub fn deserialize_bytes(&mut self, bytes: &[u8]) -> EcsResult<()> {
        self.deserialize(&mut BitReader::new(bytes))
    }

    fn read_blob(&mut self, reader: &mut dyn BitRead) -> EcsResult<()> {
        let pool_count = read_count(reader)?;
        let mut seen = BTreeSet::new();
        for _ in 0..pool_count {
            let hash = TypeHash::new(reader.read_i32()?);
            if !seen.insert(hash) {
                return Err(CorruptReason::DuplicatePool { hash }.into());
            }
            pool_entry(&mut self.pools, &self.registry, hash)?.deserialize(reader)?;
        }
        self.pools.retain(|hash, _| seen.contains(hash));

        let entity_count = read_count(reader)?;
        let per_space = self.config.entities_per_space;
        let mut previous: Option<u32> = None;
        for expected in 0..entity_count {
            let entity_id = reader.read_u32()?;
            let found = reader.read_i32()?;
            if usize::try_from(found).ok() != Some(expected) {
                return Err(CorruptReason::IndexMismatch {
                    entity_id,
                    expected,
                    found,
                }
                .into());
            }
            match previous {
                Some(prev) if prev == entity_id => {
                    return Err(CorruptReason::DuplicateEntity { entity_id }.into());
                }
                Some(prev) if prev > entity_id => {
                    return Err(CorruptReason::UnsortedEntity {
                        previous: prev,
                        current: entity_id,
                    }
                    .into());
                }
                _ => {}
            }
            previous = Some(entity_id);
            space_mut(&mut self.spaces, entity_id / per_space, per_space)?.claim(entity_id);
            self.entities.add(entity_id, Entity::new(entity_id))?;
        }

        for pool in self.pools.values() {
            let ty = pool.component_type();
            for entity_id in pool.entity_ids() {
                let entity = self.entities.get_mut(entity_id).ok_or(
                    CorruptReason::ComponentWithoutEntity {
                        entity_id,
                        hash: ty.hash(),
                    },
                )?;
                entity.attach(ty.bit());
            }
        }

        trace!(
            pools = pool_count,
            entities = entity_count,
            tick = self.sim_tick,
            "state deserialized"
        );
        Ok(())
    }

    /// Digest of the serialized state.
    pub fn checksum(&self) -> EcsResult<StateChecksum> {
        Ok(StateChecksum::of_bytes(&self.to_bytes()?))
    }
}

fn space_mut(
    spaces: &mut BTreeMap<u32, EntitySpace>,
    space_id: u32,
    per_space: u32,
) -> EcsResult<&mut EntitySpace> {
    match spaces.entry(space_id) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let base = space_id
                .checked_mul(per_space)
                .ok_or(EcsError::SpaceOutOfRange { space_id })?;
            let space = EntitySpace::new(base, per_space)
                .map_err(|_| EcsError::SpaceOutOfRange { space_id })?;
            Ok(entry.insert(space))
        }
    }
}

fn pool_entry<'a>(
    pools: &'a mut PoolMap,
    registry: &ComponentRegistry,
    hash: TypeHash,
) -> EcsResult<&'a mut dyn AnyPool> {
    let pool = match pools.entry(hash) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => entry.insert(registry.create_pool(hash)?),
    };
    Ok(&mut **pool)
}

fn typed_pool_mut<'a, C: Component>(
    pools: &'a mut PoolMap,
    registry: &ComponentRegistry,
    ty: ComponentType,
) -> EcsResult<&'a mut ComponentPool<C>> {
    pool_entry(pools, registry, ty.hash())?
        .as_any_mut()
        .downcast_mut::<ComponentPool<C>>()
        .ok_or(EcsError::UnregisteredComponent { name: C::NAME })
}

impl Clone for EcsState {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            config: self.config,
            local_tick: self.local_tick,
            sim_tick: self.sim_tick,
            locked: self.locked,
            entities: self.entities.clone(),
            spaces: self.spaces.clone(),
            pools: self
                .pools
                .iter()
                .map(|(hash, pool)| (*hash, pool.clone_boxed()))
                .collect(),
        }
    }

    /// Reuses this state's pool allocations where the types line up.
    fn clone_from(&mut self, source: &Self) {
        self.registry = Arc::clone(&source.registry);
        self.config = source.config;
        self.local_tick = source.local_tick;
        self.sim_tick = source.sim_tick;
        self.locked = source.locked;
        self.entities.clone_from(&source.entities);
        self.spaces.clone_from(&source.spaces);
        self.pools.retain(|hash, _| source.pools.contains_key(hash));
        for (hash, pool) in &source.pools {
            let copied = match self.pools.get_mut(hash) {
                Some(target) => pool.copy_into(&mut **target),
                None => false,
            };
            if !copied {
                self.pools.insert(*hash, pool.clone_boxed());
            }
        }
    }
}

impl fmt::Debug for EcsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcsState")
            .field("sim_tick", &self.sim_tick)
            .field("local_tick", &self.local_tick)
            .field("locked", &self.locked)
            .field("entities", &self.entities.live_len())
            .field("spaces", &self.spaces.keys().collect::<Vec<_>>())
            .field(
                "pools",
                &self
                    .pools
                    .values()
                    .map(|pool| (pool.component_type().name(), pool.live_len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
