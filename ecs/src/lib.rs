//! Deterministic entity-component state with rollback and bit-exact
//! serialization.
//!
//! This crate ties `bitstream` and `schema` together into the simulation
//! core: sorted sparse pools keyed by entity id, id allocation per entity
//! space, whole-state snapshots, mask filters, and a ring-buffered world
//! that steps systems tick by tick.
//!
//! # Features
//!
//! - Sparse component pools with soft delete and per-tick compaction
//! - Entity spaces that recycle ids and keep the live range compact
//! - Explicit, ordered component registration with stable type hashes
//! - Full state serialization with rebuilt entity masks
//! - Include/exclude filters with ALL/ANY semantics
//! - Ring buffer of states with rollback, history sampling and checksums
//!
//! # Design Principles
//!
//! - **Deterministic** - Same inputs produce the same bytes on every peer.
//! - **Explicit absence** - Lookups return `Option`; failures return [`EcsError`].
//! - **Single owner** - A state is mutated by one tick driver; locked states reject structural changes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use ecs::{ComponentRegistry, EcsFilter, EcsState, StateConfig};
//! use schema::Component;
//!
//! #[derive(Debug, Clone, Copy, Default, PartialEq)]
//! struct Health(u8);
//!
//! impl Component for Health {
//!     const NAME: &'static str = "Health";
//! }
//!
//! let registry = Arc::new(ComponentRegistry::builder().register::<Health>().build().unwrap());
//! let mut state = EcsState::new(Arc::clone(&registry), StateConfig::default()).unwrap();
//!
//! let id = state.create_entity(0).unwrap();
//! state.add_component(id, Health(100)).unwrap();
//!
//! let alive = EcsFilter::builder(&registry).include::<Health>().build().unwrap();
//! assert_eq!(alive.entity_ids(&state), vec![id]);
//! ```

mod alloc;
mod component_pool;
mod config;
mod entity;
mod entity_space;
mod error;
mod filter;
mod history;
mod pool;
mod registry;
mod state;
mod world;

#[cfg(test)]
mod testing;

pub use alloc::{BlockAllocator, Doubling, GrowthPolicy};
pub use component_pool::{AnyPool, ComponentPool};
pub use config::{StateConfig, WorldConfig};
pub use entity::Entity;
pub use entity_space::EntitySpace;
pub use error::{CorruptReason, EcsError, EcsResult};
pub use filter::{ComponentMask, EcsFilter, FilterBuilder, FilterIter};
pub use history::{Desync, DesyncDetector, StateHistory};
pub use pool::{Iter as PoolIter, IterMut as PoolIterMut, SparsePool};
pub use registry::{ComponentRegistry, RegistryBuilder};
pub use state::{EcsState, StateChecksum};
pub use world::{InitSystem, RunOnceSystem, SimulationSystem, SystemId, ViewSystem, World};
