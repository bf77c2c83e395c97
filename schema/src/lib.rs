//! Component identity and serialization contracts for the rewind ECS.
//!
//! This crate defines how component types are named, hashed and serialized:
//! - [`Component`] marks a plain-data type storable in a pool
//! - [`ComponentType`] carries the registration index, mask bit and stable hash
//! - [`SerializableData`] and [`ComponentResolver`] are the seam to generated
//!   or hand-written per-component wire code
//!
//! # Design Principles
//!
//! - **Explicit registration** - Indices come from declaration order, never first use.
//! - **Stable identity** - The type hash depends only on the component name.
//! - **No reflection** - Resolvers are ordinary trait objects registered at startup.

mod component;
mod error;
mod hash;
mod resolver;

pub use component::{Component, ComponentBits, ComponentType, MAX_COMPONENT_TYPES};
pub use error::{SchemaError, SchemaResult};
pub use hash::{type_hash, TypeHash};
pub use resolver::{ComponentData, ComponentResolver, DataResolver, PlainResolver, SerializableData};
