//! Error types for ECS state operations.

use std::fmt;

use schema::{SchemaError, TypeHash};

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors that can occur while mutating, serializing or stepping state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Bitstream error while reading or writing a state blob.
    Bitstream(bitstream::BitError),

    /// Component registration error.
    Schema(SchemaError),

    /// An enabled row already exists for this entity id.
    DuplicateKey { entity_id: u32 },

    /// No live entity with this id.
    EntityNotFound { entity_id: u32 },

    /// The entity space has no ids left.
    EntitySpaceFull { base: u32, size: u32 },

    /// The space id does not map onto the `u32` id range.
    SpaceOutOfRange { space_id: u32 },

    /// The component type was never registered.
    UnregisteredComponent { name: &'static str },

    /// A serialized pool carries a hash no registered type has.
    UnknownComponentHash { hash: TypeHash },

    /// A pool blob holds data but the type has no resolver.
    MissingResolver { name: &'static str },

    /// Mutation attempted on a locked (published) state.
    StateLocked,

    /// A serialized state is structurally inconsistent.
    CorruptState { reason: CorruptReason },

    /// The requested tick is no longer in the ring buffer.
    TickNotRetained { tick: u32 },

    /// Configuration rejected at construction.
    InvalidConfig { reason: &'static str },

    /// A count does not fit the `i32` wire field.
    CountOverflow { count: usize },
}

/// Details for corrupt state blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptReason {
    NegativeCount { count: i32 },
    DuplicatePool { hash: TypeHash },
    IndexMismatch { entity_id: u32, expected: usize, found: i32 },
    DuplicateEntity { entity_id: u32 },
    UnsortedEntity { previous: u32, current: u32 },
    ComponentWithoutEntity { entity_id: u32, hash: TypeHash },
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::Schema(e) => write!(f, "schema error: {e}"),
            Self::DuplicateKey { entity_id } => {
                write!(f, "entity {entity_id} already has an enabled row")
            }
            Self::EntityNotFound { entity_id } => write!(f, "entity {entity_id} not found"),
            Self::EntitySpaceFull { base, size } => {
                write!(f, "entity space [{base}, {base}+{size}) is full")
            }
            Self::SpaceOutOfRange { space_id } => {
                write!(f, "entity space {space_id} lies outside the id range")
            }
            Self::UnregisteredComponent { name } => {
                write!(f, "component type '{name}' is not registered")
            }
            Self::UnknownComponentHash { hash } => {
                write!(f, "no registered component type has hash {}", hash.raw())
            }
            Self::MissingResolver { name } => {
                write!(f, "component type '{name}' has data but no resolver")
            }
            Self::StateLocked => write!(f, "state is locked"),
            Self::CorruptState { reason } => write!(f, "corrupt state: {reason}"),
            Self::TickNotRetained { tick } => {
                write!(f, "tick {tick} is not retained in the state buffer")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
            Self::CountOverflow { count } => write!(f, "count {count} exceeds i32::MAX"),
        }
    }
}

impl fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeCount { count } => write!(f, "negative count {count}"),
            Self::DuplicatePool { hash } => write!(f, "pool {} appears twice", hash.raw()),
            Self::IndexMismatch {
                entity_id,
                expected,
                found,
            } => write!(
                f,
                "entity {entity_id} has index {found}, expected {expected}"
            ),
            Self::DuplicateEntity { entity_id } => write!(f, "entity {entity_id} appears twice"),
            Self::UnsortedEntity { previous, current } => {
                write!(f, "entity {current} follows {previous}")
            }
            Self::ComponentWithoutEntity { entity_id, hash } => write!(
                f,
                "pool {} holds a row for missing entity {entity_id}",
                hash.raw()
            ),
        }
    }
}

impl std::error::Error for EcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(e) => Some(e),
            Self::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bitstream::BitError> for EcsError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl From<SchemaError> for EcsError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<CorruptReason> for EcsError {
    fn from(reason: CorruptReason) -> Self {
        Self::CorruptState { reason }
    }
}
