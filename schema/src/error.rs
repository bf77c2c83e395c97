//! Component registration errors.

use std::fmt;

use crate::TypeHash;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when registering component types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// More component types than the entity mask has bits for.
    TooManyComponentTypes { max: usize },

    /// The same component type registered twice.
    DuplicateComponent { name: &'static str },

    /// Two distinct component names hash to the same key.
    HashCollision {
        first: &'static str,
        second: &'static str,
        hash: TypeHash,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyComponentTypes { max } => {
                write!(f, "cannot register more than {max} component types")
            }
            Self::DuplicateComponent { name } => {
                write!(f, "component type '{name}' is already registered")
            }
            Self::HashCollision {
                first,
                second,
                hash,
            } => {
                write!(
                    f,
                    "component types '{first}' and '{second}' share type hash {}",
                    hash.raw()
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_names() {
        let err = SchemaError::HashCollision {
            first: "A",
            second: "B",
            hash: TypeHash::new(7),
        };
        let msg = err.to_string();
        assert!(msg.contains("'A'"));
        assert!(msg.contains("'B'"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn display_capacity() {
        let msg = SchemaError::TooManyComponentTypes { max: 31 }.to_string();
        assert!(msg.contains("31"));
    }
}
