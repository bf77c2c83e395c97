//! State and world configuration.

use crate::error::{EcsError, EcsResult};

/// Sizing of an [`EcsState`](crate::EcsState).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateConfig {
    /// Number of ids in each entity space; space `n` owns
    /// `[n * entities_per_space, (n + 1) * entities_per_space)`.
    pub entities_per_space: u32,
    /// Rows reserved up front in the entity pool.
    pub initial_capacity: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            entities_per_space: 1000,
            initial_capacity: 64,
        }
    }
}

impl StateConfig {
    /// Creates a configuration suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            entities_per_space: 16,
            initial_capacity: 4,
        }
    }

    pub fn validate(&self) -> EcsResult<()> {
        if self.entities_per_space == 0 {
            return Err(EcsError::InvalidConfig {
                reason: "entities_per_space must be positive",
            });
        }
        Ok(())
    }
}

/// Sizing of a [`World`](crate::World) ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldConfig {
    /// Number of states kept for rollback, the current one included.
    pub max_state_buffer_size: usize,
    pub state: StateConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_state_buffer_size: 16,
            state: StateConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Creates a configuration suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_state_buffer_size: 4,
            state: StateConfig::for_testing(),
        }
    }

    pub fn validate(&self) -> EcsResult<()> {
        if self.max_state_buffer_size == 0 {
            return Err(EcsError::InvalidConfig {
                reason: "max_state_buffer_size must be at least 1",
            });
        }
        self.state.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(StateConfig::default().validate().is_ok());
        assert!(WorldConfig::default().validate().is_ok());
        assert!(WorldConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn zero_sizes_rejected() {
        let mut config = WorldConfig::for_testing();
        config.max_state_buffer_size = 0;
        assert!(matches!(
            config.validate(),
            Err(EcsError::InvalidConfig { .. })
        ));

        let mut config = WorldConfig::for_testing();
        config.state.entities_per_space = 0;
        assert!(config.validate().is_err());
    }
}
