//! Growth policies for pool backing storage.

use std::fmt;
use std::num::NonZeroUsize;

/// Decides the capacity a pool grows to once its storage is full.
pub trait GrowthPolicy: fmt::Debug + Send + Sync {
    /// Returns the new capacity given the current one and the minimum needed.
    ///
    /// The result must be at least `required`.
    fn grow(&self, current: usize, required: usize) -> usize;
}

/// Doubles capacity, starting from four slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Doubling;

impl GrowthPolicy for Doubling {
    fn grow(&self, current: usize, required: usize) -> usize {
        required.max(current.saturating_mul(2)).max(4)
    }
}

/// Rounds capacity up to a whole number of fixed-size blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAllocator {
    block: NonZeroUsize,
}

impl BlockAllocator {
    pub const DEFAULT_BLOCK: usize = 2;

    #[must_use]
    pub const fn new(block: NonZeroUsize) -> Self {
        Self { block }
    }

    #[must_use]
    pub const fn block(&self) -> usize {
        self.block.get()
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self {
            block: NonZeroUsize::MIN.saturating_add(Self::DEFAULT_BLOCK - 1),
        }
    }
}

impl GrowthPolicy for BlockAllocator {
    fn grow(&self, _current: usize, required: usize) -> usize {
        required.div_ceil(self.block.get()) * self.block.get()
    }
}
