//! Entity id allocation within a fixed numeric range.

use std::collections::BTreeSet;

use crate::error::{EcsError, EcsResult};

/// Allocates and recycles ids in `[base, base + size)`.
///
/// Ids below the cursor are either in use or in the free set. Freed ids are
/// reused highest first, and freeing the top live id pulls the cursor back
/// over any contiguous run of free ids, so churn near the ceiling never
/// accumulates in the free set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpace {
    base: u32,
    size: u32,
    cursor: u32,
    free: BTreeSet<u32>,
}

impl EntitySpace {
    /// Creates an empty space.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the range is empty or does not
    /// fit in `u32`.
    pub fn new(base: u32, size: u32) -> EcsResult<Self> {
        if size == 0 {
            return Err(EcsError::InvalidConfig {
                reason: "entity space size must be non-zero",
            });
        }
        if base.checked_add(size).is_none() {
            return Err(EcsError::InvalidConfig {
                reason: "entity space exceeds the u32 id range",
            });
        }
        Ok(Self {
            base,
            size,
            cursor: base,
            free: BTreeSet::new(),
        })
    }

    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// The next never-allocated id.
    #[must_use]
    pub const fn cursor(&self) -> u32 {
        self.cursor
    }

    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of ids currently in use.
    #[must_use]
    pub fn live_count(&self) -> usize {
        (self.cursor - self.base) as usize - self.free.len()
    }

    const fn end(&self) -> u32 {
        self.base + self.size
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cursor == self.end() && self.free.is_empty()
    }

    #[must_use]
    pub fn is_in_use(&self, id: u32) -> bool {
        id >= self.base && id < self.cursor && !self.free.contains(&id)
    }

    /// Returns a fresh id, preferring the highest freed one.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntitySpaceFull`] when no id is left.
    pub fn get_new_entity_id(&mut self) -> EcsResult<u32> {
        if let Some(id) = self.free.pop_last() {
            return Ok(id);
        }
        if self.cursor == self.end() {
            return Err(EcsError::EntitySpaceFull {
                base: self.base,
                size: self.size,
            });
        }
        let id = self.cursor;
        self.cursor += 1;
        Ok(id)
    }

    /// Returns `id` to the space. Ids not in use are ignored.
    pub fn release_entity_id(&mut self, id: u32) -> bool {
        if !self.is_in_use(id) {
            return false;
        }
        if id + 1 < self.cursor {
            self.free.insert(id);
            return true;
        }
        self.cursor = id;
        while let Some(&top) = self.free.last() {
            if top + 1 != self.cursor {
                break;
            }
            self.free.pop_last();
            self.cursor = top;
        }
        true
    }

    /// Marks a specific id as in use.
    ///
    /// Ids skipped over between the cursor and `id` become free. Returns
    /// `false` if `id` is outside the space or already in use.
    pub fn claim(&mut self, id: u32) -> bool {
        if id < self.base || id >= self.end() || self.is_in_use(id) {
            return false;
        }
        if id < self.cursor {
            return self.free.remove(&id);
        }
        self.free.extend(self.cursor..id);
        self.cursor = id + 1;
        true
    }

    /// Frees every id.
    pub fn reset(&mut self) {
        self.cursor = self.base;
        self.free.clear();
    }
}
