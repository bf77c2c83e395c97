//! Sorted sparse storage keyed by entity id.
//!
//! [`SparsePool`] keeps two parallel arrays: ascending entity ids and the
//! values stored for them. Lookups binary-search the id array. Removal is
//! usually soft: a row is flagged disabled and stays in place until
//! [`SparsePool::process_removed`] compacts the pool, so removal cost is paid
//! once per tick instead of once per call.
//!
//! While a disabled row is still present, a new enabled row for the same id
//! may be added. It is inserted before the disabled duplicates. When the
//! search lands on a disabled row it scans the whole run of that id in both
//! directions, so the enabled row is found wherever it sits in the run and
//! the insertion point is always the start of the run.

use std::fmt;
use std::iter::FusedIterator;
use std::slice;
use std::sync::Arc;

use crate::alloc::{Doubling, GrowthPolicy};
use crate::error::{EcsError, EcsResult};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot<T> {
    value: T,
    disabled: bool,
}

/// Dense storage of `T` keyed by ascending entity id.
pub struct SparsePool<T> {
    ids: Vec<u32>,
    slots: Vec<Slot<T>>,
    disabled: usize,
    policy: Arc<dyn GrowthPolicy>,
}

impl<T> SparsePool<T> {
    /// Creates an empty pool that grows by doubling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Arc::new(Doubling))
    }

    /// Creates an empty pool using `policy` to size its storage.
    #[must_use]
    pub fn with_policy(policy: Arc<dyn GrowthPolicy>) -> Self {
        Self {
            ids: Vec::new(),
            slots: Vec::new(),
            disabled: 0,
            policy,
        }
    }

    /// Number of physical rows, disabled rows included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of enabled rows.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.ids.len() - self.disabled
    }

    /// Number of rows waiting for [`process_removed`](Self::process_removed).
    #[must_use]
    pub const fn disabled_len(&self) -> usize {
        self.disabled
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ids.capacity().min(self.slots.capacity())
    }

    /// Binary search for the enabled row of `id`.
    ///
    /// `Err` carries the insertion point, which lies before any disabled
    /// rows with the same id.
    fn search(&self, id: u32) -> Result<usize, usize> {
        let mut low = 0;
        let mut high = self.ids.len();
        while low < high {
            let mid = low + (high - low) / 2;
            let probe = self.ids[mid];
            if probe == id {
                if !self.slots[mid].disabled {
                    return Ok(mid);
                }
                return self.search_run(mid, id);
            } else if probe < id {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        Err(low)
    }

    /// Looks for the enabled row in the run of `id` rows around `hit`.
    fn search_run(&self, hit: usize, id: u32) -> Result<usize, usize> {
        let mut start = hit;
        while start > 0 && self.ids[start - 1] == id {
            start -= 1;
        }
        let mut end = hit + 1;
        while end < self.ids.len() && self.ids[end] == id {
            end += 1;
        }
        (start..end)
            .find(|&index| !self.slots[index].disabled)
            .ok_or(start)
    }

    /// Position of the enabled row for `id` among all physical rows.
    #[must_use]
    pub fn position(&self, id: u32) -> Option<usize> {
        self.search(id).ok()
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.search(id).is_ok()
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&T> {
        self.search(id).ok().map(|index| &self.slots[index].value)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        match self.search(id) {
            Ok(index) => Some(&mut self.slots[index].value),
            Err(_) => None,
        }
    }

    /// Inserts `value` for `id`, keeping ids ascending.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateKey`] if an enabled row for `id` exists.
    /// Disabled rows for `id` do not block the insert.
    pub fn add(&mut self, id: u32, value: T) -> EcsResult<&mut T> {
        let index = match self.search(id) {
            Ok(_) => return Err(EcsError::DuplicateKey { entity_id: id }),
            Err(index) => index,
        };
        if self.ids.len() == self.capacity() {
            let target = self.policy.grow(self.capacity(), self.ids.len() + 1);
            self.reserve(target - self.ids.len());
        }
        self.ids.insert(index, id);
        self.slots.insert(
            index,
            Slot {
                value,
                disabled: false,
            },
        );
        Ok(&mut self.slots[index].value)
    }

    /// Flags the enabled row of `id` as disabled without moving anything.
    pub fn mark_as_removed(&mut self, id: u32) -> bool {
        match self.search(id) {
            Ok(index) => {
                self.slots[index].disabled = true;
                self.disabled += 1;
                true
            }
            Err(_) => false,
        }
    }

    /// Physically removes the enabled row of `id`, shifting later rows left.
    pub fn remove_by_entity_id(&mut self, id: u32) -> bool {
        match self.search(id) {
            Ok(index) => {
                self.ids.remove(index);
                self.slots.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Physically removes every disabled row in one pass.
    pub fn process_removed(&mut self) {
        if self.disabled == 0 {
            return;
        }
        let mut write = 0;
        for read in 0..self.ids.len() {
            if self.slots[read].disabled {
                continue;
            }
            if write != read {
                self.ids[write] = self.ids[read];
                self.slots.swap(write, read);
            }
            write += 1;
        }
        self.ids.truncate(write);
        self.slots.truncate(write);
        self.disabled = 0;
    }

    /// Pre-grows storage for `additional` more rows without adding any.
    pub fn reserve(&mut self, additional: usize) {
        self.ids.reserve_exact(additional);
        self.slots.reserve_exact(additional);
    }

    /// Drops every row, keeping the allocation.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.slots.clear();
        self.disabled = 0;
    }

    /// Iterates enabled rows in ascending id order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ids: self.ids.iter(),
            slots: self.slots.iter(),
        }
    }

    /// Iterates enabled rows mutably in ascending id order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            ids: self.ids.iter(),
            slots: self.slots.iter_mut(),
        }
    }

    /// Iterates the ids of enabled rows in ascending order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = u32> + '_ {
        self.ids
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| !slot.disabled)
            .map(|(&id, _)| id)
    }
}

impl<T> Default for SparsePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for SparsePool<T> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
            slots: self.slots.clone(),
            disabled: self.disabled,
            policy: Arc::clone(&self.policy),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.ids.clone_from(&source.ids);
        self.slots.clone_from(&source.slots);
        self.disabled = source.disabled;
        self.policy = Arc::clone(&source.policy);
    }
}

impl<T: fmt::Debug> fmt::Debug for SparsePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a SparsePool<T> {
    type Item = (u32, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over enabled rows of a [`SparsePool`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    ids: slice::Iter<'a, u32>,
    slots: slice::Iter<'a, Slot<T>>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (u32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = *self.ids.next()?;
            let slot = self.slots.next()?;
            if !slot.disabled {
                return Some((id, &slot.value));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

/// Mutable iterator over enabled rows of a [`SparsePool`].
#[derive(Debug)]
pub struct IterMut<'a, T> {
    ids: slice::Iter<'a, u32>,
    slots: slice::IterMut<'a, Slot<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (u32, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = *self.ids.next()?;
            let slot = self.slots.next()?;
            if !slot.disabled {
                return Some((id, &mut slot.value));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}

impl<T> FusedIterator for IterMut<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::BlockAllocator;

    fn pool_of(ids: &[u32]) -> SparsePool<u32> {
        let mut pool = SparsePool::new();
        for &id in ids {
            pool.add(id, id * 10).unwrap();
        }
        pool
    }

    #[test]
    fn add_keeps_ids_sorted() {
        let pool = pool_of(&[7, 3, 9, 1, 5]);
        assert_eq!(pool.ids().collect::<Vec<_>>(), vec![1, 3, 5, 7, 9]);
        assert_eq!(pool.get(5), Some(&50));
        assert_eq!(pool.get(4), None);
    }

    #[test]
    fn add_duplicate_fails() {
        let mut pool = pool_of(&[1, 2]);
        assert_eq!(
            pool.add(2, 0).unwrap_err(),
            EcsError::DuplicateKey { entity_id: 2 }
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn add_returns_slot_for_initialization() {
        let mut pool = SparsePool::new();
        *pool.add(4, 1u32).unwrap() += 41;
        assert_eq!(pool.get(4), Some(&42));
    }

    #[test]
    fn add_after_soft_delete_returns_new_value() {
        let mut pool = SparsePool::new();
        pool.add(5, 'A').unwrap();
        assert!(pool.mark_as_removed(5));
        pool.add(5, 'B').unwrap();
        assert_eq!(pool.get(5), Some(&'B'));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.live_len(), 1);

        pool.process_removed();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(5), Some(&'B'));
    }

    #[test]
    fn repeated_soft_delete_of_same_id() {
        let mut pool = pool_of(&[2, 5, 8]);
        for round in 0..3 {
            assert!(pool.mark_as_removed(5));
            assert!(!pool.contains(5));
            pool.add(5, round).unwrap();
        }
        assert_eq!(pool.get(5), Some(&2));
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.ids().collect::<Vec<_>>(), vec![2, 5, 8]);
        pool.process_removed();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(5), Some(&2));
    }

    #[test]
    fn enabled_row_after_disabled_midpoint_is_found() {
        let mut pool = pool_of(&[1, 3, 5, 9]);
        // Rows: 1, 3, 5 (disabled), 5, 9. The first probe lands on index 2.
        pool.ids.insert(3, 5);
        pool.slots.insert(
            3,
            Slot {
                value: 55,
                disabled: false,
            },
        );
        pool.slots[2].disabled = true;
        pool.disabled = 1;

        assert_eq!(pool.position(5), Some(3));
        assert_eq!(pool.get(5), Some(&55));
        assert_eq!(
            pool.add(5, 0).unwrap_err(),
            EcsError::DuplicateKey { entity_id: 5 }
        );
        assert!(pool.mark_as_removed(5));
        assert!(!pool.contains(5));

        pool.add(5, 77).unwrap();
        assert_eq!(pool.position(5), Some(2));
        assert_eq!(pool.get(5), Some(&77));
        pool.process_removed();
        assert_eq!(pool.ids().collect::<Vec<_>>(), vec![1, 3, 5, 9]);
        assert_eq!(pool.get(5), Some(&77));
    }

    #[test]
    fn mark_as_removed_hides_row_until_compaction() {
        let mut pool = pool_of(&[1, 2, 3]);
        assert!(pool.mark_as_removed(2));
        assert!(!pool.mark_as_removed(2));
        assert_eq!(pool.get(2), None);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.live_len(), 2);
        assert_eq!(pool.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![1, 3]);

        pool.process_removed();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.disabled_len(), 0);
        assert_eq!(pool.get(3), Some(&30));
    }

    #[test]
    fn remove_by_entity_id_is_immediate() {
        let mut pool = pool_of(&[1, 2, 3]);
        assert!(pool.remove_by_entity_id(2));
        assert!(!pool.remove_by_entity_id(2));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.position(3), Some(1));
    }

    #[test]
    fn iter_mut_skips_disabled() {
        let mut pool = pool_of(&[1, 2, 3]);
        pool.mark_as_removed(1);
        for (_, value) in pool.iter_mut() {
            *value += 1;
        }
        assert_eq!(pool.get(2), Some(&21));
        assert_eq!(pool.get(3), Some(&31));
    }

    #[test]
    fn reserve_does_not_change_len() {
        let mut pool: SparsePool<u8> = SparsePool::new();
        pool.reserve(100);
        assert!(pool.capacity() >= 100);
        assert!(pool.is_empty());
    }

    #[test]
    fn block_policy_rounds_capacity() {
        let mut pool = SparsePool::with_policy(Arc::new(BlockAllocator::default()));
        pool.add(1, ()).unwrap();
        assert!(pool.capacity() >= 2);
        pool.add(2, ()).unwrap();
        pool.add(3, ()).unwrap();
        assert!(pool.capacity() >= 4);
    }

    #[test]
    fn clone_is_independent() {
        let mut original = pool_of(&[1, 2]);
        let copy = original.clone();
        *original.get_mut(1).unwrap() = 99;
        assert_eq!(copy.get(1), Some(&10));
    }

    #[test]
    fn clone_from_reuses_and_matches() {
        let source = pool_of(&[4, 6]);
        let mut target = pool_of(&[1, 2, 3, 4, 5]);
        target.clone_from(&source);
        assert_eq!(target.ids().collect::<Vec<_>>(), vec![4, 6]);
        assert_eq!(target.get(6), Some(&60));
    }

    #[test]
    fn iterator_restarts_from_clone() {
        let pool = pool_of(&[1, 2, 3]);
        let iter = pool.iter();
        let first: Vec<_> = iter.clone().map(|(id, _)| id).collect();
        let second: Vec<_> = iter.map(|(id, _)| id).collect();
        assert_eq!(first, second);
    }
}
