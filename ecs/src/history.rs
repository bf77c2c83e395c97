//! Tick-keyed snapshots and checksum-based desync detection.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use tracing::{trace, warn};

use crate::error::{EcsError, EcsResult};
use crate::state::{EcsState, StateChecksum};
use crate::world::World;

/// Fixed number of snapshot slots, each holding one tick.
///
/// Recording a new tick evicts the lowest recorded tick once every slot is
/// taken. Recording a tick that is already present overwrites it.
#[derive(Debug)]
pub struct StateHistory {
    slots: Vec<Option<(u32, EcsState)>>,
}

impl StateHistory {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let mut slots = Vec::with_capacity(capacity.get());
        slots.resize_with(capacity.get(), || None);
        Self { slots }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    fn ticks(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().flatten().map(|(tick, _)| *tick)
    }

    /// Copies `state` into the slot for its `sim_tick`.
    pub fn record(&mut self, state: &EcsState) {
        let tick = state.sim_tick();
        let index = self
            .position(tick)
            .or_else(|| self.slots.iter().position(Option::is_none))
            .or_else(|| {
                self.slots
                    .iter()
                    .enumerate()
                    .filter_map(|(index, slot)| slot.as_ref().map(|(t, _)| (*t, index)))
                    .min()
                    .map(|(_, index)| index)
            });
        let Some(index) = index else {
            return;
        };
        match &mut self.slots[index] {
            Some((slot_tick, snapshot)) => {
                *slot_tick = tick;
                snapshot.clone_from(state);
            }
            empty => *empty = Some((tick, state.clone())),
        }
        trace!(tick, slot = index, "recorded state");
    }

    fn position(&self, tick: u32) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some((t, _)) if *t == tick))
    }

    #[must_use]
    pub fn get(&self, tick: u32) -> Option<&EcsState> {
        self.slots
            .iter()
            .flatten()
            .find(|(t, _)| *t == tick)
            .map(|(_, state)| state)
    }

    /// The recorded state whose tick is nearest `tick`; ties go to the lower tick.
    #[must_use]
    pub fn closest(&self, tick: u32) -> Option<&EcsState> {
        self.slots
            .iter()
            .flatten()
            .min_by_key(|(t, _)| (t.abs_diff(tick), *t))
            .map(|(_, state)| state)
    }

    #[must_use]
    pub fn min_tick(&self) -> Option<u32> {
        self.ticks().min()
    }

    #[must_use]
    pub fn max_tick(&self) -> Option<u32> {
        self.ticks().max()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Makes the snapshot recorded at `tick` the world's current state.
    pub fn revert(&self, world: &mut World, tick: u32) -> EcsResult<()> {
        let state = self.get(tick).ok_or(EcsError::TickNotRetained { tick })?;
        world.replace_current(state);
        Ok(())
    }
}

/// A local and a remote checksum that disagree for the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Desync {
    pub tick: u32,
    pub local: StateChecksum,
    pub remote: StateChecksum,
}

/// Compares local state checksums against ones reported by a peer.
#[derive(Debug)]
pub struct DesyncDetector {
    remote: BTreeMap<u32, StateChecksum>,
    capacity: usize,
}

impl DesyncDetector {
    /// Keeps at most `capacity` remote checksums, dropping the oldest ticks.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            remote: BTreeMap::new(),
            capacity: capacity.get(),
        }
    }

    pub fn register_remote(&mut self, tick: u32, checksum: StateChecksum) {
        self.remote.insert(tick, checksum);
        while self.remote.len() > self.capacity {
            self.remote.pop_first();
        }
    }

    #[must_use]
    pub fn remote(&self, tick: u32) -> Option<StateChecksum> {
        self.remote.get(&tick).copied()
    }

    /// Checks `state` against the remote checksum for its `sim_tick`.
    ///
    /// Returns `Ok(None)` when the checksums agree or no remote checksum is
    /// known for the tick.
    pub fn check(&self, state: &EcsState) -> EcsResult<Option<Desync>> {
        let tick = state.sim_tick();
        let Some(remote) = self.remote(tick) else {
            return Ok(None);
        };
        let local = state.checksum()?;
        if local == remote {
            return Ok(None);
        }
        warn!(tick, %local, %remote, "state checksum mismatch");
        Ok(Some(Desync {
            tick,
            local,
            remote,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StateConfig, WorldConfig};
    use crate::testing::{registry, Position};

    fn state_at(tick: u32) -> EcsState {
        let mut state = EcsState::new(registry(), StateConfig::for_testing()).unwrap();
        state.set_sim_tick(tick);
        state
    }

    fn history(capacity: usize) -> StateHistory {
        StateHistory::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn record_evicts_lowest_tick() {
        let mut history = history(2);
        history.record(&state_at(5));
        history.record(&state_at(3));
        history.record(&state_at(8));
        assert_eq!(history.len(), 2);
        assert_eq!(history.min_tick(), Some(5));
        assert_eq!(history.max_tick(), Some(8));
        assert!(history.get(3).is_none());
    }

    #[test]
    fn record_same_tick_overwrites() {
        let mut history = history(2);
        let mut state = state_at(1);
        history.record(&state);
        let id = state.create_entity(0).unwrap();
        state.add_component(id, Position { x: 4, y: 4 }).unwrap();
        history.record(&state);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.get(1).unwrap().get_component::<Position>(id),
            Some(&Position { x: 4, y: 4 })
        );
    }

    #[test]
    fn closest_prefers_nearest_then_lower() {
        let mut history = history(3);
        for tick in [10, 20, 30] {
            history.record(&state_at(tick));
        }
        assert_eq!(history.closest(24).unwrap().sim_tick(), 20);
        assert_eq!(history.closest(25).unwrap().sim_tick(), 20);
        assert_eq!(history.closest(99).unwrap().sim_tick(), 30);
        history.clear();
        assert!(history.closest(1).is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn revert_replaces_world_state() {
        let mut world = World::new(registry(), WorldConfig::for_testing()).unwrap();
        let mut history = history(4);
        world
            .add_init_system(|state: &mut EcsState| -> EcsResult<()> {
                state.create_entity(0)?;
                Ok(())
            })
            .unwrap();
        world.simulate().unwrap();
        history.record(world.current());
        world.current_mut().destroy_all_entities().unwrap();
        world.simulate().unwrap();
        assert_eq!(world.current().entity_count(), 0);

        history.revert(&mut world, 1).unwrap();
        assert_eq!(world.tick(), 1);
        assert_eq!(world.current().entity_count(), 1);
        assert_eq!(
            history.revert(&mut world, 7),
            Err(EcsError::TickNotRetained { tick: 7 })
        );
    }

    #[test]
    fn detector_reports_mismatch() {
        let mut detector = DesyncDetector::new(NonZeroUsize::new(2).unwrap());
        let mut state = state_at(3);
        assert_eq!(detector.check(&state).unwrap(), None);

        detector.register_remote(3, state.checksum().unwrap());
        assert_eq!(detector.check(&state).unwrap(), None);

        state.create_entity(0).unwrap();
        let desync = detector.check(&state).unwrap().unwrap();
        assert_eq!(desync.tick, 3);
        assert_ne!(desync.local, desync.remote);
    }

    #[test]
    fn detector_is_bounded() {
        let mut detector = DesyncDetector::new(NonZeroUsize::new(2).unwrap());
        for tick in 1..=3 {
            detector.register_remote(tick, StateChecksum::new(u64::from(tick)));
        }
        assert!(detector.remote(1).is_none());
        assert_eq!(detector.remote(3), Some(StateChecksum::new(3)));
    }
}
