//! Tick driver over a ring buffer of states.
//!
//! Each [`World::simulate`] call copies the current state into the next
//! slot, runs systems against the copy and publishes it as current. The
//! previous state is locked and kept for rollback until the ring wraps
//! around to it.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};
use crate::registry::ComponentRegistry;
use crate::state::EcsState;

/// Runs once, immediately, against the current state when added.
pub trait InitSystem {
    fn init(&mut self, state: &mut EcsState) -> EcsResult<()>;
}

/// Runs once at the start of the next simulated tick, then is dropped.
pub trait RunOnceSystem {
    fn run(&mut self, state: &mut EcsState) -> EcsResult<()>;
}

/// Runs every tick against the state being simulated.
pub trait SimulationSystem {
    fn simulate(&mut self, state: &mut EcsState, tick: u32) -> EcsResult<()>;
}

/// Observes the last simulated and current states, e.g. for interpolation.
pub trait ViewSystem {
    fn update(&mut self, previous: &EcsState, current: &EcsState);
}

impl<F> InitSystem for F
where
    F: FnMut(&mut EcsState) -> EcsResult<()>,
{
    fn init(&mut self, state: &mut EcsState) -> EcsResult<()> {
        self(state)
    }
}

impl<F> RunOnceSystem for F
where
    F: FnMut(&mut EcsState) -> EcsResult<()>,
{
    fn run(&mut self, state: &mut EcsState) -> EcsResult<()> {
        self(state)
    }
}

impl<F> SimulationSystem for F
where
    F: FnMut(&mut EcsState, u32) -> EcsResult<()>,
{
    fn simulate(&mut self, state: &mut EcsState, tick: u32) -> EcsResult<()> {
        self(state, tick)
    }
}

impl<F> ViewSystem for F
where
    F: FnMut(&EcsState, &EcsState),
{
    fn update(&mut self, previous: &EcsState, current: &EcsState) {
        self(previous, current);
    }
}

/// Handle returned when a system is added, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

/// A ring buffer of states plus the systems that advance them.
pub struct World {
    config: WorldConfig,
    states: Vec<EcsState>,
    current: usize,
    filled: usize,
    next_system: u64,
    run_once: Vec<(SystemId, Box<dyn RunOnceSystem>)>,
    simulation: Vec<(SystemId, Box<dyn SimulationSystem>)>,
    views: Vec<(SystemId, Box<dyn ViewSystem>)>,
}

impl World {
    /// Creates a world whose ring holds `config.max_state_buffer_size` states.
    pub fn new(registry: Arc<ComponentRegistry>, config: WorldConfig) -> EcsResult<Self> {
        Self::with_states(config, || EcsState::new(Arc::clone(&registry), config.state))
    }

    /// Creates a world whose states come from `make_state`.
    pub fn with_states<F>(config: WorldConfig, mut make_state: F) -> EcsResult<Self>
    where
        F: FnMut() -> EcsResult<EcsState>,
    {
        config.validate()?;
        let states = (0..config.max_state_buffer_size)
            .map(|_| make_state())
            .collect::<EcsResult<Vec<_>>>()?;
        Ok(Self {
            config,
            states,
            current: 0,
            filled: 1,
            next_system: 0,
            run_once: Vec::new(),
            simulation: Vec::new(),
            views: Vec::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[must_use]
    pub fn current(&self) -> &EcsState {
        &self.states[self.current]
    }

    pub fn current_mut(&mut self) -> &mut EcsState {
        &mut self.states[self.current]
    }

    /// Tick of the current state.
    #[must_use]
    pub fn tick(&self) -> u32 {
        self.current().sim_tick()
    }

    /// Number of states available for rollback, the current one included.
    #[must_use]
    pub const fn retained(&self) -> usize {
        self.filled
    }

    fn back(&self, steps: usize) -> usize {
        let cap = self.states.len();
        (self.current + cap - steps) % cap
    }

    fn retained_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.filled).map(move |steps| self.back(steps))
    }

    /// The state simulated before the current one, if still retained.
    #[must_use]
    pub fn last_simulated(&self) -> Option<&EcsState> {
        (self.filled >= 2).then(|| &self.states[self.back(1)])
    }

    #[must_use]
    pub fn state_at(&self, tick: u32) -> Option<&EcsState> {
        self.retained_indices()
            .map(|index| &self.states[index])
            .find(|state| state.sim_tick() == tick)
    }

    /// Tick of the oldest retained state.
    #[must_use]
    pub fn oldest_tick(&self) -> u32 {
        self.states[self.back(self.filled - 1)].sim_tick()
    }

    fn next_id(&mut self) -> SystemId {
        let id = SystemId(self.next_system);
        self.next_system += 1;
        id
    }

    /// Runs `system` against the current state right away.
    pub fn add_init_system<S: InitSystem>(&mut self, mut system: S) -> EcsResult<()> {
        system.init(self.current_mut())
    }

    pub fn add_run_once_system<S: RunOnceSystem + 'static>(&mut self, system: S) -> SystemId {
        let id = self.next_id();
        self.run_once.push((id, Box::new(system)));
        id
    }

    pub fn add_simulation_system<S: SimulationSystem + 'static>(&mut self, system: S) -> SystemId {
        let id = self.next_id();
        self.simulation.push((id, Box::new(system)));
        id
    }

    pub fn add_view_system<S: ViewSystem + 'static>(&mut self, system: S) -> SystemId {
        let id = self.next_id();
        self.views.push((id, Box::new(system)));
        id
    }

    pub fn remove_system(&mut self, id: SystemId) -> bool {
        let before = self.run_once.len() + self.simulation.len() + self.views.len();
        self.run_once.retain(|(system, _)| *system != id);
        self.simulation.retain(|(system, _)| *system != id);
        self.views.retain(|(system, _)| *system != id);
        before != self.run_once.len() + self.simulation.len() + self.views.len()
    }

    /// Advances one tick and returns the new tick.
    ///
    /// On error the world stays on the previous tick and the slot that was
    /// being simulated is dropped from the retained range. Queued run-once
    /// systems are only consumed by a tick that succeeds, so a retry runs
    /// them again. A ring of one state simulates in place, so there the
    /// partial tick remains.
    pub fn simulate(&mut self) -> EcsResult<u32> {
        let cap = self.states.len();
        let previous = self.current;
        let next = (previous + 1) % cap;
        match self.step(previous, next) {
            Ok(tick) => {
                if cap > 1 {
                    self.states[previous].lock();
                }
                self.run_once.clear();
                self.current = next;
                self.filled = (self.filled + 1).min(cap);
                debug!(tick, retained = self.filled, "simulated tick");
                Ok(tick)
            }
            Err(err) => {
                if cap > 1 {
                    self.filled = self.filled.min(cap - 1);
                }
                Err(err)
            }
        }
    }

    fn step(&mut self, previous: usize, next: usize) -> EcsResult<u32> {
        if previous != next {
            let (source, target) = pair_mut(&mut self.states, previous, next);
            target.unlock();
            source.copy_to(target)?;
        }
        let state = &mut self.states[next];
        state.advance_ticks();
        let tick = state.sim_tick();
        for (_, system) in &mut self.run_once {
            system.run(state)?;
        }
        for (_, system) in &mut self.simulation {
            system.simulate(state, tick)?;
        }
        state.process_removed();
        Ok(tick)
    }

    /// Makes the retained state at `tick` current and forgets newer ones.
    pub fn rollback_to(&mut self, tick: u32) -> EcsResult<()> {
        let steps = self
            .retained_indices()
            .position(|index| self.states[index].sim_tick() == tick)
            .ok_or(EcsError::TickNotRetained { tick })?;
        self.current = self.back(steps);
        self.filled -= steps;
        self.states[self.current].unlock();
        debug!(tick, dropped = steps, "rolled back");
        Ok(())
    }

    /// Overwrites the current state with `source` and forgets older states.
    pub fn replace_current(&mut self, source: &EcsState) {
        let state = &mut self.states[self.current];
        state.clone_from(source);
        state.unlock();
        self.filled = 1;
    }

    /// Calls every view system with the last simulated and current states.
    ///
    /// Before the first tick both arguments are the current state.
    pub fn update_view_systems(&mut self) {
        let current = &self.states[self.current];
        let previous = if self.filled >= 2 {
            &self.states[self.back(1)]
        } else {
            current
        };
        for (_, view) in &mut self.views {
            view.update(previous, current);
        }
    }
}

fn pair_mut(states: &mut [EcsState], a: usize, b: usize) -> (&mut EcsState, &mut EcsState) {
    if a < b {
        let (low, high) = states.split_at_mut(b);
        (&mut low[a], &mut high[0])
    } else {
        let (low, high) = states.split_at_mut(a);
        (&mut high[0], &mut low[b])
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick())
            .field("capacity", &self.states.len())
            .field("retained", &self.filled)
            .field("run_once", &self.run_once.len())
            .field("simulation", &self.simulation.len())
            .field("views", &self.views.len())
            .finish()
    }
}
