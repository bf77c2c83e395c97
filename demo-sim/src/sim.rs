//! Demo systems. Every random choice comes from an LCG seeded by
//! `(seed, tick)`, so re-simulating a tick after rollback repeats it exactly.

use demo_schema::{
    Health, Npc, Position, Status, Velocity, Yaw, HEALTH_MAX, POS_MAX, POS_MIN, VEL_MAX, VEL_MIN,
    YAW_STEPS,
};
use ecs::{EcsResult, EcsState, World};

const SPACES: u32 = 4;
const STEER_SALT: u64 = 0x5354_4545_52;
const COMBAT_SALT: u64 = 0x434F_4D42_4154;
const SPAWN_SALT: u64 = 0x5350_4157_4E;
const REGEN_DELAY: u8 = 5;

#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn for_tick(seed: u64, salt: u64, tick: u32) -> Self {
        let mut rng = Self::new(seed ^ salt ^ u64::from(tick).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        rng.next_u32();
        rng
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    /// Uniform in `[min, max]`.
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        let span = u64::from(min.abs_diff(max)) + 1;
        let offset = u64::from(self.next_u32()) % span;
        (i64::from(min) + offset as i64) as i32
    }

    pub fn one_in(&mut self, n: u32) -> bool {
        self.next_u32() % n.max(1) == 0
    }
}

/// Installs the demo systems and spawns `target` entities.
pub fn install(world: &mut World, seed: u64, target: u32) -> EcsResult<()> {
    world.add_init_system(move |state: &mut EcsState| -> EcsResult<()> {
        let mut rng = Lcg::for_tick(seed, SPAWN_SALT, 0);
        for _ in 0..target {
            spawn(state, &mut rng)?;
        }
        Ok(())
    })?;
    world.add_run_once_system(arm_npcs);
    world.add_simulation_system(move |state: &mut EcsState, tick: u32| -> EcsResult<()> {
        steer(state, &mut Lcg::for_tick(seed, STEER_SALT, tick));
        Ok(())
    });
    world.add_simulation_system(integrate);
    world.add_simulation_system(move |state: &mut EcsState, tick: u32| -> EcsResult<()> {
        combat(state, &mut Lcg::for_tick(seed, COMBAT_SALT, tick))
    });
    world.add_simulation_system(move |state: &mut EcsState, tick: u32| -> EcsResult<()> {
        let mut rng = Lcg::for_tick(seed, SPAWN_SALT, tick);
        while state.entity_count() < target as usize {
            spawn(state, &mut rng)?;
        }
        Ok(())
    });
    Ok(())
}

fn spawn(state: &mut EcsState, rng: &mut Lcg) -> EcsResult<u32> {
    let id = state.create_entity(rng.next_u32() % SPACES)?;
    state.add_component(
        id,
        Position {
            x: rng.range_i32(POS_MIN / 2, POS_MAX / 2),
            y: rng.range_i32(POS_MIN / 2, POS_MAX / 2),
        },
    )?;
    state.add_component(
        id,
        Velocity {
            dx: random_velocity(rng),
            dy: random_velocity(rng),
        },
    )?;
    state.add_component(id, Yaw((rng.next_u32() % u32::from(YAW_STEPS)) as u16))?;
    state.add_component(
        id,
        Health {
            current: HEALTH_MAX,
            max: HEALTH_MAX,
            regen_timer: 0,
        },
    )?;
    state.add_component(id, Status::default())?;
    if rng.one_in(2) {
        state.add_component(id, Npc)?;
    }
    Ok(id)
}

fn random_velocity(rng: &mut Lcg) -> i16 {
    rng.range_i32(i32::from(VEL_MIN) / 10, i32::from(VEL_MAX) / 10) as i16
}

fn arm_npcs(state: &mut EcsState) -> EcsResult<()> {
    let npcs: Vec<u32> = state.components::<Npc>().map(|(id, _)| id).collect();
    for id in npcs {
        if let Some(status) = state.get_component_mut::<Status>(id) {
            status.shielded = true;
        }
    }
    Ok(())
}

fn steer(state: &mut EcsState, rng: &mut Lcg) {
    for (_, velocity) in state.components_mut::<Velocity>() {
        if rng.one_in(20) {
            velocity.dx = nudge(velocity.dx, rng);
            velocity.dy = nudge(velocity.dy, rng);
        }
    }
    for (_, yaw) in state.components_mut::<Yaw>() {
        yaw.0 = ((u32::from(yaw.0) + rng.next_u32() % 13) % u32::from(YAW_STEPS)) as u16;
    }
    for (_, status) in state.components_mut::<Status>() {
        if rng.one_in(50) {
            status.stunned = !status.stunned;
        }
    }
}

fn nudge(value: i16, rng: &mut Lcg) -> i16 {
    let nudged = i32::from(value) + rng.range_i32(-50, 50);
    nudged.clamp(i32::from(VEL_MIN), i32::from(VEL_MAX)) as i16
}

fn integrate(state: &mut EcsState, _tick: u32) -> EcsResult<()> {
    let moving: Vec<(u32, Velocity)> = state
        .components::<Velocity>()
        .filter(|(id, _)| {
            !state
                .get_component::<Status>(*id)
                .is_some_and(|status| status.stunned)
        })
        .map(|(id, velocity)| (id, *velocity))
        .collect();
    for (id, mut velocity) in moving {
        let Some(position) = state.get_component_mut::<Position>(id) else {
            continue;
        };
        let (x, bounced_x) = bounce(position.x, velocity.dx);
        let (y, bounced_y) = bounce(position.y, velocity.dy);
        position.x = x;
        position.y = y;
        if bounced_x {
            velocity.dx = -velocity.dx;
        }
        if bounced_y {
            velocity.dy = -velocity.dy;
        }
        if bounced_x || bounced_y {
            if let Some(stored) = state.get_component_mut::<Velocity>(id) {
                *stored = velocity;
            }
        }
    }
    Ok(())
}

fn bounce(position: i32, velocity: i16) -> (i32, bool) {
    let next = position + i32::from(velocity);
    if next <= POS_MIN || next >= POS_MAX {
        (next.clamp(POS_MIN, POS_MAX), true)
    } else {
        (next, false)
    }
}

fn combat(state: &mut EcsState, rng: &mut Lcg) -> EcsResult<()> {
    let mut dead = Vec::new();
    let shielded: Vec<u32> = state
        .components::<Status>()
        .filter(|(_, status)| status.shielded)
        .map(|(id, _)| id)
        .collect();
    for (id, health) in state.components_mut::<Health>() {
        if rng.one_in(15) {
            let mut damage = rng.range_i32(5, 40) as u8;
            if shielded.binary_search(&id).is_ok() {
                damage /= 2;
            }
            health.current = health.current.saturating_sub(damage);
            if health.current == 0 {
                dead.push(id);
                continue;
            }
        }
        if health.current < health.max {
            if health.regen_timer == 0 {
                health.current += 1;
                health.regen_timer = REGEN_DELAY;
            } else {
                health.regen_timer -= 1;
            }
        }
    }
    for id in dead {
        state.destroy_entity(id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcg_is_reproducible() {
        let mut a = Lcg::for_tick(7, STEER_SALT, 3);
        let mut b = Lcg::for_tick(7, STEER_SALT, 3);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_ne!(
            Lcg::for_tick(7, STEER_SALT, 3).next_u32(),
            Lcg::for_tick(7, STEER_SALT, 4).next_u32()
        );
    }

    #[test]
    fn range_stays_inside_bounds() {
        let mut rng = Lcg::new(42);
        for _ in 0..1000 {
            let value = rng.range_i32(-5, 5);
            assert!((-5..=5).contains(&value));
        }
    }

    #[test]
    fn bounce_flips_at_edges() {
        assert_eq!(bounce(POS_MAX - 1, 10), (POS_MAX, true));
        assert_eq!(bounce(0, -10), (-10, false));
    }
}
