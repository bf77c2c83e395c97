use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use bitstream::{BitVecWriter, SimpleBufferPool};
use clap::Parser;
use ecs::{ComponentRegistry, DesyncDetector, EcsState, StateConfig, World, WorldConfig};
use serde::Serialize;

mod sim;

/// Depth of the periodic rollback check, capped by the ring size.
const ROLLBACK_DEPTH: usize = 3;

#[derive(Parser)]
#[command(
    name = "demo-sim",
    version,
    about = "Deterministic rollback simulation check"
)]
struct Cli {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 300)]
    ticks: u32,
    /// Number of entities kept alive.
    #[arg(long, default_value_t = 64)]
    entities: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// States kept in the world ring buffer.
    #[arg(long, default_value_t = 8)]
    buffer: usize,
    /// Roll back and re-simulate every N ticks; 0 disables.
    #[arg(long, default_value_t = 10)]
    rollback_every: u32,
    /// Output directory for the summary and final state.
    #[arg(long, default_value = "captures")]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = Arc::new(demo_schema::registry().context("build demo registry")?);
    let config = WorldConfig {
        max_state_buffer_size: cli.buffer,
        state: StateConfig::default(),
    };

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("create output dir {}", cli.out.display()))?;

    let mut world = build_world(&registry, config, &cli)?;
    // Independent replica standing in for a remote peer.
    let mut peer = build_world(&registry, config, &cli)?;
    let mut detector =
        DesyncDetector::new(NonZeroUsize::new(cli.buffer).unwrap_or(NonZeroUsize::MIN));
    let mut scratch =
        EcsState::new(Arc::clone(&registry), config.state).context("create scratch state")?;
    let mut buffers = SimpleBufferPool::new(2);

    let mut summary = Summary::new(&cli, config);
    for _ in 0..cli.ticks {
        let tick = world.simulate().context("simulate")?;
        let peer_tick = peer.simulate().context("simulate peer")?;
        detector.register_remote(peer_tick, peer.current().checksum()?);
        if let Some(desync) = detector.check(world.current())? {
            anyhow::bail!(
                "desync at tick {}: local {} remote {}",
                desync.tick,
                desync.local,
                desync.remote
            );
        }

        let bytes = verify_roundtrip(world.current(), &mut scratch, &mut buffers)
            .with_context(|| format!("round trip at tick {tick}"))?;
        summary.push_tick(bytes, world.current().entity_count());

        if cli.rollback_every > 0 && tick % cli.rollback_every == 0 {
            let depth = ROLLBACK_DEPTH.min(world.retained() - 1);
            if depth > 0 {
                verify_rollback(&mut world, depth)
                    .with_context(|| format!("rollback at tick {tick}"))?;
                summary.rollbacks += 1;
            }
        }
    }

    let state = world.current();
    let final_bytes = state.to_bytes().context("serialize final state")?;
    summary.finalize(state.sim_tick(), state.entity_count(), state.checksum()?.to_string());

    let path = cli.out.join("final_state.bin");
    fs::write(&path, &final_bytes).with_context(|| format!("write {}", path.display()))?;
    write_summary_json(&cli.out, &summary)?;
    Ok(())
}

fn build_world(registry: &Arc<ComponentRegistry>, config: WorldConfig, cli: &Cli) -> Result<World> {
    let mut world = World::new(Arc::clone(registry), config).context("create world")?;
    sim::install(&mut world, cli.seed, cli.entities).context("install systems")?;
    Ok(world)
}

/// Serializes `state`, decodes it into `scratch` and checks the copy encodes
/// to the same bytes. Returns the blob size.
fn verify_roundtrip(
    state: &EcsState,
    scratch: &mut EcsState,
    buffers: &mut SimpleBufferPool,
) -> Result<usize> {
    let mut writer = BitVecWriter::from_pool(buffers, 4096);
    state.serialize(&mut writer).context("serialize")?;
    let len = writer.as_slice().len();
    let decoded = scratch.deserialize_bytes(writer.as_slice());
    let again = decoded.and_then(|()| scratch.to_bytes());
    let same = again
        .as_ref()
        .is_ok_and(|bytes| bytes.as_slice() == writer.as_slice());
    writer.release_into(buffers);

    again.context("deserialize and re-serialize")?;
    ensure!(same, "re-serialized state differs");
    ensure!(
        scratch.entity_count() == state.entity_count(),
        "entity count differs after round trip"
    );
    ensure!(
        scratch.checksum()? == state.checksum()?,
        "checksum differs after round trip"
    );
    Ok(len)
}

fn verify_rollback(world: &mut World, depth: usize) -> Result<()> {
    let tick = world.tick();
    let expected = world.current().to_bytes()?;
    let target = tick.wrapping_sub(depth as u32);
    world.rollback_to(target)?;
    for _ in 0..depth {
        world.simulate()?;
    }
    ensure!(world.tick() == tick, "re-simulation ended on tick {}", world.tick());
    ensure!(
        world.current().to_bytes()? == expected,
        "re-simulated state differs"
    );
    Ok(())
}

fn write_summary_json(out_dir: &Path, summary: &Summary) -> Result<()> {
    let path = out_dir.join("summary.json");
    let contents = serde_json::to_string_pretty(summary).context("serialize summary")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct Summary {
    ticks: u32,
    target_entities: u32,
    seed: u64,
    config: WorldConfig,
    rollback_every: u32,
    rollbacks: u32,
    final_tick: u32,
    final_entities: usize,
    min_entities: usize,
    max_entities: usize,
    state_bytes_total: u64,
    avg_state_bytes: u64,
    max_state_bytes: u64,
    final_checksum: String,
}

impl Summary {
    fn new(cli: &Cli, config: WorldConfig) -> Self {
        Self {
            ticks: cli.ticks,
            target_entities: cli.entities,
            seed: cli.seed,
            config,
            rollback_every: cli.rollback_every,
            rollbacks: 0,
            final_tick: 0,
            final_entities: 0,
            min_entities: usize::MAX,
            max_entities: 0,
            state_bytes_total: 0,
            avg_state_bytes: 0,
            max_state_bytes: 0,
            final_checksum: String::new(),
        }
    }

    fn push_tick(&mut self, bytes: usize, entities: usize) {
        let bytes = bytes as u64;
        self.state_bytes_total += bytes;
        self.max_state_bytes = self.max_state_bytes.max(bytes);
        self.min_entities = self.min_entities.min(entities);
        self.max_entities = self.max_entities.max(entities);
    }

    fn finalize(&mut self, tick: u32, entities: usize, checksum: String) {
        self.final_tick = tick;
        self.final_entities = entities;
        self.final_checksum = checksum;
        if self.ticks > 0 {
            self.avg_state_bytes = self.state_bytes_total / u64::from(self.ticks);
        } else {
            self.min_entities = entities;
        }
    }
}
