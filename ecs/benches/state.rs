use std::hint::black_box;
use std::sync::Arc;

use bitstream::{BitRead, BitResult, BitWrite};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ecs::{ComponentRegistry, EcsFilter, EcsState, SparsePool, StateConfig};
use schema::{Component, PlainResolver, SerializableData};

const ENTITIES: u32 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Position {
    x: i32,
    y: i32,
}

impl Component for Position {
    const NAME: &'static str = "Position";
}

impl SerializableData for Position {
    fn serialize(&self, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_i32(self.x)?;
        writer.write_i32(self.y)
    }

    fn deserialize(&mut self, reader: &mut dyn BitRead) -> BitResult<()> {
        self.x = reader.read_i32()?;
        self.y = reader.read_i32()?;
        Ok(())
    }
}

fn populated_state() -> EcsState {
    let registry = Arc::new(
        ComponentRegistry::builder()
            .register_with::<Position, _>(PlainResolver::<Position>::new())
            .build()
            .expect("registry"),
    );
    let config = StateConfig {
        entities_per_space: ENTITIES,
        initial_capacity: ENTITIES as usize,
    };
    let mut state = EcsState::new(registry, config).expect("state");
    for i in 0..ENTITIES {
        let id = state.create_entity(0).expect("create");
        if i % 2 == 0 {
            state
                .add_component(id, Position { x: i as i32, y: 0 })
                .expect("add");
        }
    }
    state
}

fn pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");

    group.bench_function("add_ascending_10k", |b| {
        b.iter(|| {
            let mut pool = SparsePool::new();
            for id in 0..ENTITIES {
                pool.add(id, id).expect("add");
            }
            black_box(pool);
        });
    });

    let mut pool = SparsePool::new();
    for id in 0..ENTITIES {
        pool.add(id, id).expect("add");
    }
    group.bench_function("get_10k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for id in 0..ENTITIES {
                sum += u64::from(*pool.get(black_box(id)).expect("get"));
            }
            black_box(sum);
        });
    });

    group.bench_function("mark_half_then_compact", |b| {
        b.iter_batched(
            || pool.clone(),
            |mut pool| {
                for id in (0..ENTITIES).step_by(2) {
                    pool.mark_as_removed(id);
                }
                pool.process_removed();
                black_box(pool);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn state_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("state");
    let state = populated_state();
    let bytes = state.to_bytes().expect("serialize");

    group.bench_function("serialize_10k", |b| {
        b.iter(|| black_box(state.to_bytes().expect("serialize")));
    });

    group.bench_function("deserialize_10k", |b| {
        let mut target = state.clone();
        b.iter(|| {
            target.deserialize_bytes(black_box(&bytes)).expect("deserialize");
        });
    });

    group.bench_function("copy_to_10k", |b| {
        let mut source = state.clone();
        let mut target = state.clone();
        b.iter(|| source.copy_to(&mut target).expect("copy"));
    });

    let filter = EcsFilter::builder(state.registry())
        .include::<Position>()
        .build()
        .expect("filter");
    group.bench_function("filter_10k", |b| {
        b.iter(|| black_box(filter.count(&state)));
    });

    group.finish();
}

criterion_group!(benches, pool_benchmark, state_benchmark);
criterion_main!(benches);
