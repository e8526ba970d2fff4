use archon_ecs::serialization::{deserialize_world, serialize_world};
use archon_ecs::world::World;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy)]
struct Health(u32);

fn populated_world(count: usize) -> World {
    let mut world = World::new();
    world.schema_mut().register_component::<Position>().unwrap();
    world.schema_mut().register_component::<Health>().unwrap();

    for entity in world.create_batch(count) {
        world
            .add_component(entity, Position { x: 1.0, y: 2.0 })
            .unwrap();
        world.add_component(entity, Health(100)).unwrap();
    }
    world
}

fn bench_serialize_5k_entities(c: &mut Criterion) {
    let world = populated_world(5_000);

    c.bench_function("serialize_world_5k_entities", |b| {
        b.iter(|| {
            let bytes = serialize_world(&world);
            black_box(bytes.len());
        })
    });
}

fn bench_round_trip_5k_entities(c: &mut Criterion) {
    let world = populated_world(5_000);
    let bytes = serialize_world(&world);

    c.bench_function("deserialize_world_5k_entities", |b| {
        b.iter(|| {
            let loaded = deserialize_world(black_box(&bytes)).unwrap();
            black_box(loaded.entity_count());
        })
    });
}

criterion_group!(
    benches,
    bench_serialize_5k_entities,
    bench_round_trip_5k_entities
);
criterion_main!(benches);
