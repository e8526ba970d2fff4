use archon_ecs::world::World;
use archon_ecs::query::{Query, QueryFilter};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
}

fn populated_world(count: usize) -> World {
    let mut world = World::new();
    let position = world.schema_mut().register_component::<Position>().unwrap();
    let velocity = world.schema_mut().register_component::<Velocity>().unwrap();
    let _ = (position, velocity);

    for entity in world.create_batch(count) {
        world
            .add_component(entity, Position { x: 0.0, y: 0.0 })
            .unwrap();
        if entity.slot % 2 == 0 {
            world
                .add_component(entity, Velocity { x: 1.0, y: 1.0 })
                .unwrap();
        }
    }
    world
}

fn bench_query_iterate_10k(c: &mut Criterion) {
    let world = populated_world(10_000);
    let position = world.schema().component_id_of::<Position>().unwrap();
    let velocity = world.schema().component_id_of::<Velocity>().unwrap();

    c.bench_function("query_iterate_10k_with_velocity", |b| {
        b.iter(|| {
            let filter = QueryFilter::new()
                .with_component(position)
                .with_component(velocity);
            let query = Query::new(&world, filter);
            let mut touched = 0usize;
            for chunk in query.chunks() {
                let positions = chunk.components::<Position>(position);
                touched += positions.len();
            }
            black_box(touched);
        })
    });
}

fn bench_query_count_only(c: &mut Criterion) {
    let world = populated_world(10_000);
    let position = world.schema().component_id_of::<Position>().unwrap();

    c.bench_function("query_count_10k", |b| {
        b.iter(|| {
            let filter = QueryFilter::new().with_component(position);
            let query = Query::new(&world, filter);
            black_box(query.count());
        })
    });
}

criterion_group!(benches, bench_query_iterate_10k, bench_query_count_only);
criterion_main!(benches);
