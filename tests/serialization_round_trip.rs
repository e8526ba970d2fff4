use archon_ecs::serialization::{deserialize_world, serialize_world};
use archon_ecs::world::World;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}

#[test]
fn a_saved_world_reloads_with_identical_entities_and_component_values() {
    let mut world = World::new();
    world.schema_mut().register_component::<Position>().unwrap();
    world.schema_mut().register_component::<Velocity>().unwrap();

    let mut entities = Vec::new();
    for i in 0..40 {
        let entity = world.create_entity();
        world
            .add_component(entity, Position { x: i as f32, y: -(i as f32) })
            .unwrap();
        if i % 3 == 0 {
            world.add_component(entity, Velocity { x: 1.0, y: 0.0 }).unwrap();
        }
        entities.push(entity);
    }

    let bytes = serialize_world(&world);
    let mut loaded = deserialize_world(&bytes).unwrap();

    assert_eq!(loaded.entity_count(), world.entity_count());
    assert_eq!(loaded.archetype_count(), world.archetype_count());

    // The deserialized schema has no live TypeId bindings until resolved.
    let position = loaded.schema_mut().resolve_component::<Position>().unwrap();
    loaded.schema_mut().resolve_component::<Velocity>().unwrap();
    assert_eq!(position, world.schema().component_id_of::<Position>().unwrap());

    // Every original handle must still resolve, to the same component
    // values, after the round trip — not just the same aggregate counts.
    for (i, &entity) in entities.iter().enumerate() {
        assert!(loaded.is_alive(entity));
        assert_eq!(
            *loaded.component::<Position>(entity).unwrap(),
            Position { x: i as f32, y: -(i as f32) }
        );
        assert_eq!(
            loaded.has_component::<Velocity>(entity).unwrap(),
            i % 3 == 0
        );
    }
}

#[test]
fn a_stale_handle_from_before_a_destroy_stays_stale_after_a_round_trip() {
    let mut world = World::new();
    world.schema_mut().register_component::<Position>().unwrap();

    let a = world.create_entity();
    world.add_component(a, Position { x: 1.0, y: 1.0 }).unwrap();
    let stale = a;

    world.destroy(a).unwrap();
    let a = world.create_entity();
    world.add_component(a, Position { x: 2.0, y: 2.0 }).unwrap();

    let bytes = serialize_world(&world);
    let mut loaded = deserialize_world(&bytes).unwrap();
    loaded.schema_mut().resolve_component::<Position>().unwrap();

    assert!(!loaded.is_alive(stale));
    assert!(loaded.is_alive(a));
    assert_eq!(*loaded.component::<Position>(a).unwrap(), Position { x: 2.0, y: 2.0 });
}

#[test]
fn rejects_payloads_with_the_wrong_signature() {
    let bytes = vec![0u8; 32];
    assert!(deserialize_world(&bytes).is_err());
}
