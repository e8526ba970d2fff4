use archon_ecs::world::World;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(u32);

#[test]
fn disabling_and_re_enabling_preserves_component_state() {
    let mut world = World::new();
    world.schema_mut().register_component::<Health>().unwrap();

    let entity = world.create_entity();
    world.add_component(entity, Health(50)).unwrap();

    assert!(!world.is_disabled(entity).unwrap());

    world.disable(entity).unwrap();
    assert!(world.is_disabled(entity).unwrap());
    assert_eq!(world.component::<Health>(entity).unwrap().0, 50);

    world.enable(entity).unwrap();
    assert!(!world.is_disabled(entity).unwrap());
    assert_eq!(world.component::<Health>(entity).unwrap().0, 50);
}

#[test]
fn disabling_twice_is_a_structural_no_op_after_the_first_call() {
    let mut world = World::new();
    let entity = world.create_entity();

    world.disable(entity).unwrap();
    let archetype_count_before = world.archetype_count();
    world.disable(entity).unwrap();
    assert_eq!(world.archetype_count(), archetype_count_before);
}
