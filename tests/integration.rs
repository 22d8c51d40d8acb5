use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};

use redlilium_transform::prelude::*;
use redlilium_transform::{Attached, DepthGroup, PendingFrozen};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn world_of(world: &World, entity: Entity) -> Mat4 {
    world
        .get::<WorldMatrix>(entity)
        .unwrap_or_else(|| panic!("{entity} has no WorldMatrix"))
        .0
}

fn assert_mat_eq(actual: Mat4, expected: Mat4) {
    assert!(
        actual.abs_diff_eq(expected, 1e-3),
        "matrices differ:\n  actual   {actual:?}\n  expected {expected:?}"
    );
}

// ---------------------------------------------------------------------------
// Local composition
// ---------------------------------------------------------------------------

#[test]
fn single_input_roots_get_pure_matrices() {
    init_logging();
    let mut world = World::new();
    let rotation = Quat::from_rotation_z(FRAC_PI_4);

    let scaled = world.spawn(Scale(Vec3::new(2.0, 3.0, 4.0))).id();
    let rotated = world.spawn(Rotation(rotation)).id();
    let moved = world.spawn(Position::from_xyz(1.0, 2.0, 3.0)).id();

    TransformPipeline::new().update(&mut world);

    assert_eq!(
        world_of(&world, scaled),
        Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0))
    );
    assert_eq!(world_of(&world, rotated), Mat4::from_quat(rotation));
    assert_eq!(
        world_of(&world, moved),
        Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
    );
}

#[test]
fn full_transform_applies_scale_then_rotation_then_translation() {
    let mut world = World::new();
    let entity = world
        .spawn((
            Position::from_xyz(10.0, 0.0, 0.0),
            Rotation(Quat::from_rotation_z(FRAC_PI_2)),
            Scale(Vec3::new(2.0, 1.0, 1.0)),
        ))
        .id();

    TransformPipeline::new().update(&mut world);

    // (1, 0, 0) -> scale (2, 0, 0) -> rotate (0, 2, 0) -> translate (10, 2, 0)
    let point = world
        .get::<WorldMatrix>(entity)
        .unwrap()
        .transform_point(Vec3::X);
    assert!(point.abs_diff_eq(Vec3::new(10.0, 2.0, 0.0), 1e-5), "{point}");
}

#[test]
fn three_position_roots_have_no_depth_group() {
    let mut world = World::new();
    let positions = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, -2.0, 0.0),
        Vec3::new(3.0, 4.0, 5.0),
    ];
    let roots: Vec<Entity> = positions
        .iter()
        .map(|&p| world.spawn(Position(p)).id())
        .collect();

    TransformPipeline::new().update(&mut world);

    for (&root, &position) in roots.iter().zip(&positions) {
        assert_eq!(world_of(&world, root), Mat4::from_translation(position));
        assert!(world.get::<DepthGroup>(root).is_none());
    }
}

#[test]
fn root_update_is_incremental() {
    let mut world = World::new();
    let root = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let mut pipeline = TransformPipeline::new();
    pipeline.update(&mut world);

    world.get_mut::<Position>(root).unwrap().0 = Vec3::new(0.0, 7.0, 0.0);
    pipeline.update(&mut world);

    assert_eq!(
        world.get::<WorldMatrix>(root).unwrap().translation(),
        Vec3::new(0.0, 7.0, 0.0)
    );
}

#[test]
fn removed_input_recomposes_root() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();
    let root = world
        .spawn((Position::from_xyz(1.0, 0.0, 0.0), Scale::splat(2.0)))
        .id();
    pipeline.update(&mut world);

    world.entity_mut(root).remove::<Scale>();
    pipeline.update(&mut world);
    assert_eq!(
        world_of(&world, root),
        Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
    );

    // A second cycle must not undo the rebuild.
    pipeline.update(&mut world);
    assert_eq!(
        world_of(&world, root),
        Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
    );

    world.entity_mut(root).remove::<Position>();
    pipeline.update(&mut world);
    assert_eq!(world_of(&world, root), Mat4::IDENTITY);
}

#[test]
fn removed_input_recomposes_leaf() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();
    let parent = world.spawn(Position::from_xyz(5.0, 0.0, 0.0)).id();
    let leaf = world
        .spawn((Position::from_xyz(0.0, 1.0, 0.0), Scale::splat(2.0)))
        .id();
    world.request_attach(parent, leaf);
    pipeline.update(&mut world);

    world.entity_mut(leaf).remove::<Scale>();
    pipeline.update(&mut world);

    assert_eq!(
        world.get::<LocalToParent>(leaf).unwrap().0,
        Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))
    );
    assert_eq!(
        world_of(&world, leaf),
        Mat4::from_translation(Vec3::new(5.0, 1.0, 0.0))
    );
}

#[test]
fn removed_input_recomposes_inner_node() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();
    let root = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let inner = world
        .spawn((Position::from_xyz(0.0, 1.0, 0.0), Rotation(Quat::from_rotation_z(FRAC_PI_2))))
        .id();
    let leaf = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    world.request_attach(root, inner);
    world.request_attach(inner, leaf);
    pipeline.update(&mut world);

    world.entity_mut(inner).remove::<Rotation>();
    pipeline.update(&mut world);

    let translation = world.get::<WorldMatrix>(leaf).unwrap().translation();
    assert!(
        translation.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-5),
        "{translation}"
    );
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

#[test]
fn chain_world_is_product_of_locals() {
    init_logging();
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let root_local = Mat4::from_rotation_translation(
        Quat::from_rotation_y(0.3),
        Vec3::new(1.0, 2.0, 3.0),
    );
    let root = world
        .spawn((
            Rotation(Quat::from_rotation_y(0.3)),
            Position::from_xyz(1.0, 2.0, 3.0),
        ))
        .id();

    let mut chain = vec![root];
    let mut expected = vec![root_local];
    for i in 1..=12 {
        let rotation = Quat::from_rotation_x(0.1 * i as f32);
        let position = Vec3::new(0.5, i as f32 * 0.25, -1.0);
        let scale = Vec3::splat(1.0 + 0.01 * i as f32);
        let entity = world
            .spawn((Rotation(rotation), Position(position), Scale(scale)))
            .id();
        world.request_attach(*chain.last().unwrap(), entity);

        let local = Mat4::from_rotation_translation(rotation, position) * Mat4::from_scale(scale);
        expected.push(*expected.last().unwrap() * local);
        chain.push(entity);
    }

    pipeline.update(&mut world);

    for (depth, (&entity, &matrix)) in chain.iter().zip(&expected).enumerate() {
        assert_mat_eq(world_of(&world, entity), matrix);
        let group = world.get::<DepthGroup>(entity).map(|g| g.0);
        if depth == chain.len() - 1 {
            assert_eq!(group, None, "leaf must not carry a depth group");
        } else {
            assert_eq!(group, Some(depth as u32));
        }
    }
}

#[test]
fn parent_change_reaches_descendants() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let root = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let inner = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    let leaf = world.spawn(Position::from_xyz(0.0, 0.0, 1.0)).id();
    world.request_attach(root, inner);
    world.request_attach(inner, leaf);
    pipeline.update(&mut world);
    assert_eq!(
        world.get::<WorldMatrix>(leaf).unwrap().translation(),
        Vec3::new(1.0, 1.0, 1.0)
    );

    world.get_mut::<Position>(root).unwrap().0 = Vec3::new(5.0, 0.0, 0.0);
    pipeline.update(&mut world);

    assert_eq!(
        world.get::<WorldMatrix>(inner).unwrap().translation(),
        Vec3::new(5.0, 1.0, 0.0)
    );
    assert_eq!(
        world.get::<WorldMatrix>(leaf).unwrap().translation(),
        Vec3::new(5.0, 1.0, 1.0)
    );
}

#[test]
fn bare_child_follows_parent() {
    let mut world = World::new();
    let parent = world
        .spawn((Position::from_xyz(2.0, 0.0, 0.0), Scale::splat(3.0)))
        .id();
    let child = world.spawn_empty().id();
    world.request_attach(parent, child);

    TransformPipeline::new().update(&mut world);

    assert_eq!(world_of(&world, child), world_of(&world, parent));
    assert_eq!(
        world.get::<LocalToParent>(child),
        Some(&LocalToParent::IDENTITY)
    );
}

#[test]
fn wide_and_deep_forest_uses_parallel_paths() {
    init_logging();
    let mut world = World::new();
    let mut pipeline = TransformPipeline::with_config(PropagationConfig {
        parallel_threshold: 8,
        min_batch_size: 4,
        ..Default::default()
    });

    let mut roots = Vec::new();
    let mut leaves = Vec::new();
    for r in 0..8 {
        let root = world.spawn(Position::from_xyz(r as f32, 0.0, 0.0)).id();
        roots.push(root);
        for i in 0..32 {
            let inner = world.spawn(Position::from_xyz(0.0, i as f32, 0.0)).id();
            world.request_attach(root, inner);
            for j in 0..4 {
                let leaf = world.spawn(Position::from_xyz(0.0, 0.0, j as f32)).id();
                world.request_attach(inner, leaf);
                leaves.push((leaf, Vec3::new(r as f32, i as f32, j as f32)));
            }
        }
    }

    pipeline.update(&mut world);

    assert_eq!(world.resource::<HierarchyIndex>().len(), 8 * 32 * 5);
    for &(leaf, expected) in &leaves {
        let actual = world.get::<WorldMatrix>(leaf).unwrap().translation();
        assert!(actual.abs_diff_eq(expected, 1e-5), "{actual} != {expected}");
    }

    for &root in &roots {
        world.get_mut::<Position>(root).unwrap().0.x += 100.0;
    }
    pipeline.update(&mut world);

    for &(leaf, expected) in &leaves {
        let actual = world.get::<WorldMatrix>(leaf).unwrap().translation();
        let moved = expected + Vec3::new(100.0, 0.0, 0.0);
        assert!(actual.abs_diff_eq(moved, 1e-4), "{actual} != {moved}");
    }
}

// ---------------------------------------------------------------------------
// Hierarchy changes
// ---------------------------------------------------------------------------

#[test]
fn reattach_moves_child_and_updates_depth() {
    init_logging();
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    // a        r
    //          └─ b
    //             └─ d
    let a = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let r = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    let b = world.spawn(Position::from_xyz(0.0, 0.0, 1.0)).id();
    let d = world.spawn(Position::from_xyz(0.0, 0.0, 0.0)).id();
    world.request_attach(r, b);
    world.request_attach(b, d);

    // c has a child of its own so it keeps a depth group.
    let c = world.spawn(Position::from_xyz(0.0, 0.0, 10.0)).id();
    let grandchild = world.spawn(Position::from_xyz(0.0, 0.0, 100.0)).id();
    world.request_attach(a, c);
    world.request_attach(c, grandchild);
    pipeline.update(&mut world);

    assert_eq!(world.get::<DepthGroup>(c), Some(&DepthGroup(1)));
    assert_eq!(world.get::<DepthGroup>(b), Some(&DepthGroup(1)));

    world.request_attach(b, c);
    pipeline.update(&mut world);

    let index = world.resource::<HierarchyIndex>();
    assert!(!index.children(a).any(|e| e == c));
    assert!(index.children(b).any(|e| e == c));
    assert_eq!(index.parent_of(c), Some(b));

    let depth_b = world.get::<DepthGroup>(b).unwrap().0;
    assert_eq!(world.get::<DepthGroup>(c), Some(&DepthGroup(1 + depth_b)));
    assert!(world.get::<DepthGroup>(a).is_none());

    assert_eq!(
        world.get::<WorldMatrix>(grandchild).unwrap().translation(),
        Vec3::new(0.0, 1.0, 111.0)
    );
}

#[test]
fn parent_without_inputs_drives_children() {
    let mut world = World::new();
    let parent = world.spawn_empty().id();
    let child = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    world.request_attach(parent, child);

    TransformPipeline::new().update(&mut world);

    assert_eq!(world.get::<WorldMatrix>(parent), Some(&WorldMatrix::IDENTITY));
    assert_eq!(
        world.get::<WorldMatrix>(child).unwrap().translation(),
        Vec3::new(0.0, 1.0, 0.0)
    );
}

#[test]
fn detach_clears_empty_parent_group() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let a = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let c = world.spawn(Position::from_xyz(0.0, 2.0, 0.0)).id();
    world.request_attach(a, c);
    pipeline.update(&mut world);
    assert_eq!(world.get::<DepthGroup>(a), Some(&DepthGroup(0)));

    world.request_detach(c);
    pipeline.update(&mut world);

    assert!(world.get::<DepthGroup>(a).is_none());
    assert!(world.get::<ParentLink>(c).is_none());
    assert!(world.get::<LocalToParent>(c).is_none());
    assert!(world.get::<Attached>(c).is_none());
    assert!(world.resource::<HierarchyIndex>().is_empty());
}

#[test]
fn detached_entity_returns_to_own_transform() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let parent = world.spawn(Position::from_xyz(10.0, 0.0, 0.0)).id();
    let child = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    world.request_attach(parent, child);
    pipeline.update(&mut world);
    assert_eq!(
        world.get::<WorldMatrix>(child).unwrap().translation(),
        Vec3::new(10.0, 1.0, 0.0)
    );

    world.request_detach(child);
    pipeline.update(&mut world);

    assert_eq!(
        world.get::<WorldMatrix>(child).unwrap().translation(),
        Vec3::new(0.0, 1.0, 0.0)
    );
}

#[test]
fn detach_and_reattach_in_one_cycle() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let a = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let b = world.spawn(Position::from_xyz(2.0, 0.0, 0.0)).id();
    let child = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    world.request_attach(a, child);
    pipeline.update(&mut world);

    world.request_detach(child);
    world.request_attach(b, child);
    pipeline.update(&mut world);

    let index = world.resource::<HierarchyIndex>();
    assert_eq!(index.parent_of(child), Some(b));
    assert_eq!(index.child_count(a), 0);
    assert_eq!(world.get::<ParentLink>(child), Some(&ParentLink(b)));
    assert!(world.get::<Attached>(child).is_some());
    assert_eq!(
        world.get::<WorldMatrix>(child).unwrap().translation(),
        Vec3::new(2.0, 1.0, 0.0)
    );
}

#[test]
fn cyclic_attach_leaves_hierarchy_intact() {
    init_logging();
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let a = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let b = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    let c = world.spawn(Position::from_xyz(0.0, 0.0, 1.0)).id();
    world.request_attach(a, b);
    world.request_attach(b, c);
    pipeline.update(&mut world);

    world.request_attach(c, a);
    pipeline.update(&mut world);

    assert!(world.get::<ParentLink>(a).is_none());
    assert_eq!(
        world.get::<WorldMatrix>(c).unwrap().translation(),
        Vec3::new(1.0, 1.0, 1.0)
    );
    let mut requests = world.query::<&redlilium_transform::AttachRequest>();
    assert_eq!(requests.iter(&world).count(), 0);
}

#[test]
fn despawned_parent_leaves_child_untouched() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let parent = world.spawn(Position::from_xyz(4.0, 0.0, 0.0)).id();
    let child = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    world.request_attach(parent, child);
    pipeline.update(&mut world);
    let before = world_of(&world, child);

    world.despawn(parent);
    pipeline.update(&mut world);

    assert_eq!(world_of(&world, child), before);
}

// ---------------------------------------------------------------------------
// Freezing
// ---------------------------------------------------------------------------

#[test]
fn static_entity_freezes_after_two_cycles() {
    init_logging();
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let entity = world.spawn(Position::from_xyz(1.0, 2.0, 3.0)).id();
    pipeline.update(&mut world);

    world.entity_mut(entity).insert(Static);
    assert!(world.get::<PendingFrozen>(entity).is_none());

    pipeline.update(&mut world);
    assert!(world.get::<PendingFrozen>(entity).is_some());
    assert!(world.get::<Frozen>(entity).is_none());

    pipeline.update(&mut world);
    assert!(world.get::<PendingFrozen>(entity).is_none());
    assert!(world.get::<Frozen>(entity).is_some());

    let frozen = *world.get::<WorldMatrix>(entity).unwrap();
    assert_eq!(frozen.0, Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));

    for step in 0..3 {
        world.get_mut::<Position>(entity).unwrap().0 = Vec3::splat(step as f32 * 10.0);
        world.entity_mut(entity).insert(Scale::splat(5.0));
        pipeline.update(&mut world);

        let current = world.get::<WorldMatrix>(entity).unwrap();
        assert_eq!(bytemuck::bytes_of(current), bytemuck::bytes_of(&frozen));
    }
}

#[test]
fn static_entity_spawned_with_inputs_gets_one_update() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let entity = world.spawn((Position::from_xyz(0.0, 3.0, 0.0), Static)).id();
    pipeline.update(&mut world);
    assert!(world.get::<PendingFrozen>(entity).is_some());
    assert_eq!(
        world.get::<WorldMatrix>(entity).unwrap().translation(),
        Vec3::new(0.0, 3.0, 0.0)
    );

    pipeline.update(&mut world);
    assert!(world.get::<Frozen>(entity).is_some());
}

#[test]
fn children_of_frozen_parent_still_propagate() {
    let mut world = World::new();
    let mut pipeline = TransformPipeline::new();

    let parent = world
        .spawn((Position::from_xyz(3.0, 0.0, 0.0), Static))
        .id();
    let child = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();
    world.request_attach(parent, child);
    pipeline.update(&mut world);
    pipeline.update(&mut world);
    assert!(world.get::<Frozen>(parent).is_some());

    world.get_mut::<Position>(child).unwrap().0 = Vec3::new(0.0, 2.0, 0.0);
    pipeline.update(&mut world);

    assert_eq!(
        world.get::<WorldMatrix>(child).unwrap().translation(),
        Vec3::new(3.0, 2.0, 0.0)
    );
}

// ---------------------------------------------------------------------------
// Host schedules
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
struct Observed(Vec<Vec3>);

#[test]
fn host_systems_order_against_sets() {
    let mut world = World::new();
    world.init_resource::<HierarchyIndex>();
    world.init_resource::<PropagationConfig>();
    world.init_resource::<Observed>();
    bevy_tasks::ComputeTaskPool::get_or_init(bevy_tasks::TaskPool::default);

    let parent = world.spawn(Position::from_xyz(1.0, 0.0, 0.0)).id();
    let child = world.spawn(Position::from_xyz(0.0, 1.0, 0.0)).id();

    let mut schedule = Schedule::default();
    TransformPipeline::add_to_schedule(&mut schedule);
    schedule.add_systems((
        (move |mut commands: Commands| commands.request_attach(parent, child))
            .before(TransformSystems::Hierarchy),
        (move |matrices: Query<&WorldMatrix>, mut observed: ResMut<Observed>| {
            if let Ok(matrix) = matrices.get(child) {
                observed.0.push(matrix.translation());
            }
        })
        .after(TransformSystems::Propagate),
    ));
    schedule.run(&mut world);

    assert_eq!(
        world.resource::<Observed>().0,
        vec![Vec3::new(1.0, 1.0, 0.0)]
    );
}
