use glam::{Quat, Vec3};
use hearthview::classify;
use hearthview::devices::DeviceKind;
use hearthview::picking::{intersect_fragment, resolve_device_root};
use hearthview::scene::{Geometry, MaterialDef, SceneFragment, SceneNode};

fn grey() -> MaterialDef {
    MaterialDef::solid("grey", [0.5, 0.5, 0.5, 1.0])
}

/// Room with a floor slab and two named devices at different depths along -Z.
fn test_room() -> SceneFragment {
    let mut fragment = SceneFragment::new("test_room");
    let root = fragment.root();

    let floor = fragment.add_child(root, SceneNode::named("Floor"));
    fragment.add_child(
        floor,
        SceneNode::named("Floor_Mesh")
            .with_transform(Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, Vec3::new(10.0, 0.2, 10.0))
            .with_geometry(Geometry::cuboid(Vec3::splat(0.5)), grey()),
    );

    let lamp = fragment.add_child(
        root,
        SceneNode::named("Desk_Lamp").with_transform(
            Vec3::new(0.0, 1.0, -2.0),
            Quat::IDENTITY,
            Vec3::ONE,
        ),
    );
    fragment.add_child(
        lamp,
        SceneNode::named("Desk_Lamp_Mesh")
            .with_geometry(Geometry::cuboid(Vec3::splat(0.5)), grey()),
    );

    let fridge = fragment.add_child(
        root,
        SceneNode::named("Big_Fridge").with_transform(
            Vec3::new(0.0, 1.0, -6.0),
            Quat::IDENTITY,
            Vec3::ONE,
        ),
    );
    fragment.add_child(
        fridge,
        SceneNode::named("Big_Fridge_Mesh")
            .with_geometry(Geometry::cuboid(Vec3::splat(0.5)), grey()),
    );

    classify::classify_fragment(&mut fragment);
    fragment
}

#[test]
fn nearest_mesh_wins_when_two_line_up() {
    let fragment = test_room();
    // Lamp at z=-2 and fridge at z=-6 both sit on this ray; the lamp is
    // nearer to the origin.
    let hit = intersect_fragment(&fragment, Vec3::new(0.0, 1.0, 2.0), Vec3::NEG_Z)
        .expect("ray should hit something");
    assert_eq!(fragment.node(hit.node).name, "Desk_Lamp_Mesh");
    assert!((hit.distance - 3.5).abs() < 1e-3, "front face of the lamp cube: {}", hit.distance);
}

#[test]
fn hit_resolves_to_tagged_ancestor() {
    let fragment = test_room();
    let hit = intersect_fragment(&fragment, Vec3::new(0.0, 1.0, 2.0), Vec3::NEG_Z).expect("hit");
    let root = resolve_device_root(&fragment, hit.node).expect("device root");
    assert_eq!(fragment.node(root).name, "Desk_Lamp");
    assert_eq!(fragment.node(root).tag.as_ref().map(|t| t.kind()), Some(DeviceKind::Lamp));
}

#[test]
fn untagged_hit_resolves_to_room_pseudo_device() {
    let fragment = test_room();
    // Straight down onto the floor, away from both devices.
    let hit =
        intersect_fragment(&fragment, Vec3::new(4.0, 5.0, 4.0), Vec3::NEG_Y).expect("floor hit");
    assert_eq!(fragment.node(hit.node).name, "Floor_Mesh");
    let root = resolve_device_root(&fragment, hit.node).expect("room root");
    assert_eq!(root, fragment.root());
    assert_eq!(fragment.node(root).tag.as_ref().map(|t| t.kind()), Some(DeviceKind::Room));
}

#[test]
fn ray_past_everything_misses() {
    let fragment = test_room();
    let miss = intersect_fragment(&fragment, Vec3::new(0.0, 50.0, 0.0), Vec3::Y);
    assert!(miss.is_none());
}

#[test]
fn scaled_mesh_distance_is_world_space() {
    let mut fragment = SceneFragment::new("scaled");
    let root = fragment.root();
    fragment.node_mut(root).scale = Vec3::splat(4.0);
    fragment.add_child(
        root,
        SceneNode::named("box").with_geometry(Geometry::cuboid(Vec3::splat(0.5)), grey()),
    );
    // The cube's world half-extent is 2, so a ray from z=10 hits at t=8.
    let hit = intersect_fragment(&fragment, Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z).expect("hit");
    assert!((hit.distance - 8.0).abs() < 1e-3, "world distance: {}", hit.distance);
}
