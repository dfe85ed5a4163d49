use glam::Vec3;
use hearthview::config::ViewerConfig;
use hearthview::devices::{DeviceKind, PanelReading};
use hearthview::events::EventLog;
use hearthview::registry::{find_room, SceneRegistry};
use hearthview::asset::RoomLoader;
use hearthview::scene::NodeId;
use std::time::{Duration, Instant};

fn registry_with_kitchen() -> (SceneRegistry, EventLog) {
    let viewer = ViewerConfig::default();
    let mut registry = SceneRegistry::new(&viewer);
    let loader = RoomLoader::new(&viewer.models_root);
    let mut events = EventLog::default();
    registry.switch_room(find_room("kitchen").expect("kitchen"), &loader, &mut events);
    let deadline = Instant::now() + Duration::from_secs(10);
    while registry.load_in_flight() {
        assert!(Instant::now() < deadline, "kitchen load timed out");
        registry.pump(&loader, &mut events);
        std::thread::sleep(Duration::from_millis(5));
    }
    (registry, events)
}

fn node_by_name(registry: &SceneRegistry, name: &str) -> NodeId {
    let fragment = registry.fragment().expect("fragment");
    fragment
        .node_ids()
        .find(|id| fragment.node(*id).name == name)
        .unwrap_or_else(|| panic!("node {name} not found"))
}

#[test]
fn selecting_a_fridge_highlights_and_fills_the_panel() {
    let (mut registry, mut events) = registry_with_kitchen();
    let fridge = node_by_name(&registry, "Kitchen_Fridge");
    registry.select_node(fridge, &mut events);

    let panel = registry.panel();
    assert_eq!(panel.name, "Kitchen_Fridge");
    assert_eq!(panel.kind, DeviceKind::Fridge);
    assert_eq!(panel.status, "ON");
    match panel.reading {
        Some(PanelReading::Temperature { value, min, max }) => {
            assert_eq!(value, 4.0);
            assert_eq!((min, max), (-18.0, 8.0));
        }
        other => panic!("expected a temperature reading, got {other:?}"),
    }

    // Every mesh under the fridge root renders with the highlight tint.
    let fragment = registry.fragment().expect("fragment");
    let highlight = ViewerConfig::default().highlight_emissive;
    for id in fragment.subtree(fridge) {
        if fragment.node(id).is_mesh() {
            let material = fragment.node(id).material.as_ref().expect("material");
            assert_eq!(material.emissive, highlight);
        }
    }
}

#[test]
fn toggle_and_temperature_act_on_the_selection() {
    let (mut registry, mut events) = registry_with_kitchen();
    let fridge = node_by_name(&registry, "Kitchen_Fridge");
    registry.select_node(fridge, &mut events);

    registry.toggle_selected(&mut events);
    assert_eq!(registry.panel().status, "OFF");

    registry.adjust_fridge_temperature(100.0);
    match registry.panel().reading {
        Some(PanelReading::Temperature { value, .. }) => assert_eq!(value, 8.0),
        other => panic!("expected temperature, got {other:?}"),
    }

    // The stove adjuster must not touch a selected fridge.
    registry.adjust_stove_temperature(-100.0);
    match registry.panel().reading {
        Some(PanelReading::Temperature { value, .. }) => assert_eq!(value, 8.0),
        other => panic!("expected temperature, got {other:?}"),
    }
}

#[test]
fn clearing_selection_restores_materials_and_panel() {
    let (mut registry, mut events) = registry_with_kitchen();
    let lamp = node_by_name(&registry, "Ceiling_Lamp");
    let lamp_mesh = {
        let fragment = registry.fragment().expect("fragment");
        fragment
            .subtree(lamp)
            .into_iter()
            .find(|id| fragment.node(*id).is_mesh())
            .expect("lamp mesh")
    };
    let original = registry
        .fragment()
        .expect("fragment")
        .node(lamp_mesh)
        .material
        .clone()
        .expect("material");

    registry.select_node(lamp, &mut events);
    registry.clear_selection(&mut events);

    let fragment = registry.fragment().expect("fragment");
    assert_eq!(fragment.node(lamp_mesh).material.as_ref(), Some(&original));
    assert_eq!(registry.panel().name, "No selection");
    assert_eq!(registry.panel().status, "Click an object");
    assert!(registry.selected().is_none());
}

#[test]
fn selecting_an_untagged_node_counts_as_a_miss() {
    let (mut registry, mut events) = registry_with_kitchen();
    let fridge = node_by_name(&registry, "Kitchen_Fridge");
    registry.select_node(fridge, &mut events);
    assert_eq!(registry.selected(), Some(fridge));

    // The mesh child carries no tag of its own; selecting it must not
    // leave a highlight with a stale fridge panel behind.
    let mesh = node_by_name(&registry, "Kitchen_Fridge_Mesh");
    registry.select_node(mesh, &mut events);
    assert!(registry.selected().is_none());
    assert_eq!(registry.panel().name, "No selection");

    let fragment = registry.fragment().expect("fragment");
    for id in fragment.subtree(fridge) {
        if fragment.node(id).is_mesh() {
            let material = fragment.node(id).material.as_ref().expect("material");
            assert_eq!(material.emissive, [0.0; 3], "highlight fully reverted");
        }
    }
}

#[test]
fn click_through_empty_space_clears_selection() {
    let (mut registry, mut events) = registry_with_kitchen();
    let fridge = node_by_name(&registry, "Kitchen_Fridge");
    registry.select_node(fridge, &mut events);
    assert!(registry.selected().is_some());

    // Straight up from far above the room: nothing to hit.
    registry.click(Vec3::new(0.0, 100.0, 0.0), Vec3::Y, &mut events);
    assert!(registry.selected().is_none());
    assert_eq!(registry.panel().name, "No selection");
}

#[test]
fn clicking_a_device_mesh_selects_its_root() {
    let (mut registry, mut events) = registry_with_kitchen();
    let fridge = node_by_name(&registry, "Kitchen_Fridge");
    let fridge_center = {
        let fragment = registry.fragment().expect("fragment");
        let transforms = fragment.world_transforms();
        transforms[fridge.index()].transform_point3(Vec3::ZERO)
    };

    // Aim from well in front of the fridge straight at its center.
    let origin = fridge_center + Vec3::new(0.0, 0.0, 30.0);
    registry.click(origin, (fridge_center - origin).normalize(), &mut events);
    assert_eq!(registry.selected(), Some(fridge));
    assert_eq!(registry.panel().kind, DeviceKind::Fridge);
}

#[test]
fn switched_off_lamp_dims_its_meshes() {
    let (mut registry, mut events) = registry_with_kitchen();
    let lamp = node_by_name(&registry, "Ceiling_Lamp");
    let lamp_mesh = {
        let fragment = registry.fragment().expect("fragment");
        fragment
            .subtree(lamp)
            .into_iter()
            .find(|id| fragment.node(*id).is_mesh())
            .expect("lamp mesh")
    };
    let lit = registry
        .mesh_instances()
        .into_iter()
        .find(|i| i.node == lamp_mesh)
        .expect("lamp instance")
        .base_color;

    registry.select_node(lamp, &mut events);
    registry.toggle_selected(&mut events);
    let dimmed = registry
        .mesh_instances()
        .into_iter()
        .find(|i| i.node == lamp_mesh)
        .expect("lamp instance")
        .base_color;
    for channel in 0..3 {
        assert!(dimmed[channel] < lit[channel], "channel {channel} should dim");
    }
}
