use hearthview::asset::import_room;
use hearthview::classify;
use hearthview::devices::DeviceKind;
use hearthview::scene::{NodeId, SceneFragment};

fn node_by_name(fragment: &SceneFragment, name: &str) -> NodeId {
    fragment
        .node_ids()
        .find(|id| fragment.node(*id).name == name)
        .unwrap_or_else(|| panic!("node {name} not found"))
}

#[test]
fn kitchen_fixture_imports_with_hierarchy_intact() {
    let fragment = import_room("assets/models/kitchen.gltf", "Kitchen").expect("import kitchen");
    assert_eq!(fragment.name(), "Kitchen");
    assert_eq!(fragment.mesh_nodes().count(), 5);

    // Each authored device keeps its parent node with the mesh below it.
    let fridge = node_by_name(&fragment, "Kitchen_Fridge");
    let children = fragment.children(fridge);
    assert_eq!(children.len(), 1);
    assert!(fragment.node(children[0]).is_mesh());
    assert!(!fragment.node(fridge).is_mesh());
}

#[test]
fn kitchen_fixture_classifies_four_devices() {
    let mut fragment = import_room("assets/models/kitchen.gltf", "Kitchen").expect("import kitchen");
    classify::classify_fragment(&mut fragment);
    assert_eq!(classify::device_count(&fragment), 4);

    let kind_of = |name: &str| {
        fragment.node(node_by_name(&fragment, name)).tag.as_ref().map(|t| t.kind())
    };
    assert_eq!(kind_of("Kitchen_Fridge"), Some(DeviceKind::Fridge));
    assert_eq!(kind_of("Kitchen_Coffee_Maker"), Some(DeviceKind::Kettle));
    assert_eq!(kind_of("Kitchen_Stove"), Some(DeviceKind::Stove));
    assert_eq!(kind_of("Ceiling_Lamp"), Some(DeviceKind::Lamp));
    assert_eq!(kind_of("Floor"), None);
}

#[test]
fn gaming_fixture_tags_room_root() {
    let mut fragment =
        import_room("assets/models/gaming_room.gltf", "Gaming Room").expect("import gaming room");
    classify::classify_fragment(&mut fragment);
    let root_tag = fragment.node(fragment.root()).tag.as_ref().map(|t| t.kind());
    assert_eq!(root_tag, Some(DeviceKind::Room));
    assert_eq!(classify::device_count(&fragment), 2);
}

#[test]
fn imported_materials_carry_base_color() {
    let fragment = import_room("assets/models/bathroom.gltf", "Bathroom").expect("import bathroom");
    let lamp_mesh = node_by_name(&fragment, "Bathroom_Lamp_Mesh");
    let material = fragment.node(lamp_mesh).material.as_ref().expect("material");
    assert!(material.base_color[0] > 0.9, "warm lamp shade: {:?}", material.base_color);
    assert_eq!(material.emissive, [0.0; 3]);
}

#[test]
fn missing_file_is_an_error() {
    let err = import_room("assets/models/garage.gltf", "Garage").unwrap_err();
    assert!(format!("{err:#}").contains("garage.gltf"));
}
