//! Name-heuristic device classification. Room assets are authored by hand
//! in external tools, so the only signal for "this sub-tree is a fridge" is
//! the free-text node name. Rules are ordered; first match wins.

use crate::devices::{DeviceKind, DeviceState, DeviceTag};
use crate::scene::{NodeId, SceneFragment};

pub struct ClassifyRule {
    pub needles: &'static [&'static str],
    pub kind: DeviceKind,
}

/// Ordered rule table. Matching is case-insensitive substring search on the
/// mesh's immediate parent name.
pub const RULES: &[ClassifyRule] = &[
    ClassifyRule { needles: &["lamp"], kind: DeviceKind::Lamp },
    ClassifyRule { needles: &["fridge", "freezer"], kind: DeviceKind::Fridge },
    ClassifyRule { needles: &["coffee", "kettle"], kind: DeviceKind::Kettle },
    ClassifyRule { needles: &["stove", "cooktop", "oven"], kind: DeviceKind::Stove },
    ClassifyRule { needles: &["computer", "pc", "monitor"], kind: DeviceKind::Computer },
];

/// Classifies a node name against the rule table. Returns the kind-default
/// device state for the first matching rule, `None` when nothing matches.
pub fn classify_name(name: &str) -> Option<DeviceState> {
    let lowered = name.to_lowercase();
    for rule in RULES {
        if rule.needles.iter().any(|needle| lowered.contains(needle)) {
            return DeviceState::default_for(rule.kind);
        }
    }
    None
}

/// Tags device roots in a freshly loaded fragment.
///
/// For every mesh node, the immediate parent's name is classified and, on a
/// match, the parent becomes the device root. An already-tagged parent is
/// never retagged: the first qualifying mesh wins. Finally the fragment
/// root is tagged as the room pseudo-device so a click on bare room
/// geometry can still resolve to something.
pub fn classify_fragment(fragment: &mut SceneFragment) {
    let mesh_nodes: Vec<NodeId> = fragment.mesh_nodes().collect();
    for mesh in mesh_nodes {
        let Some(parent) = fragment.parent(mesh) else {
            continue;
        };
        if fragment.node(parent).tag.is_some() {
            continue;
        }
        if let Some(state) = classify_name(&fragment.node(parent).name) {
            fragment.node_mut(parent).tag = Some(DeviceTag::new(state));
        }
    }
    let root = fragment.root();
    if fragment.node(root).tag.is_none() {
        fragment.node_mut(root).tag = Some(DeviceTag::new(DeviceState::Room));
    }
}

/// Number of tagged device roots, the room pseudo-device excluded.
pub fn device_count(fragment: &SceneFragment) -> usize {
    fragment
        .node_ids()
        .filter(|id| {
            fragment.node(*id).tag.as_ref().is_some_and(|tag| tag.kind() != DeviceKind::Room)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Geometry, MaterialDef, SceneFragment, SceneNode};
    use glam::Vec3;

    #[test]
    fn tagged_parent_is_never_retagged() {
        let mut fragment = SceneFragment::new("room");
        let root = fragment.root();
        let lamp = fragment.add_child(root, SceneNode::named("Desk_Lamp"));
        // Two qualifying meshes under one parent: the second must not
        // re-derive the tag the first one placed.
        for index in 0..2 {
            fragment.add_child(
                lamp,
                SceneNode::named(format!("Desk_Lamp_Mesh_{index}")).with_geometry(
                    Geometry::cuboid(Vec3::splat(0.5)),
                    MaterialDef::solid("m", [1.0; 4]),
                ),
            );
        }
        classify_fragment(&mut fragment);
        assert_eq!(device_count(&fragment), 1);
        assert_eq!(fragment.node(lamp).tag.as_ref().map(|t| t.kind()), Some(DeviceKind::Lamp));

        // Mutate the device, then classify again: an existing tag survives
        // with its state intact instead of resetting to the kind default.
        fragment.node_mut(lamp).tag.as_mut().expect("tag").state.toggle();
        classify_fragment(&mut fragment);
        assert_eq!(
            fragment.node(lamp).tag.as_ref().map(|t| t.state.clone()),
            Some(DeviceState::Lamp { on: false })
        );
        assert_eq!(device_count(&fragment), 1);
        assert_eq!(
            fragment.node(root).tag.as_ref().map(|t| t.kind()),
            Some(DeviceKind::Room),
            "room root tag also survives reclassification"
        );
    }

    #[test]
    fn coffee_maker_classifies_as_kettle() {
        let state = classify_name("Kitchen_Coffee_Maker_01").expect("kettle rule");
        assert_eq!(state.kind(), DeviceKind::Kettle);
        assert_eq!(state.is_on(), Some(false));
        assert!(matches!(state, DeviceState::Kettle { remaining_secs, .. } if remaining_secs > 0));
    }

    #[test]
    fn rule_order_is_first_match() {
        // "lamp" appears before "oven" in the table; a pathological name
        // containing both resolves to the earlier rule.
        let state = classify_name("oven_lamp").expect("match");
        assert_eq!(state.kind(), DeviceKind::Lamp);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify_name("FREEZER_Big").map(|s| s.kind()), Some(DeviceKind::Fridge));
        assert_eq!(classify_name("Gaming_PC_Tower").map(|s| s.kind()), Some(DeviceKind::Computer));
    }

    #[test]
    fn unmatched_names_are_not_devices() {
        assert!(classify_name("Sofa_01").is_none());
        assert!(classify_name("wall").is_none());
    }
}
