//! The active 3D world: room catalog, the one attached fragment, lighting,
//! selection, and the panel snapshot the UI reads. All mutation funnels
//! through here on the main thread; the only asynchrony is room loading,
//! fenced by load tickets so a stale completion can never clobber a newer
//! request.

use crate::asset::{LoadCompletion, LoadTicket, RoomLoader};
use crate::classify;
use crate::config::ViewerConfig;
use crate::devices::{DevicePanel, DeviceState};
use crate::events::{EventLog, ViewerEvent};
use crate::picking;
use crate::scene::{MaterialDef, NodeId, SceneFragment};
use crate::selection::SelectionManager;
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub file: &'static str,
}

pub const ROOM_CATALOG: &[RoomDescriptor] = &[
    RoomDescriptor { id: "gaming", name: "Gaming Room", file: "gaming_room.gltf" },
    RoomDescriptor { id: "bathroom", name: "Bathroom", file: "bathroom.gltf" },
    RoomDescriptor { id: "kitchen", name: "Kitchen", file: "kitchen.gltf" },
];

pub fn find_room(id: &str) -> Option<&'static RoomDescriptor> {
    ROOM_CATALOG.iter().find(|room| room.id == id)
}

/// Manual pivot corrections. The source assets come from different authors
/// with inconsistent origins; recentering alone leaves some rooms offset.
fn room_offset(id: &str) -> Vec3 {
    match id {
        "kitchen" => Vec3::new(1.5, 0.0, 0.5),
        "bathroom" => Vec3::new(8.0, 0.0, 1.0),
        _ => Vec3::ZERO,
    }
}

#[derive(Debug, Clone)]
pub struct Lighting {
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
    pub ambient: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            sun_direction: -Vec3::new(6.0, 10.0, 8.0).normalize(),
            sun_color: Vec3::splat(1.0),
            ambient: Vec3::splat(0.42),
        }
    }
}

/// Per-mesh draw data derived fresh each frame from the scene graph.
#[derive(Debug, Clone, Copy)]
pub struct MeshInstance {
    pub node: NodeId,
    pub model: Mat4,
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
}

struct PendingLoad {
    ticket: LoadTicket,
    room_id: String,
}

pub struct SceneRegistry {
    fragment: Option<SceneFragment>,
    current_room: Option<String>,
    pending: Option<PendingLoad>,
    next_ticket: u64,
    selection: SelectionManager,
    panel: DevicePanel,
    lighting: Lighting,
    room_scale: f32,
    revision: u64,
}

impl SceneRegistry {
    pub fn new(viewer: &ViewerConfig) -> Self {
        Self {
            fragment: None,
            current_room: None,
            pending: None,
            next_ticket: 1,
            selection: SelectionManager::new(viewer.highlight_emissive),
            panel: DevicePanel::idle(),
            lighting: Lighting::default(),
            room_scale: viewer.room_scale,
            revision: 0,
        }
    }

    pub fn panel(&self) -> &DevicePanel {
        &self.panel
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn fragment(&self) -> Option<&SceneFragment> {
        self.fragment.as_ref()
    }

    pub fn current_room_id(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    pub fn load_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selection.selected()
    }

    /// Bumped whenever the attached fragment's geometry set changes, so the
    /// renderer knows when to rebuild GPU buffers.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Requests a room switch. Switching to the room that is already active
    /// (or already being loaded) is a no-op. Otherwise the current fragment
    /// is detached immediately, the selection cleared, and a load request
    /// with a fresh ticket issued; the room only becomes active when that
    /// ticket's completion arrives.
    pub fn switch_room(&mut self, room: &RoomDescriptor, loader: &RoomLoader, events: &mut EventLog) {
        let requested =
            self.pending.as_ref().map(|p| p.room_id.as_str()).or(self.current_room.as_deref());
        if requested == Some(room.id) {
            return;
        }
        // Selection must die before the nodes it points into do.
        self.selection.reset();
        if self.fragment.take().is_some() {
            self.revision += 1;
        }
        self.current_room = None;
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(PendingLoad { ticket, room_id: room.id.to_string() });
        self.panel = DevicePanel::room_loading(room.name);
        events.push(ViewerEvent::RoomLoadStarted { room: room.name.to_string() });
        loader.request(ticket, room.id, room.name, room.file);
    }

    /// Drains finished loads into the registry.
    pub fn pump(&mut self, loader: &RoomLoader, events: &mut EventLog) {
        for completion in loader.drain() {
            self.complete_load(completion, events);
        }
    }

    /// Applies one load completion. Anything but the newest ticket is
    /// discarded outright, which is what keeps an overtaken `switch_room`
    /// from resurrecting its room later.
    pub fn complete_load(&mut self, completion: LoadCompletion, events: &mut EventLog) {
        let is_current = self.pending.as_ref().is_some_and(|p| p.ticket == completion.ticket);
        if !is_current {
            events.push(ViewerEvent::StaleLoadDiscarded { room: completion.room_name });
            return;
        }
        self.pending = None;
        match completion.result {
            Ok(mut fragment) => {
                normalize_fragment(&mut fragment, &completion.room_id, self.room_scale);
                classify::classify_fragment(&mut fragment);
                let devices = classify::device_count(&fragment);
                self.panel = DevicePanel::room_active(&completion.room_name);
                self.current_room = Some(completion.room_id);
                self.fragment = Some(fragment);
                self.revision += 1;
                events.push(ViewerEvent::RoomReady { room: completion.room_name, devices });
            }
            Err(err) => {
                self.panel = DevicePanel::room_failed(&completion.room_name);
                events.push(ViewerEvent::RoomLoadFailed {
                    room: completion.room_name,
                    error: format!("{err:#}"),
                });
            }
        }
    }

    /// Resolves a pointer ray against the active fragment. A hit selects
    /// the nearest device root (possibly the room pseudo-device); a miss or
    /// an untagged hit clears the selection rather than leaving stale state.
    pub fn click(&mut self, origin: Vec3, direction: Vec3, events: &mut EventLog) {
        let Some(fragment) = self.fragment.as_ref() else {
            return;
        };
        let device_root = picking::intersect_fragment(fragment, origin, direction)
            .and_then(|hit| picking::resolve_device_root(fragment, hit.node));
        match device_root {
            Some(root) => self.select_node(root, events),
            None => self.clear_selection(events),
        }
    }

    /// Selects a device root directly. A node without a `DeviceTag` cannot
    /// back a panel snapshot, so selecting one counts as a miss and clears
    /// instead.
    pub fn select_node(&mut self, node: NodeId, events: &mut EventLog) {
        let untagged =
            self.fragment.as_ref().is_some_and(|fragment| fragment.node(node).tag.is_none());
        if untagged {
            self.clear_selection(events);
            return;
        }
        let Some(fragment) = self.fragment.as_mut() else {
            return;
        };
        if self.selection.select(fragment, node) {
            let node_ref = fragment.node(node);
            if let Some(tag) = node_ref.tag.as_ref() {
                events.push(ViewerEvent::DeviceSelected {
                    name: node_ref.name.clone(),
                    kind: tag.kind(),
                });
            }
        }
        self.refresh_panel();
    }

    pub fn clear_selection(&mut self, events: &mut EventLog) {
        let Some(fragment) = self.fragment.as_mut() else {
            return;
        };
        if self.selection.deselect(fragment) {
            self.panel = DevicePanel::idle();
            events.push(ViewerEvent::SelectionCleared);
        }
    }

    /// Toggles the selected device on/off. No-op without a toggleable
    /// selection.
    pub fn toggle_selected(&mut self, events: &mut EventLog) {
        let Some(fragment) = self.fragment.as_mut() else {
            return;
        };
        let toggled = self.selection.with_selected_state(fragment, |state| state.toggle());
        if let Some(on) = toggled {
            if let Some(id) = self.selection.selected() {
                events.push(ViewerEvent::DeviceToggled {
                    name: fragment.node(id).name.clone(),
                    on,
                });
            }
            self.refresh_panel();
        }
    }

    /// Temperature delta for a selected fridge, clamped to its bounds.
    pub fn adjust_fridge_temperature(&mut self, delta: f32) {
        self.adjust_temperature(delta, |state| matches!(state, DeviceState::Fridge { .. }));
    }

    /// Temperature delta for a selected stove, clamped to its bounds.
    pub fn adjust_stove_temperature(&mut self, delta: f32) {
        self.adjust_temperature(delta, |state| matches!(state, DeviceState::Stove { .. }));
    }

    fn adjust_temperature(&mut self, delta: f32, compatible: impl Fn(&DeviceState) -> bool) {
        let Some(fragment) = self.fragment.as_mut() else {
            return;
        };
        let adjusted = self.selection.with_selected_state(fragment, |state| {
            if compatible(state) {
                state.adjust_temperature(delta).then_some(())
            } else {
                None
            }
        });
        if adjusted.is_some() {
            self.refresh_panel();
        }
    }

    /// Draw list for the current frame: world matrix plus resolved colors
    /// per mesh. A lamp that is switched off dims every mesh under it.
    pub fn mesh_instances(&self) -> Vec<MeshInstance> {
        let Some(fragment) = self.fragment.as_ref() else {
            return Vec::new();
        };
        let transforms = fragment.world_transforms();
        let fallback = MaterialDef::solid("fallback", [0.6, 0.6, 0.6, 1.0]);
        fragment
            .mesh_nodes()
            .map(|id| {
                let node = fragment.node(id);
                let material = node.material.as_ref().unwrap_or(&fallback);
                let mut base_color = material.base_color;
                if lamp_is_off(fragment, id) {
                    base_color[0] *= 0.25;
                    base_color[1] *= 0.25;
                    base_color[2] *= 0.25;
                }
                MeshInstance {
                    node: id,
                    model: transforms[id.index()],
                    base_color,
                    emissive: material.emissive,
                }
            })
            .collect()
    }

    fn refresh_panel(&mut self) {
        let Some(fragment) = self.fragment.as_ref() else {
            return;
        };
        if let Some(id) = self.selection.selected() {
            let node = fragment.node(id);
            if let Some(tag) = node.tag.as_ref() {
                self.panel = DevicePanel::for_device(&node.name, &tag.state);
            }
        }
    }
}

fn lamp_is_off(fragment: &SceneFragment, mesh: NodeId) -> bool {
    picking::resolve_device_root(fragment, mesh)
        .and_then(|root| fragment.node(root).tag.as_ref())
        .is_some_and(|tag| matches!(tag.state, DeviceState::Lamp { on: false }))
}

/// Fits a freshly loaded fragment into the world: apply the uniform room
/// scale, recenter the scaled bounds on the per-room pivot, then drop the
/// result so its lowest point sits on the ground plane.
pub fn normalize_fragment(fragment: &mut SceneFragment, room_id: &str, scale: f32) {
    let root = fragment.root();
    fragment.node_mut(root).scale *= scale;
    let Some(bounds) = fragment.world_bounds() else {
        return;
    };
    let center = bounds.center();
    {
        let node = fragment.node_mut(root);
        node.translation -= center;
        node.translation += room_offset(room_id);
    }
    if let Some(after) = fragment.world_bounds() {
        fragment.node_mut(root).translation.y -= after.min.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Geometry, SceneNode};

    fn boxy_fragment() -> SceneFragment {
        let mut fragment = SceneFragment::new("room");
        let root = fragment.root();
        fragment.add_child(
            root,
            SceneNode::named("box")
                .with_transform(Vec3::new(10.0, 3.0, -4.0), glam::Quat::IDENTITY, Vec3::ONE)
                .with_geometry(
                    Geometry::cuboid(Vec3::splat(1.0)),
                    MaterialDef::solid("m", [1.0; 4]),
                ),
        );
        fragment
    }

    #[test]
    fn normalize_grounds_fragment_at_origin() {
        let mut fragment = boxy_fragment();
        normalize_fragment(&mut fragment, "gaming", 1.5);
        let bounds = fragment.world_bounds().expect("bounds");
        assert!(bounds.min.y.abs() < 1e-4, "lowest point should rest on the ground");
        let center = bounds.center();
        assert!(center.x.abs() < 1e-4 && center.z.abs() < 1e-4, "centered on origin: {center}");
    }

    #[test]
    fn normalize_applies_room_offset() {
        let mut fragment = boxy_fragment();
        normalize_fragment(&mut fragment, "kitchen", 1.5);
        let center = fragment.world_bounds().expect("bounds").center();
        assert!((center.x - 1.5).abs() < 1e-4);
        assert!((center.z - 0.5).abs() < 1e-4);
    }

    #[test]
    fn catalog_lookup_by_id() {
        assert_eq!(find_room("kitchen").map(|r| r.file), Some("kitchen.gltf"));
        assert!(find_room("garage").is_none());
    }
}
