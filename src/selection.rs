//! Single-slot device selection with reversible highlight.
//!
//! Highlighting moves each affected mesh's material into a side table and
//! installs a tinted copy in its place. The map from node id to stashed
//! material is the invariant: a mesh can hold at most one override because
//! the table can hold at most one entry per id, and restoring puts the
//! exact original value back.

use crate::devices::DeviceState;
use crate::scene::{MaterialDef, NodeId, SceneFragment};
use std::collections::HashMap;

pub struct SelectionManager {
    selected: Option<NodeId>,
    stashed: HashMap<NodeId, MaterialDef>,
    highlight_emissive: [f32; 3],
}

impl SelectionManager {
    pub fn new(highlight_emissive: [f32; 3]) -> Self {
        Self { selected: None, stashed: HashMap::new(), highlight_emissive }
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn override_count(&self) -> usize {
        self.stashed.len()
    }

    /// Selects a device root. Re-selecting the current root is a no-op and
    /// in particular does not re-clone materials. Returns whether the
    /// selection changed.
    pub fn select(&mut self, fragment: &mut SceneFragment, node: NodeId) -> bool {
        if self.selected == Some(node) {
            return false;
        }
        // Clear must fully precede apply so a mesh shared between the old
        // and new root never ends up doubly wrapped.
        self.clear_highlight(fragment);
        for id in fragment.subtree(node) {
            let mesh = fragment.node_mut(id);
            if !mesh.is_mesh() {
                continue;
            }
            if let Some(original) = mesh.material.take() {
                mesh.material = Some(original.with_emissive(self.highlight_emissive));
                self.stashed.insert(id, original);
            }
        }
        self.selected = Some(node);
        true
    }

    /// Clears the selection, restoring all original materials. Returns
    /// whether there was a selection to clear.
    pub fn deselect(&mut self, fragment: &mut SceneFragment) -> bool {
        let had = self.selected.is_some();
        self.clear_highlight(fragment);
        self.selected = None;
        had
    }

    /// Drops the selection without touching a fragment. For use when the
    /// fragment itself is being discarded, where restoring materials would
    /// be wasted work on soon-to-be-freed nodes.
    pub fn reset(&mut self) {
        self.selected = None;
        self.stashed.clear();
    }

    /// State of the selected device, if any.
    pub fn selected_state<'a>(&self, fragment: &'a SceneFragment) -> Option<&'a DeviceState> {
        let id = self.selected?;
        fragment.node(id).tag.as_ref().map(|tag| &tag.state)
    }

    /// Mutates the selected device's state through `mutate`; returns its
    /// result, or `None` when nothing compatible is selected. Keeps device
    /// actions fail-safe: a stray button press with no selection does
    /// nothing rather than erroring inside the frame loop.
    pub fn with_selected_state<T>(
        &mut self,
        fragment: &mut SceneFragment,
        mutate: impl FnOnce(&mut DeviceState) -> Option<T>,
    ) -> Option<T> {
        let id = self.selected?;
        let tag = fragment.node_mut(id).tag.as_mut()?;
        mutate(&mut tag.state)
    }

    fn clear_highlight(&mut self, fragment: &mut SceneFragment) {
        for (id, original) in self.stashed.drain() {
            fragment.node_mut(id).material = Some(original);
        }
    }
}
