//! Arena-backed scene graph. A fragment is one loaded room: a tree of
//! transformable nodes where leaf nodes may carry triangle geometry and a
//! material, and any node may carry a `DeviceTag`.

use crate::devices::DeviceTag;
use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDef {
    pub name: String,
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
}

impl MaterialDef {
    pub fn solid(name: &str, base_color: [f32; 4]) -> Self {
        Self { name: name.to_string(), base_color, emissive: [0.0; 3] }
    }

    /// Copy of this material with the selection tint applied.
    pub fn with_emissive(&self, emissive: [f32; 3]) -> Self {
        Self { name: self.name.clone(), base_color: self.base_color, emissive }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        any.then_some(Self { min, max })
    }

    pub fn union(self, other: Self) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// World-space box enclosing this box under an affine transform.
    pub fn transformed(&self, matrix: Mat4) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        Self::from_points(corners.iter().map(|c| matrix.transform_point3(*c)))
            .unwrap_or(*self)
    }
}

#[derive(Debug, Clone)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(positions.iter().copied())
            .unwrap_or(Aabb { min: Vec3::ZERO, max: Vec3::ZERO });
        Self { positions, normals, indices, bounds }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned box centered on the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (Vec3::Z, [
                Vec3::new(-h.x, -h.y, h.z),
                Vec3::new(h.x, -h.y, h.z),
                Vec3::new(h.x, h.y, h.z),
                Vec3::new(-h.x, h.y, h.z),
            ]),
            (Vec3::NEG_Z, [
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(-h.x, h.y, -h.z),
                Vec3::new(h.x, h.y, -h.z),
            ]),
            (Vec3::X, [
                Vec3::new(h.x, -h.y, h.z),
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(h.x, h.y, -h.z),
                Vec3::new(h.x, h.y, h.z),
            ]),
            (Vec3::NEG_X, [
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(-h.x, -h.y, h.z),
                Vec3::new(-h.x, h.y, h.z),
                Vec3::new(-h.x, h.y, -h.z),
            ]),
            (Vec3::Y, [
                Vec3::new(-h.x, h.y, h.z),
                Vec3::new(h.x, h.y, h.z),
                Vec3::new(h.x, h.y, -h.z),
                Vec3::new(-h.x, h.y, -h.z),
            ]),
            (Vec3::NEG_Y, [
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(h.x, -h.y, h.z),
                Vec3::new(-h.x, -h.y, h.z),
            ]),
        ];
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, quad) in faces {
            let base = positions.len() as u32;
            positions.extend_from_slice(&quad);
            normals.extend(std::iter::repeat(normal).take(4));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(positions, normals, indices)
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub geometry: Option<Geometry>,
    pub material: Option<MaterialDef>,
    pub tag: Option<DeviceTag>,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl SceneNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            geometry: None,
            material: None,
            tag: None,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn with_transform(mut self, translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry, material: MaterialDef) -> Self {
        self.geometry = Some(geometry);
        self.material = Some(material);
        self
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn is_mesh(&self) -> bool {
        self.geometry.is_some()
    }
}

/// One loaded room. The tree is append-only: parents are always inserted
/// before their children, so node ids double as a stable topological order.
#[derive(Debug, Clone)]
pub struct SceneFragment {
    name: String,
    nodes: Vec<SceneNode>,
}

impl SceneFragment {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = SceneNode::named(name.clone());
        Self { name, nodes: vec![root] }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.index()]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn add_child(&mut self, parent: NodeId, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Every node id in insertion order (parents before children).
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn mesh_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|id| self.nodes[id.index()].is_mesh())
    }

    /// Ids of `root` and every node below it, in stable id order.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out.sort();
        out
    }

    /// World matrix per node, indexed by `NodeId::index`. Single pass; valid
    /// because parents precede children in the arena.
    pub fn world_transforms(&self) -> Vec<Mat4> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.local_matrix();
            let world = match node.parent {
                Some(parent) => out[parent.index()] * local,
                None => local,
            };
            out.push(world);
        }
        out
    }

    /// World-space bounds over every mesh node, or `None` for a fragment
    /// with no geometry.
    pub fn world_bounds(&self) -> Option<Aabb> {
        let transforms = self.world_transforms();
        let mut bounds: Option<Aabb> = None;
        for id in self.mesh_nodes() {
            let geometry = self.nodes[id.index()].geometry.as_ref()?;
            let world = geometry.bounds.transformed(transforms[id.index()]);
            bounds = Some(match bounds {
                Some(b) => b.union(world),
                None => world,
            });
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey() -> MaterialDef {
        MaterialDef::solid("grey", [0.5, 0.5, 0.5, 1.0])
    }

    #[test]
    fn world_transforms_compose_parent_chain() {
        let mut fragment = SceneFragment::new("test");
        let root = fragment.root();
        fragment.node_mut(root).translation = Vec3::new(1.0, 0.0, 0.0);
        let mid = fragment.add_child(root, SceneNode::named("mid").with_transform(
            Vec3::new(0.0, 2.0, 0.0),
            Quat::IDENTITY,
            Vec3::ONE,
        ));
        let leaf = fragment.add_child(
            mid,
            SceneNode::named("leaf").with_geometry(Geometry::cuboid(Vec3::splat(0.5)), grey()),
        );
        let transforms = fragment.world_transforms();
        let origin = transforms[leaf.index()].transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn world_bounds_account_for_scale() {
        let mut fragment = SceneFragment::new("test");
        let root = fragment.root();
        fragment.node_mut(root).scale = Vec3::splat(2.0);
        fragment.add_child(
            root,
            SceneNode::named("box").with_geometry(Geometry::cuboid(Vec3::splat(0.5)), grey()),
        );
        let bounds = fragment.world_bounds().expect("bounds");
        assert!((bounds.min - Vec3::splat(-1.0)).length() < 1e-5);
        assert!((bounds.max - Vec3::splat(1.0)).length() < 1e-5);
    }

    #[test]
    fn subtree_is_sorted_and_complete() {
        let mut fragment = SceneFragment::new("test");
        let root = fragment.root();
        let a = fragment.add_child(root, SceneNode::named("a"));
        let _b = fragment.add_child(root, SceneNode::named("b"));
        let a1 = fragment.add_child(a, SceneNode::named("a1"));
        let ids = fragment.subtree(a);
        assert_eq!(ids, vec![a, a1]);
        assert_eq!(fragment.subtree(root).len(), 4);
    }
}
