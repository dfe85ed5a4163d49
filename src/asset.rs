//! Room asset import and the background loader.
//!
//! Rooms are standard glTF containers authored elsewhere; import preserves
//! the authored node hierarchy and names because the device classifier
//! keys off them. Parsing runs on a worker thread and completions come
//! back over a channel drained on the main thread, so the scene graph is
//! only ever touched between frames.

use crate::scene::{Geometry, MaterialDef, NodeId, SceneFragment, SceneNode};
use anyhow::{anyhow, Context, Result};
use glam::{Quat, Vec3};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

/// Parses one room file into a detached scene fragment.
pub fn import_room(path: impl AsRef<Path>, fragment_name: &str) -> Result<SceneFragment> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)
        .with_context(|| format!("Failed to import room asset {}", path.display()))?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("No scene in {}", path.display()))?;

    let mut fragment = SceneFragment::new(fragment_name);
    let root = fragment.root();
    for node in scene.nodes() {
        import_node(&mut fragment, root, &node, &buffers)?;
    }
    if fragment.mesh_nodes().next().is_none() {
        return Err(anyhow!("Room asset {} contains no triangle meshes", path.display()));
    }
    Ok(fragment)
}

fn import_node(
    fragment: &mut SceneFragment,
    parent: NodeId,
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
) -> Result<()> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let name = node.name().map(str::to_string).unwrap_or_else(|| format!("node_{}", node.index()));
    let scene_node = SceneNode::named(name.clone()).with_transform(
        Vec3::from_array(translation),
        Quat::from_array(rotation),
        Vec3::from_array(scale),
    );
    let id = fragment.add_child(parent, scene_node);

    if let Some(mesh) = node.mesh() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            primitives.push(import_primitive(&primitive, buffers)?);
        }
        match primitives.len() {
            0 => {}
            // A single primitive renders as the node itself, so the
            // classifier sees this node's parent; extra primitives become
            // children and the classifier sees this node's own name. Both
            // mirror how common glTF viewers expand meshes.
            1 => {
                if let Some((geometry, material)) = primitives.pop() {
                    let mesh_node = fragment.node_mut(id);
                    mesh_node.geometry = Some(geometry);
                    mesh_node.material = Some(material);
                }
            }
            _ => {
                for (index, (geometry, material)) in primitives.into_iter().enumerate() {
                    fragment.add_child(
                        id,
                        SceneNode::named(format!("{name}_{index}"))
                            .with_geometry(geometry, material),
                    );
                }
            }
        }
    }

    for child in node.children() {
        import_node(fragment, id, &child, buffers)?;
    }
    Ok(())
}

fn import_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Result<(Geometry, MaterialDef)> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| anyhow!("Primitive is missing POSITION data"))?
        .map(Vec3::from_array)
        .collect();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|read| read.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());
    let normals: Vec<Vec3> = match reader.read_normals() {
        Some(iter) => iter.map(Vec3::from_array).collect(),
        None => compute_normals(&positions, &indices),
    };
    let normals =
        if normals.len() == positions.len() { normals } else { compute_normals(&positions, &indices) };

    let material = primitive.material();
    let pbr = material.pbr_metallic_roughness();
    let label = material.name().map(str::to_string).unwrap_or_else(|| {
        material.index().map(|i| format!("material_{i}")).unwrap_or_else(|| "default".to_string())
    });
    let def = MaterialDef {
        name: label,
        base_color: pbr.base_color_factor(),
        emissive: material.emissive_factor(),
    };
    Ok((Geometry::new(positions, normals, indices), def))
}

fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let face = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        if face.length_squared() > 0.0 {
            normals[i0] += face;
            normals[i1] += face;
            normals[i2] += face;
        }
    }
    for normal in &mut normals {
        *normal = if normal.length_squared() > 0.0 { normal.normalize() } else { Vec3::Y };
    }
    normals
}

/// Token identifying one load request. Only the newest token may mutate the
/// registry when its completion arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub u64);

pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub room_id: String,
    pub room_name: String,
    pub result: Result<SceneFragment>,
}

/// Fire-and-forget room loader. Each request parses on its own worker
/// thread; `drain` collects whatever has finished since the last frame.
pub struct RoomLoader {
    models_root: PathBuf,
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
}

impl RoomLoader {
    pub fn new(models_root: impl Into<PathBuf>) -> Self {
        let (tx, rx) = channel();
        Self { models_root: models_root.into(), tx, rx }
    }

    pub fn request(&self, ticket: LoadTicket, room_id: &str, room_name: &str, file: &str) {
        let path = self.models_root.join(file);
        let tx = self.tx.clone();
        let room_id = room_id.to_string();
        let room_name = room_name.to_string();
        thread::spawn(move || {
            let result = import_room(&path, &room_name);
            // The receiver disappearing just means the app shut down.
            let _ = tx.send(LoadCompletion { ticket, room_id, room_name, result });
        });
    }

    /// Completions that have arrived since the last call, oldest first.
    pub fn drain(&self) -> Vec<LoadCompletion> {
        self.rx.try_iter().collect()
    }
}
