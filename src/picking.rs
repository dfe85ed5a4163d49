//! Pointer picking: world-space ray against the active fragment's meshes,
//! then upward resolution of the hit mesh to its owning device root.

use crate::scene::{NodeId, SceneFragment};
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub node: NodeId,
    pub distance: f32,
}

/// Nearest intersection of a world-space ray with any mesh in the fragment.
///
/// Meshes are visited in node-id order and a later hit replaces the best
/// one only when strictly nearer, so equal-distance ties resolve to the
/// lower id — deterministic for a fixed scene.
pub fn intersect_fragment(fragment: &SceneFragment, origin: Vec3, direction: Vec3) -> Option<RayHit> {
    let dir = direction.normalize_or_zero();
    if dir.length_squared() <= f32::EPSILON {
        return None;
    }
    let transforms = fragment.world_transforms();
    let mut best: Option<RayHit> = None;
    for id in fragment.mesh_nodes() {
        let world = transforms[id.index()];
        let Some(distance) = ray_hit_mesh(fragment, id, world, origin, dir) else {
            continue;
        };
        match best {
            Some(hit) if distance >= hit.distance => {}
            _ => best = Some(RayHit { node: id, distance }),
        }
    }
    best
}

/// Walks from a hit mesh up through its ancestors to the nearest node that
/// carries a `DeviceTag`. `None` means the hit bottomed out untagged.
pub fn resolve_device_root(fragment: &SceneFragment, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if fragment.node(id).tag.is_some() {
            return Some(id);
        }
        current = fragment.parent(id);
    }
    None
}

fn ray_hit_mesh(
    fragment: &SceneFragment,
    id: NodeId,
    world: Mat4,
    origin: Vec3,
    dir: Vec3,
) -> Option<f32> {
    let geometry = fragment.node(id).geometry.as_ref()?;
    let inv = world.inverse();
    if !matrix_is_finite(&inv) {
        return None;
    }
    // Intersect in mesh-local space, then measure distance in world space so
    // scaled nodes still compare fairly.
    let origin_local = inv.transform_point3(origin);
    let dir_local = inv.transform_vector3(dir);
    if dir_local.length_squared() <= f32::EPSILON {
        return None;
    }
    let dir_local = dir_local.normalize();
    ray_aabb_intersection(origin_local, dir_local, geometry.bounds.min, geometry.bounds.max)?;

    let mut best_local: Option<f32> = None;
    for tri in geometry.indices.chunks_exact(3) {
        let a = geometry.positions[tri[0] as usize];
        let b = geometry.positions[tri[1] as usize];
        let c = geometry.positions[tri[2] as usize];
        if let Some(t) = ray_triangle_intersection(origin_local, dir_local, a, b, c) {
            if best_local.is_none_or(|best| t < best) {
                best_local = Some(t);
            }
        }
    }
    let t_local = best_local?;
    let hit_world = world.transform_point3(origin_local + dir_local * t_local);
    Some((hit_world - origin).length())
}

fn matrix_is_finite(mat: &Mat4) -> bool {
    mat.to_cols_array().iter().all(|v| v.is_finite())
}

/// Slab test, used as a cheap prefilter before per-triangle intersection.
pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    for i in 0..3 {
        let o = origin[i];
        let d = dir[i];
        if d.abs() < 1e-6 {
            if o < min[i] || o > max[i] {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min[i] - o) * inv_d;
            let mut t2 = (max[i] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    Some(if t_min >= 0.0 { t_min } else { t_max })
}

/// Moller-Trumbore, front and back faces both count.
pub fn ray_triangle_intersection(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let edge1 = b - a;
    let edge2 = c - a;
    let p = dir.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}
