use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use winit::dpi::PhysicalSize;

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera looking at the active room.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, viewport: PhysicalSize<u32>) -> Mat4 {
        let aspect =
            if viewport.height > 0 { viewport.width as f32 / viewport.height as f32 } else { 1.0 };
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// World-space ray through a surface-space position. The position is
    /// normalized against the actual surface size, not any outer window.
    /// Returns `None` for a degenerate (zero-sized) surface.
    pub fn screen_ray(&self, screen: Vec2, viewport: PhysicalSize<u32>) -> Option<(Vec3, Vec3)> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let ndc_x = (2.0 * screen.x / viewport.width as f32) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen.y / viewport.height as f32);
        let clip = Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let aspect = viewport.width as f32 / viewport.height as f32;
        let inv_view_proj = (self.projection_matrix(aspect) * self.view_matrix()).inverse();
        let world = inv_view_proj * clip;
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let towards = (world.truncate() / world.w) - self.position;
        Some((self.position, towards.normalize()))
    }
}

/// Orbit controller around a fixed look-at target with damped input: wheel
/// and drag adjust goal values, `advance` eases the applied values toward
/// them each frame.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    goal_yaw: f32,
    goal_pitch: f32,
    goal_radius: f32,
    yaw: f32,
    pitch: f32,
    radius: f32,
    damping: f32,
}

impl OrbitController {
    const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
    const RADIUS_RANGE: (f32, f32) = (1.0, 80.0);

    /// Controller whose initial pose matches a camera standing at `position`
    /// looking at `target`.
    pub fn from_position(position: Vec3, target: Vec3, damping: f32) -> Self {
        let offset = position - target;
        let radius = offset.length().max(Self::RADIUS_RANGE.0);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / radius).clamp(-1.0, 1.0).asin();
        Self {
            target,
            goal_yaw: yaw,
            goal_pitch: pitch,
            goal_radius: radius,
            yaw,
            pitch,
            radius,
            damping: damping.max(0.0),
        }
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.goal_yaw += delta.x;
        self.goal_pitch = (self.goal_pitch + delta.y).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.goal_radius =
            (self.goal_radius * factor).clamp(Self::RADIUS_RANGE.0, Self::RADIUS_RANGE.1);
    }

    /// Eases the applied pose toward the goal pose. Exponential so the feel
    /// is framerate-independent.
    pub fn advance(&mut self, dt: f32) {
        let t = 1.0 - (-self.damping * dt.max(0.0)).exp();
        self.yaw += (self.goal_yaw - self.yaw) * t;
        self.pitch += (self.goal_pitch - self.pitch) * t;
        self.radius += (self.goal_radius - self.radius) * t;
    }

    pub fn camera(&self, fov_y_radians: f32, near: f32, far: f32) -> Camera3D {
        let rotation = Quat::from_euler(glam::EulerRot::YXZ, self.yaw, -self.pitch, 0.0);
        let offset = rotation * Vec3::new(0.0, 0.0, self.radius);
        Camera3D::new(self.target + offset, self.target, fov_y_radians, near, far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_projection_is_finite() {
        let camera =
            Camera3D::new(Vec3::new(6.0, 4.0, 8.0), Vec3::new(0.0, 1.5, 0.0), 55f32.to_radians(), 0.1, 500.0);
        let vp = camera.view_projection(PhysicalSize::new(1280, 720));
        assert!(vp.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn screen_ray_rejects_zero_viewport() {
        let camera = Camera3D::new(Vec3::Z * 5.0, Vec3::ZERO, 1.0, 0.1, 100.0);
        assert!(camera.screen_ray(Vec2::new(10.0, 10.0), PhysicalSize::new(0, 720)).is_none());
        assert!(camera.screen_ray(Vec2::new(10.0, 10.0), PhysicalSize::new(1280, 0)).is_none());
    }

    #[test]
    fn center_screen_ray_points_at_target() {
        let camera = Camera3D::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0, 0.1, 100.0);
        let (origin, dir) =
            camera.screen_ray(Vec2::new(640.0, 360.0), PhysicalSize::new(1280, 720)).expect("ray");
        assert!((origin - camera.position).length() < 1e-5);
        assert!((dir - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn orbit_from_position_round_trips() {
        let position = Vec3::new(6.0, 4.0, 8.0);
        let target = Vec3::new(0.0, 1.5, 0.0);
        let orbit = OrbitController::from_position(position, target, 8.0);
        let camera = orbit.camera(1.0, 0.1, 100.0);
        assert!((camera.position - position).length() < 1e-3);
    }

    #[test]
    fn damping_converges_on_goal() {
        let mut orbit = OrbitController::from_position(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 8.0);
        orbit.orbit(Vec2::new(1.0, 0.2));
        orbit.zoom(0.5);
        for _ in 0..600 {
            orbit.advance(1.0 / 60.0);
        }
        assert!((orbit.yaw - orbit.goal_yaw).abs() < 1e-3);
        assert!((orbit.radius - orbit.goal_radius).abs() < 1e-2);
    }
}
