use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat4, Vec3};

const POLE_EPSILON: f32 = 1e-6;
const MOVE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 35.0,
            near: 0.01,
            far: 100.0,
            position: [0.0, 0.7, 2.0],
            target: [0.0, 0.2, 0.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    look_target: Vec3,
    view: Mat4,
    projection: Mat4,
    projection_dirty: bool,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_y_deg,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            look_target: Vec3::NEG_Z,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            projection_dirty: true,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(config.fov_y_deg, aspect, config.near, config.far);
        camera.position = Vec3::from(config.position);
        camera.look_at(Vec3::from(config.target));
        camera
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.look_target = target;
        self.view = Mat4::look_at_rh(self.position, target, Vec3::Y);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection_dirty = true;
    }

    pub fn projection_dirty(&self) -> bool {
        self.projection_dirty
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect.max(1e-6),
            self.near,
            self.far,
        );
        self.projection_dirty = false;
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn forward(&self) -> Vec3 {
        (self.look_target - self.position).normalize_or_zero()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            enable_zoom: true,
            enable_pan: false,
            min_distance: 0.1,
            max_distance: 10.0,
            min_polar_angle: 0.0,
            max_polar_angle: FRAC_PI_2,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

/// Radius, polar angle from +Y and azimuth around +Y (measured from +Z).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Damped orbit around a fixed target. Input accumulates into pending
/// deltas; [`OrbitController::update`] integrates one step of them and must
/// be called once per rendered frame.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub settings: OrbitSettings,
    target: Vec3,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
}

impl OrbitController {
    pub fn new(target: Vec3, settings: OrbitSettings) -> Self {
        Self {
            settings,
            target,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Pointer drag in physical pixels; a drag across the full viewport
    /// height turns the camera once around.
    pub fn handle_drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        let speed = self.settings.rotate_speed;
        self.rotate_left(TAU * dx / height * speed);
        self.rotate_up(TAU * dy / height * speed);
    }

    /// Positive steps zoom in.
    pub fn handle_wheel(&mut self, steps: f32) {
        if !self.settings.enable_zoom || steps == 0.0 {
            return;
        }
        let zoom = 0.95f32.powf(self.settings.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= zoom;
        } else {
            self.scale /= zoom;
        }
    }

    /// Moves the target in the camera plane. Ignored unless panning is enabled.
    pub fn handle_pan(&mut self, dx: f32, dy: f32, viewport_height: f32, camera: &PerspectiveCamera) -> bool {
        if !self.settings.enable_pan {
            return false;
        }
        let distance = (camera.position - self.target).length();
        let world_per_pixel =
            2.0 * distance * (camera.fov_y_deg.to_radians() * 0.5).tan() / viewport_height.max(1.0);
        let forward = camera.forward();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        self.pan_offset += (-right * dx + up * dy) * world_per_pixel;
        true
    }

    /// Integrates one step of pending input into the camera. Returns whether
    /// the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let settings = &self.settings;
        let step = if settings.enable_damping {
            settings.damping_factor
        } else {
            1.0
        };

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        spherical.theta += self.delta_theta * step;
        spherical.phi += self.delta_phi * step;
        spherical.phi = spherical
            .phi
            .clamp(settings.min_polar_angle, settings.max_polar_angle)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius = (spherical.radius * self.scale)
            .clamp(settings.min_distance, settings.max_distance);

        self.target += self.pan_offset * step;

        let previous = camera.position;
        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if settings.enable_damping {
            let decay = 1.0 - settings.damping_factor;
            self.delta_theta *= decay;
            self.delta_phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        previous.distance_squared(camera.position) > MOVE_EPSILON * MOVE_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::{CameraConfig, OrbitController, OrbitSettings, PerspectiveCamera, Spherical};
    use glam::Vec3;

    fn polar_angle(controls: &OrbitController, camera: &PerspectiveCamera) -> f32 {
        Spherical::from_offset(camera.position - controls.target()).phi
    }

    fn distance(controls: &OrbitController, camera: &PerspectiveCamera) -> f32 {
        (camera.position - controls.target()).length()
    }

    fn rig() -> (PerspectiveCamera, OrbitController) {
        let config = CameraConfig::default();
        let camera = PerspectiveCamera::from_config(&config, 16.0 / 9.0);
        let controls = OrbitController::new(Vec3::from(config.target), OrbitSettings::default());
        (camera, controls)
    }

    #[test]
    fn update_without_input_keeps_the_initial_framing() {
        let (mut camera, mut controls) = rig();
        let start = camera.position;
        for _ in 0..10 {
            controls.update(&mut camera);
        }
        assert!(camera.position.distance(start) < 1e-4);
    }

    #[test]
    fn large_drag_never_pushes_the_camera_below_the_horizon() {
        let (mut camera, mut controls) = rig();
        // Dragging upwards lowers the camera.
        controls.handle_drag(0.0, -50_000.0, 800.0);
        for _ in 0..500 {
            controls.update(&mut camera);
            assert!(polar_angle(&controls, &camera) <= FRAC_PI_2 + 1e-5);
            assert!(camera.position.y >= controls.target().y - 1e-4);
        }
        assert!((polar_angle(&controls, &camera) - FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn damping_spreads_a_drag_over_several_frames() {
        let (mut camera, mut controls) = rig();
        controls.handle_drag(100.0, 0.0, 800.0);
        assert!(controls.update(&mut camera));
        let after_one = camera.position;
        assert!(controls.update(&mut camera));
        assert!(camera.position.distance(after_one) > 0.0);
    }

    #[test]
    fn zoom_is_clamped_to_distance_limits() {
        let (mut camera, mut controls) = rig();
        for _ in 0..200 {
            controls.handle_wheel(-5.0);
            controls.update(&mut camera);
        }
        assert!(distance(&controls, &camera) <= 10.0 + 1e-4);

        for _ in 0..400 {
            controls.handle_wheel(5.0);
            controls.update(&mut camera);
        }
        assert!(distance(&controls, &camera) >= 0.1 - 1e-4);
    }

    #[test]
    fn pan_is_disabled_by_default() {
        let (mut camera, mut controls) = rig();
        let snapshot = camera.clone();
        assert!(!controls.handle_pan(50.0, 50.0, 800.0, &snapshot));
        controls.update(&mut camera);
        assert_eq!(controls.target(), Vec3::new(0.0, 0.2, 0.0));
    }

    #[test]
    fn enabled_pan_moves_target_and_camera_together() {
        let (mut camera, mut controls) = rig();
        controls.settings.enable_pan = true;
        controls.settings.enable_damping = false;
        let before = camera.position - controls.target();
        let snapshot = camera.clone();
        assert!(controls.handle_pan(-100.0, 0.0, 800.0, &snapshot));
        controls.update(&mut camera);
        // Dragging left slides the view right along +X.
        assert!(controls.target().x > 0.0);
        assert!((camera.position - controls.target() - before).length() < 1e-4);
    }

    #[test]
    fn aspect_change_marks_projection_dirty() {
        let (mut camera, _) = rig();
        assert!(!camera.projection_dirty());
        camera.set_aspect(2.0);
        assert!(camera.projection_dirty());
        camera.update_projection_matrix();
        assert!(!camera.projection_dirty());
        assert!(camera.view_projection().is_finite());
    }
}
