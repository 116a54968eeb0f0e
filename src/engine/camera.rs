// Chase camera that orbits the user vessel.
//
// Camera model:
//   - A target point (the vessel) the camera looks at every frame
//   - Pitch (elevation) and yaw (horizontal orbit) changed by left-drag
//   - Zoom by adjusting distance along the look vector, clamped
//   - yaw = 0 puts the eye on the -Z side of the target, looking toward +Z

use glam::{Mat4, Vec3};
use super::input::InputState;

pub struct ChaseCamera {
    /// Point the camera looks at. Set from the vessel pose in update().
    target: Vec3,

    /// Distance from target along the look direction.
    /// Private: always clamped to [min_distance, max_distance] in update(). Use distance() to read.
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Elevation angle in radians (0 = horizontal). Kept below max_pitch so
    /// the eye never dips under the water plane.
    pub pitch: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,

    /// Horizontal orbit angle in radians.
    pub yaw: f32,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Zoom change (in distance units) per scroll line
    pub zoom_speed: f32,

    /// Orbit angle change per dragged pixel
    pub orbit_speed: f32,
}

impl ChaseCamera {
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 300.0,
            min_distance: 60.0,
            max_distance: 300.0,
            pitch: (128.0f32 / 516.0).atan(),
            min_pitch: 0.05,
            max_pitch: std::f32::consts::FRAC_PI_2 - 0.1,
            yaw: 0.0,
            fov: 60.0_f32.to_radians(),
            near: 0.5,
            far: 8000.0,
            zoom_speed: 15.0,
            orbit_speed: 0.005,
        }
    }

    /// Follow `target` and apply orbit/zoom input. Call once per frame before rendering.
    pub fn update(&mut self, input: &InputState, target: Vec3) {
        self.target = target;

        if input.is_orbiting() {
            let (dx, dy) = input.mouse_delta;
            self.yaw -= dx * self.orbit_speed;
            self.pitch += dy * self.orbit_speed;
        }
        self.pitch = self.pitch.clamp(self.min_pitch, self.max_pitch);

        // Zoom: scroll up (positive delta) zooms in (decreases distance)
        self.distance -= input.scroll_delta * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        self.target + self.eye_offset()
    }

    /// View matrix: looks from the camera eye toward the target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), self.target, Vec3::Y)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn distance(&self) -> f32 { self.distance }

    // Offset from target to camera eye based on pitch, yaw, and distance.
    fn eye_offset(&self) -> Vec3 {
        Vec3::new(
            -self.yaw.sin() * self.pitch.cos() * self.distance,
            self.pitch.sin() * self.distance,
            -self.yaw.cos() * self.pitch.cos() * self.distance,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eye_sits_behind_and_above() {
        let camera = ChaseCamera::new();
        let eye = camera.camera_position();
        assert!(eye.z < 0.0);
        assert!(eye.y > 0.0);
        assert!(eye.x.abs() < 1e-4);
        assert!((eye.length() - 300.0).abs() < 1e-2);
    }

    #[test]
    fn test_update_follows_target_and_clamps_zoom() {
        let mut camera = ChaseCamera::new();
        let mut input = InputState::new();
        input.scroll_delta = -100.0;
        camera.update(&input, Vec3::new(10.0, 0.0, 5.0));
        let eye = camera.camera_position() - Vec3::new(10.0, 0.0, 5.0);
        assert!((eye.length() - camera.distance()).abs() < 1e-2);
        assert_eq!(camera.distance(), camera.max_distance);

        input.scroll_delta = 100.0;
        camera.update(&input, Vec3::ZERO);
        assert_eq!(camera.distance(), camera.min_distance);
    }
}
