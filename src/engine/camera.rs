//! Orbiting scene camera.
//!
//! The camera always looks at the world origin. Its position is only ever derived from the
//! accumulated yaw/pitch/zoom in [`CameraState::update`]; nothing else assigns it.

use glam::{EulerRot, Mat4, Quat, Vec3};

pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 1.0;
pub const FAR_PLANE: f32 = 25000.0;

const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 800.0, 4200.0);
const DEFAULT_YAW_DEGREES: f32 = 180.0;
const DEFAULT_PITCH_DEGREES: f32 = 180.0;
const DEFAULT_ZOOM: f32 = 6000.0;

/// Orbit direction before any yaw/pitch is applied.
const BACKWARD: Vec3 = Vec3::Z;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    position: Vec3,
    look_at: Vec3,
    yaw_degrees: f32,
    pitch_degrees: f32,
    zoom: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            look_at: Vec3::ZERO,
            yaw_degrees: DEFAULT_YAW_DEGREES,
            pitch_degrees: DEFAULT_PITCH_DEGREES,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl CameraState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn yaw_degrees(&self) -> f32 {
        self.yaw_degrees
    }

    pub fn pitch_degrees(&self) -> f32 {
        self.pitch_degrees
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Accumulates the deltas and re-derives the position.
    ///
    /// No clamping or wraparound: yaw and pitch grow without bound.
    pub fn update(&mut self, yaw_delta: f32, pitch_delta: f32, zoom_delta: f32) {
        self.yaw_degrees += yaw_delta;
        self.pitch_degrees += pitch_delta;
        self.zoom += zoom_delta;

        self.position = self.look_at + self.zoom * self.orbit_direction();
    }

    /// Unit vector from the target towards the camera.
    pub fn orbit_direction(&self) -> Vec3 {
        // Roll, then pitch around X, then yaw around Y.
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            self.yaw_degrees.to_radians(),
            self.pitch_degrees.to_radians(),
            0.0,
        );
        rotation * BACKWARD
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            aspect_ratio,
            NEAR_PLANE,
            FAR_PLANE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_behind_and_above_origin() {
        let camera = CameraState::new();
        assert_eq!(camera.position(), Vec3::new(0.0, 800.0, 4200.0));
        assert_eq!(camera.look_at(), Vec3::ZERO);
    }

    #[test]
    fn updates_compose_additively() {
        let mut split = CameraState::new();
        split.update(12.5, -3.0, 100.0);
        split.update(-2.5, 7.0, -40.0);

        let mut once = CameraState::new();
        once.update(10.0, 4.0, 60.0);

        assert_relative_eq!(split.yaw_degrees(), once.yaw_degrees());
        assert_relative_eq!(split.pitch_degrees(), once.pitch_degrees());
        assert_relative_eq!(split.zoom(), once.zoom());
        assert!(split.position().abs_diff_eq(once.position(), 1e-2));
    }

    #[test]
    fn look_at_never_moves() {
        let mut camera = CameraState::new();
        for i in 0..50 {
            camera.update(i as f32 * 3.7, -(i as f32), 25.0);
            assert_eq!(camera.look_at(), Vec3::ZERO);
        }
    }

    #[test]
    fn position_sits_on_zoom_sphere() {
        let mut camera = CameraState::new();
        camera.update(33.0, -71.0, -1000.0);
        assert_relative_eq!(camera.position().length(), 5000.0, epsilon = 1e-2);
    }

    #[test]
    fn half_turns_cancel_back_to_backward_axis() {
        // Default yaw 180 + pitch 180 lands back on +Z.
        let mut camera = CameraState::new();
        camera.update(0.0, 0.0, 0.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 6000.0), 1e-2));
    }

    #[test]
    fn quarter_yaw_swings_onto_x_axis() {
        let mut camera = CameraState::new();
        camera.update(-90.0, -180.0, 0.0);
        // yaw 90 about +Y carries +Z onto +X.
        assert!(camera.position().abs_diff_eq(Vec3::new(6000.0, 0.0, 0.0), 1e-1));
    }
}
