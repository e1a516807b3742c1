//! Orbit camera around the particle cloud.
//!
//! The camera sits on a sphere around the origin and looks at it.  While no
//! hand is steering, it drifts around the vertical axis at the usual
//! orbit-controls auto-rotate pace.

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};

pub const DEFAULT_DISTANCE: f32 = 8.0;
pub const DEFAULT_FOV_Y_DEG: f32 = 60.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 1000.0;

/// Orbit-controls speed unit: one full turn per 60 s at speed 1.
pub const AUTO_ROTATE_UNIT: f32 = TAU / 60.0;
pub const AUTO_ROTATE_SPEED: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Distance from the origin.
    pub distance:    f32,
    /// Vertical field of view (radians).
    pub fov_y:       f32,
    /// Angle around +Y, zero looking down −Z from +Z (radians).
    pub azimuth:     f32,
    /// Angle above the XZ plane (radians).
    pub elevation:   f32,
    auto_rotate:     bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        OrbitCamera {
            distance:    DEFAULT_DISTANCE,
            fov_y:       DEFAULT_FOV_Y_DEG.to_radians(),
            azimuth:     0.0,
            elevation:   0.0,
            auto_rotate: true,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self { Self::default() }

    pub fn auto_rotate(&self) -> bool { self.auto_rotate }

    pub fn set_auto_rotate(&mut self, on: bool) {
        if on != self.auto_rotate {
            log::debug!("camera auto-rotate {}", if on { "on" } else { "off" });
        }
        self.auto_rotate = on;
    }

    /// Advance the auto-rotation by `delta` seconds.
    pub fn tick(&mut self, delta: f32) {
        if self.auto_rotate {
            let step = AUTO_ROTATE_UNIT * AUTO_ROTATE_SPEED * delta;
            self.azimuth = (self.azimuth + step).rem_euclid(TAU);
        }
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        Vec3::new(
            self.distance * cos_el * sin_az,
            self.distance * sin_el,
            self.distance * cos_el * cos_az,
        )
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    /// Projector for a `width × height` pixel viewport.
    pub fn projector(&self, width: usize, height: usize) -> Projector {
        let aspect = width as f32 / height.max(1) as f32;
        let proj = Mat4::perspective_rh_gl(self.fov_y, aspect, NEAR, FAR);
        Projector {
            view_proj: proj * self.view(),
            width:     width as f32,
            height:    height as f32,
        }
    }

    /// Pixel position and view depth of a world-space point.
    pub fn project(&self, point: Vec3, width: usize, height: usize) -> Option<(f32, f32, f32)> {
        self.projector(width, height).project(point)
    }
}

/// A view-projection frozen for one frame.
#[derive(Clone, Copy, Debug)]
pub struct Projector {
    view_proj: Mat4,
    width:     f32,
    height:    f32,
}

impl Projector {
    /// `(x, y, depth)` in pixels, y down.  `None` behind the near plane.
    pub fn project(&self, point: Vec3) -> Option<(f32, f32, f32)> {
        let clip = self.view_proj * point.extend(1.0);
        if clip.w < NEAR {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x + 1.0) * 0.5 * self.width;
        let y = (1.0 - ndc.y) * 0.5 * self.height;
        Some((x, y, clip.w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_lands_in_the_middle() {
        let cam = OrbitCamera::new();
        let (x, y, depth) = cam.project(Vec3::ZERO, 960, 640).unwrap();
        assert!((x - 480.0).abs() < 1e-3);
        assert!((y - 320.0).abs() < 1e-3);
        assert!((depth - DEFAULT_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn screen_axes() {
        let cam = OrbitCamera::new();
        let (x, _, _) = cam.project(Vec3::X, 960, 640).unwrap();
        let (_, y, _) = cam.project(Vec3::Y, 960, 640).unwrap();
        assert!(x > 480.0, "+X should be right of centre");
        assert!(y < 320.0, "+Y should be above centre");
    }

    #[test]
    fn behind_the_camera_is_culled() {
        let cam = OrbitCamera::new();
        assert!(cam.project(Vec3::new(0.0, 0.0, 20.0), 960, 640).is_none());
    }

    #[test]
    fn auto_rotate_pace() {
        let mut cam = OrbitCamera::new();
        cam.tick(60.0);
        // half a turn per minute
        assert!((cam.azimuth - TAU / 2.0).abs() < 1e-4);

        cam.set_auto_rotate(false);
        let before = cam.azimuth;
        cam.tick(5.0);
        assert_eq!(cam.azimuth, before);
    }

    #[test]
    fn eye_keeps_distance() {
        let mut cam = OrbitCamera::new();
        cam.azimuth = 1.1;
        cam.elevation = 0.4;
        assert!((cam.eye().length() - DEFAULT_DISTANCE).abs() < 1e-4);
    }
}
