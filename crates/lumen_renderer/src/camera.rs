//! Camera for ray generation.
//!
//! The camera orbits a fixed pivot. `y_rotation` turns it around world +Y,
//! `x_rotation` tilts it around its own right axis, and `field_of_view` is
//! the vertical opening angle. All three are in degrees.

use crate::error::{RenderError, RenderResult};
use lumen_math::{EulerRot, Quat, Ray, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Point the camera orbits around.
pub const ORBIT_PIVOT: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// Distance from the eye to [`ORBIT_PIVOT`].
pub const ORBIT_DISTANCE: f32 = 1.0;

/// Orthonormal camera frame derived from the rotation angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub eye: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// tan(fov / 2): half the viewport height at unit distance
    pub half_height: f32,
}

impl CameraBasis {
    fn from_angles(x_rotation: f32, y_rotation: f32, field_of_view: f32) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            y_rotation.to_radians(),
            x_rotation.to_radians(),
            0.0,
        );
        let forward = rotation * Vec3::NEG_Z;

        Self {
            eye: ORBIT_PIVOT - forward * ORBIT_DISTANCE,
            forward,
            right: rotation * Vec3::X,
            up: rotation * Vec3::Y,
            half_height: (field_of_view.to_radians() / 2.0).tan(),
        }
    }
}

/// Angles a driver sends to reposition the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub x_rotation: f32,
    pub y_rotation: f32,
    pub field_of_view: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            x_rotation: 0.0,
            y_rotation: 0.0,
            field_of_view: 90.0,
        }
    }
}

impl CameraSettings {
    /// Check that the angles are finite and the FOV is inside (0, 180).
    pub fn validate(&self) -> RenderResult<()> {
        if !self.x_rotation.is_finite() || !self.y_rotation.is_finite() {
            return Err(RenderError::InvalidCamera(format!(
                "rotation must be finite, got ({}, {})",
                self.x_rotation, self.y_rotation
            )));
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(RenderError::InvalidCamera(format!(
                "field of view must be in (0, 180) degrees, got {}",
                self.field_of_view
            )));
        }
        Ok(())
    }
}

/// Camera for generating rays into the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    settings: CameraSettings,
    basis: CameraBasis,
}

impl Camera {
    /// Create a camera from validated angles.
    pub fn new(x_rotation: f32, y_rotation: f32, field_of_view: f32) -> RenderResult<Self> {
        Self::from_settings(CameraSettings {
            x_rotation,
            y_rotation,
            field_of_view,
        })
    }

    pub fn from_settings(settings: CameraSettings) -> RenderResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            basis: CameraBasis::from_angles(
                settings.x_rotation,
                settings.y_rotation,
                settings.field_of_view,
            ),
        })
    }

    /// Replace the orientation. On error the camera is left untouched.
    pub fn set(&mut self, x_rotation: f32, y_rotation: f32, field_of_view: f32) -> RenderResult<()> {
        *self = Self::new(x_rotation, y_rotation, field_of_view)?;
        Ok(())
    }

    pub fn settings(&self) -> CameraSettings {
        self.settings
    }

    pub fn basis(&self) -> &CameraBasis {
        &self.basis
    }

    /// Map a pixel to a world-space ray.
    ///
    /// `jitter` picks the point inside the pixel footprint, each component
    /// in [0, 1); `(0.5, 0.5)` is the pixel centre. Rows grow downward.
    pub fn generate_ray(&self, pixel_x: u32, pixel_y: u32, image_width: u32, image_height: u32, jitter: Vec2) -> Ray {
        debug_assert!(image_width > 0 && image_height > 0);

        let aspect = image_width as f32 / image_height as f32;
        let half_width = self.basis.half_height * aspect;

        // Normalized device coordinates in [-1, 1], +v up.
        let u = ((pixel_x as f32 + jitter.x) / image_width as f32) * 2.0 - 1.0;
        let v = 1.0 - ((pixel_y as f32 + jitter.y) / image_height as f32) * 2.0;

        let direction = self.basis.forward
            + self.basis.right * (u * half_width)
            + self.basis.up * (v * self.basis.half_height);

        Ray::new(self.basis.eye, direction)
    }
}

impl Default for Camera {
    fn default() -> Self {
        let settings = CameraSettings::default();
        Self {
            settings,
            basis: CameraBasis::from_angles(
                settings.x_rotation,
                settings.y_rotation,
                settings.field_of_view,
            ),
        }
    }
}
