//! Hittable trait and Hit record for ray-object intersection.

use crate::Material;
use lumen_math::{Interval, Ray, Vec3};

/// Record of a ray-object intersection.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    /// Point of intersection
    pub point: Vec3,
    /// Unit surface normal at intersection (always points against the ray)
    pub normal: Vec3,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    /// Material at the intersection point
    pub material: &'a Material,
}

impl<'a> Hit<'a> {
    /// Build a hit, orienting the stored normal against the ray.
    ///
    /// `outward_normal` must be unit length.
    pub fn new(ray: &Ray, t: f32, outward_normal: Vec3, material: &'a Material) -> Self {
        // If the ray and normal point in the same direction, we're inside
        let front_face = ray.direction().dot(outward_normal) < 0.0;
        let normal = if front_face {
            outward_normal
        } else {
            -outward_normal
        };

        Self {
            point: ray.at(t),
            normal,
            t,
            front_face,
            material,
        }
    }
}

/// Trait for objects that can be hit by rays.
///
/// Implementations must be deterministic: the same ray and interval always
/// give the same answer.
pub trait Hittable: Send + Sync {
    /// Nearest intersection with `ray_t.min <= t <= ray_t.max`, if any.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit<'_>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_normal_faces_against_ray() {
        let material = Material::lambertian(Color::ONE);

        let outside = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hit = Hit::new(&outside, 4.0, Vec3::Z, &material);
        assert!(hit.front_face);
        assert_eq!(hit.normal, Vec3::Z);
        assert_eq!(hit.point, Vec3::new(0.0, 0.0, 1.0));

        let inside = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = Hit::new(&inside, 1.0, Vec3::Z, &material);
        assert!(!hit.front_face);
        assert_eq!(hit.normal, Vec3::NEG_Z);
    }
}
