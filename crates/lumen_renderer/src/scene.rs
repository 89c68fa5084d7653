//! Scene: an ordered list of spheres plus the background they sit in.
//!
//! The scene is immutable once handed to a session. Intersection walks the
//! primitives in insertion order and keeps the strictly nearest hit, so equal
//! distances resolve to the primitive that was added first.

use crate::hittable::{Hit, Hittable};
use crate::{Color, Material, Sphere};
use lumen_math::{Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Radiance returned for rays that leave the scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Background {
    /// Constant color in every direction
    Solid(Color),
    /// White below the horizon blending to sky blue overhead
    #[default]
    Sky,
}

impl Background {
    const SKY_BLUE: Color = Color::new(0.5, 0.7, 1.0);

    pub fn radiance(&self, ray: &Ray) -> Color {
        match self {
            Self::Solid(color) => *color,
            Self::Sky => {
                let a = 0.5 * (ray.direction().y + 1.0);
                Color::ONE * (1.0 - a) + Self::SKY_BLUE * a
            }
        }
    }
}

/// A fixed collection of primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    primitives: Vec<Sphere>,
    background: Background,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(background: Background) -> Self {
        Self {
            primitives: Vec::new(),
            background,
        }
    }

    /// Add a primitive. Later primitives lose distance ties.
    pub fn with(mut self, sphere: Sphere) -> Self {
        self.primitives.push(sphere);
        self
    }

    pub fn add(&mut self, sphere: Sphere) {
        self.primitives.push(sphere);
    }

    /// The demo scene: a red ball on a grey ground, between a glass ball and
    /// a brushed metal ball, under a sky.
    pub fn demo() -> Self {
        Self::new(Background::Sky)
            .with(Sphere::new(
                Vec3::new(0.0, 0.0, -1.0),
                0.5,
                Material::lambertian(Color::new(0.7, 0.1, 0.1)),
            ))
            .with(Sphere::new(
                Vec3::new(0.0, -100.5, -1.0),
                100.0,
                Material::lambertian(Color::splat(0.5)),
            ))
            .with(Sphere::new(
                Vec3::new(-1.0, 0.0, -1.0),
                0.5,
                Material::dielectric(1.5),
            ))
            .with(Sphere::new(
                Vec3::new(1.0, 0.0, -1.0),
                0.5,
                Material::metal(Color::new(0.8, 0.6, 0.2), 0.1),
            ))
    }

    pub fn primitives(&self) -> &[Sphere] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Nearest hit with `ray_t.min <= t <= ray_t.max`.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<Hit<'_>> {
        let mut closest: Option<Hit<'_>> = None;

        for primitive in &self.primitives {
            let max = closest.map_or(ray_t.max, |hit| hit.t);
            if let Some(hit) = primitive.hit(ray, ray_t.with_max(max)) {
                // Strictly nearer only: ties keep the earlier primitive.
                if closest.map_or(true, |best| hit.t < best.t) {
                    closest = Some(hit);
                }
            }
        }

        closest
    }
}

impl Hittable for Scene {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit<'_>> {
        self.intersect(ray, ray_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T_RANGE: Interval = Interval {
        min: 0.001,
        max: f32::INFINITY,
    };

    #[test]
    fn test_nearest_hit_wins() {
        let near = Material::lambertian(Color::new(1.0, 0.0, 0.0));
        let far = Material::lambertian(Color::new(0.0, 1.0, 0.0));
        // Far sphere inserted first.
        let scene = Scene::new(Background::Sky)
            .with(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 0.5, far))
            .with(Sphere::new(Vec3::new(0.0, 0.0, -2.0), 0.5, near));

        let hit = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), T_RANGE).unwrap();
        assert!((hit.t - 1.5).abs() < 1e-5);
        assert_eq!(*hit.material, near);
    }

    #[test]
    fn test_ties_resolve_by_insertion_order() {
        let first = Material::lambertian(Color::new(1.0, 0.0, 0.0));
        let second = Material::emissive(Color::ONE);
        let scene = Scene::new(Background::Sky)
            .with(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, first))
            .with(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, second));

        for _ in 0..4 {
            let hit = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), T_RANGE).unwrap();
            assert_eq!(*hit.material, first);
        }
    }

    #[test]
    fn test_miss_returns_none() {
        let scene = Scene::demo();
        assert!(scene.intersect(&Ray::new(Vec3::ZERO, Vec3::Y), T_RANGE).is_none());
        assert!(Scene::new(Background::Sky)
            .intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), T_RANGE)
            .is_none());
    }

    #[test]
    fn test_interval_bounds_are_inclusive() {
        let scene = Scene::new(Background::Sky).with(Sphere::new(
            Vec3::new(0.0, 0.0, -2.0),
            1.0,
            Material::lambertian(Color::ONE),
        ));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        let hit = scene.intersect(&ray, Interval::new(0.0, 1.0)).unwrap();
        assert_eq!(hit.t, 1.0);
    }

    #[test]
    fn test_sky_background_gradient() {
        let sky = Background::Sky;
        let up = sky.radiance(&Ray::new(Vec3::ZERO, Vec3::Y));
        let down = sky.radiance(&Ray::new(Vec3::ZERO, Vec3::NEG_Y));

        assert!((up - Color::new(0.5, 0.7, 1.0)).length() < 1e-6);
        assert!((down - Color::ONE).length() < 1e-6);

        let solid = Background::Solid(Color::splat(0.25));
        assert_eq!(solid.radiance(&Ray::new(Vec3::ZERO, Vec3::X)), Color::splat(0.25));
    }

    #[test]
    fn test_demo_scene_center_hits_red_ball() {
        let scene = Scene::demo();
        assert_eq!(scene.len(), 4);

        let hit = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), T_RANGE).unwrap();
        assert!((hit.t - 0.5).abs() < 1e-5);
        assert_eq!(*hit.material, Material::lambertian(Color::new(0.7, 0.1, 0.1)));
    }
}
