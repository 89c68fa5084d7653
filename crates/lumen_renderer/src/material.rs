//! Surface materials.
//!
//! The material set is closed: the demo scene only needs diffuse, metal,
//! glass and emitters, so materials are a plain enum instead of trait objects.

use crate::hittable::Hit;
use crate::sampling::{gen_f32, random_unit_vector};
use lumen_math::{Ray, Vec3};
use rand::RngCore;

/// Color type alias (linear RGB, typically 0-1 but unbounded for emitters)
pub type Color = Vec3;

/// Result of a successful scatter.
#[derive(Debug, Clone, Copy)]
pub struct Scatter {
    /// Per-channel reflectance applied to the path throughput
    pub attenuation: Color,
    /// Outgoing ray
    pub ray: Ray,
}

/// How light interacts with a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Ideal diffuse reflector
    Lambertian { albedo: Color },
    /// Specular reflector; `fuzz` 0.0 = perfect mirror, 1.0 = very rough
    Metal { albedo: Color, fuzz: f32 },
    /// Clear refractive material (1.0 = air, 1.5 = glass, 2.4 = diamond)
    Dielectric { ior: f32 },
    /// Light source; absorbs everything it is hit with
    Emissive { emission: Color },
}

impl Material {
    pub fn lambertian(albedo: Color) -> Self {
        Self::Lambertian { albedo }
    }

    pub fn metal(albedo: Color, fuzz: f32) -> Self {
        Self::Metal {
            albedo,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }

    pub fn dielectric(ior: f32) -> Self {
        Self::Dielectric { ior }
    }

    pub fn emissive(emission: Color) -> Self {
        Self::Emissive { emission }
    }

    /// Light emitted from the surface.
    pub fn emitted(&self) -> Color {
        match self {
            Self::Emissive { emission } => *emission,
            _ => Color::ZERO,
        }
    }

    /// Scatter an incoming ray.
    ///
    /// Returns `None` if the ray is absorbed.
    pub fn scatter(&self, ray_in: &Ray, hit: &Hit, rng: &mut dyn RngCore) -> Option<Scatter> {
        match *self {
            Self::Lambertian { albedo } => {
                let mut direction = hit.normal + random_unit_vector(rng);

                // Catch degenerate scatter direction
                if direction.length_squared() < 1e-8 {
                    direction = hit.normal;
                }

                Some(Scatter {
                    attenuation: albedo,
                    ray: Ray::new(hit.point, direction),
                })
            }
            Self::Metal { albedo, fuzz } => {
                let reflected = reflect(ray_in.direction(), hit.normal);
                let direction = reflected + fuzz * random_unit_vector(rng);

                // Only scatter if the reflected ray leaves the surface
                (direction.dot(hit.normal) > 0.0).then(|| Scatter {
                    attenuation: albedo,
                    ray: Ray::new(hit.point, direction),
                })
            }
            Self::Dielectric { ior } => {
                let ratio = if hit.front_face { 1.0 / ior } else { ior };

                let unit_direction = ray_in.direction();
                let cos_theta = (-unit_direction).dot(hit.normal).min(1.0);
                let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

                // Total internal reflection
                let cannot_refract = ratio * sin_theta > 1.0;

                let direction = if cannot_refract || schlick(cos_theta, ratio) > gen_f32(rng) {
                    reflect(unit_direction, hit.normal)
                } else {
                    refract(unit_direction, hit.normal, ratio)
                };

                Some(Scatter {
                    attenuation: Color::ONE,
                    ray: Ray::new(hit.point, direction),
                })
            }
            Self::Emissive { .. } => None,
        }
    }
}

/// Schlick's approximation for reflectance.
fn schlick(cosine: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

/// Reflect a vector about a normal.
#[inline]
fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface.
#[inline]
fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hit_facing_up(material: &Material) -> Hit<'_> {
        Hit {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            t: 1.0,
            front_face: true,
            material,
        }
    }

    #[test]
    fn test_lambertian_scatters_into_upper_hemisphere() {
        let material = Material::lambertian(Color::splat(0.5));
        let hit = hit_facing_up(&material);
        let ray_in = Ray::new(Vec3::Y, Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..64 {
            let scatter = material.scatter(&ray_in, &hit, &mut rng).unwrap();
            assert_eq!(scatter.attenuation, Color::splat(0.5));
            assert!(scatter.ray.direction().dot(Vec3::Y) >= 0.0);
        }
    }

    #[test]
    fn test_mirror_reflects() {
        let material = Material::metal(Color::ONE, 0.0);
        let hit = hit_facing_up(&material);
        let ray_in = Ray::new(Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 0.0));
        let mut rng = StdRng::seed_from_u64(1);

        let scatter = material.scatter(&ray_in, &hit, &mut rng).unwrap();
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((scatter.ray.direction() - expected).length() < 1e-5);
    }

    #[test]
    fn test_metal_fuzz_is_clamped() {
        assert_eq!(
            Material::metal(Color::ONE, 3.0),
            Material::Metal { albedo: Color::ONE, fuzz: 1.0 }
        );
    }

    #[test]
    fn test_dielectric_never_absorbs() {
        let material = Material::dielectric(1.5);
        let hit = hit_facing_up(&material);
        let ray_in = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0));
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..32 {
            let scatter = material.scatter(&ray_in, &hit, &mut rng).unwrap();
            assert_eq!(scatter.attenuation, Color::ONE);
            assert!(scatter.ray.direction().is_finite());
        }
    }

    #[test]
    fn test_emissive_absorbs_and_emits() {
        let material = Material::emissive(Color::new(4.0, 2.0, 1.0));
        let hit = hit_facing_up(&material);
        let ray_in = Ray::new(Vec3::Y, Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(0);

        assert!(material.scatter(&ray_in, &hit, &mut rng).is_none());
        assert_eq!(material.emitted(), Color::new(4.0, 2.0, 1.0));
        assert_eq!(Material::lambertian(Color::ONE).emitted(), Color::ZERO);
    }
}
