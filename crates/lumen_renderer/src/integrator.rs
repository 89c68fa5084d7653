//! Path integrator.
//!
//! Follows a camera ray through at most `max_bounces` scattering events,
//! iteratively so stack depth does not grow with path length:
//!
//! 1. Intersect the scene. On a miss, add the background weighted by the
//!    running throughput and stop.
//! 2. On a hit, add the material's emission weighted by the throughput.
//! 3. If the bounce budget is spent, or the material absorbs the ray, stop.
//! 4. Multiply the throughput by the material's attenuation and continue with
//!    the scattered ray. Paths whose throughput becomes negligible stop early;
//!    long paths are thinned with Russian roulette.
//!
//! `max_bounces = 0` therefore means camera rays only: background on a miss,
//! emission on a hit.

use crate::hittable::Hittable;
use crate::sampling::{gen_f32, sample_square};
use crate::{Background, Camera, Color, Scene};
use lumen_math::{Interval, Ray};
use rand::RngCore;

/// Minimum hit distance, avoids self-intersection ("shadow acne").
pub const T_MIN: f32 = 0.001;

/// Paths whose every throughput channel is below this contribute nothing visible.
const THROUGHPUT_CUTOFF: f32 = 1e-4;

/// First bounce at which Russian roulette may terminate a path.
const ROULETTE_START_BOUNCE: u32 = 3;

/// Radiance arriving along `ray` through `world`, with `background` lighting
/// every ray that escapes.
///
/// The result is always finite and non-negative.
pub fn trace(
    ray: Ray,
    world: &dyn Hittable,
    background: &Background,
    rng: &mut dyn RngCore,
    max_bounces: u32,
) -> Color {
    let mut radiance = Color::ZERO;
    let mut throughput = Color::ONE;
    let mut ray = ray;
    let mut bounce = 0;

    loop {
        let Some(hit) = world.hit(&ray, Interval::new(T_MIN, f32::INFINITY)) else {
            radiance += throughput * background.radiance(&ray);
            break;
        };

        radiance += throughput * hit.material.emitted();

        if bounce == max_bounces {
            break;
        }

        let Some(scatter) = hit.material.scatter(&ray, &hit, rng) else {
            break;
        };

        throughput *= scatter.attenuation;
        if throughput.max_element() < THROUGHPUT_CUTOFF {
            break;
        }

        if bounce >= ROULETTE_START_BOUNCE {
            let survival = throughput.max_element().clamp(0.05, 1.0);
            if gen_f32(rng) >= survival {
                break;
            }
            throughput /= survival;
        }

        ray = scatter.ray;
        bounce += 1;
    }

    sanitize(radiance)
}

/// One jittered sample for pixel (x, y).
#[allow(clippy::too_many_arguments)]
pub fn sample_pixel(
    camera: &Camera,
    scene: &Scene,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    max_bounces: u32,
    rng: &mut dyn RngCore,
) -> Color {
    let jitter = sample_square(rng);
    let ray = camera.generate_ray(x, y, width, height, jitter);
    trace(ray, scene, scene.background(), rng, max_bounces)
}

/// Zero a degenerate sample so it cannot poison a pixel's running average.
#[inline]
pub fn sanitize(radiance: Color) -> Color {
    if radiance.is_finite() {
        radiance.max(Color::ZERO)
    } else {
        Color::ZERO
    }
}
