//! Bucket-based tile partitioning.
//!
//! Divides the image into tiles (buckets) that are rendered independently.
//! The buckets of one image are a true partition of its pixels: every pixel
//! belongs to exactly one bucket, which is what lets workers write the
//! accumulation buffer without coordinating.

use crate::accumulation::AccumulationBuffer;
use crate::integrator::sample_pixel;
use crate::sampling::sample_rng;
use crate::scheduler::RenderJob;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    /// Width of the bucket in pixels
    pub width: u32,
    /// Height of the bucket in pixels
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    /// Create a new bucket.
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Global pixel coordinates in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Default bucket size in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 16;

/// Generate buckets for an image, sorted in spiral order from center.
///
/// Buckets near the centre come first, so a partially finished progressive
/// frame shows the middle of the image early.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    debug_assert!(bucket_size > 0);
    let mut buckets = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from image center.
///
/// The sort is stable, so equidistant buckets keep their row-major order.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;

    let distance = |b: &Bucket| {
        let bx = b.x as f32 + b.width as f32 / 2.0;
        let by = b.y as f32 + b.height as f32 / 2.0;
        (bx - center_x).powi(2) + (by - center_y).powi(2)
    };

    buckets.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// Trace `job.samples_per_pixel` new samples for every pixel of a bucket and
/// merge them into `buffer`.
///
/// A sample's seed comes from its pixel and its index in that pixel's
/// running count, so the result does not depend on which thread runs the
/// bucket or how samples were split across calls.
pub fn render_bucket(bucket: &Bucket, job: &RenderJob<'_>, buffer: &AccumulationBuffer) {
    log::trace!(
        "bucket {} at ({}, {}) {}x{}",
        bucket.index,
        bucket.x,
        bucket.y,
        bucket.width,
        bucket.height
    );

    for (x, y) in bucket.pixels() {
        let pixel_index = buffer.index(x, y) as u64;
        let first_sample = buffer.sample_count(x, y);

        for i in 0..job.samples_per_pixel {
            let sample_index = u64::from(first_sample) + u64::from(i);
            let mut rng = sample_rng(job.seed, job.epoch, pixel_index, sample_index);
            let radiance = sample_pixel(
                job.camera,
                job.scene,
                x,
                y,
                buffer.width(),
                buffer.height(),
                job.max_bounces,
                &mut rng,
            );
            buffer.merge_sample(x, y, radiance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_partition(width: u32, height: u32, bucket_size: u32) {
        let buckets = generate_buckets(width, height, bucket_size);
        let mut seen = HashSet::new();
        for bucket in &buckets {
            for pixel in bucket.pixels() {
                assert!(pixel.0 < width && pixel.1 < height);
                assert!(seen.insert(pixel), "pixel {pixel:?} in two buckets");
            }
        }
        assert_eq!(seen.len(), (width * height) as usize);
    }

    #[test]
    fn test_generate_buckets_exact_fit() {
        let buckets = generate_buckets(128, 128, 64);
        assert_eq!(buckets.len(), 4); // 2x2 grid

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 128 * 128);
    }

    #[test]
    fn test_generate_buckets_partial_fit() {
        let buckets = generate_buckets(100, 37, 16);
        assert_eq!(buckets.len(), 7 * 3);

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 100 * 37);
    }

    #[test]
    fn test_buckets_partition_pixels() {
        assert_partition(4, 4, 16);
        assert_partition(33, 17, 8);
        assert_partition(1, 9, 2);
    }

    #[test]
    fn test_spiral_order() {
        let buckets = generate_buckets(192, 192, 64);
        assert_eq!(buckets.len(), 9); // 3x3 grid

        // First bucket should be the center one
        assert_eq!((buckets[0].x, buckets[0].y), (64, 64));
        // Indices follow render order
        assert!(buckets.iter().enumerate().all(|(i, b)| b.index == i));
    }

    #[test]
    fn test_bucket_pixels_row_major() {
        let bucket = Bucket::new(2, 3, 2, 2, 0);
        let pixels: Vec<_> = bucket.pixels().collect();
        assert_eq!(pixels, vec![(2, 3), (3, 3), (2, 4), (3, 4)]);
    }
}
