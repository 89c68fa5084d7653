//! Per-pixel radiance accumulation and display conversion.
//!
//! Each cell keeps a running radiance sum and the number of samples merged
//! into it. The pair sits behind its own lock, so a reader converting the
//! buffer mid-render sees every cell either before or after a merge, never
//! halfway. Writers never contend: the scheduler hands each pixel to exactly
//! one worker per call.

use crate::error::{checked_pixel_count, RenderError, RenderResult};
use crate::Color;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Display gamma applied after tone mapping.
pub const GAMMA: f32 = 2.2;

/// One 8-bit RGBA output pixel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const OPAQUE_BLACK: Rgba8 = Rgba8 {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
}

/// Running sum of radiance for one pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumCell {
    pub sum: Color,
    pub count: u32,
}

impl AccumCell {
    /// Average radiance; an empty cell is black.
    pub fn mean(&self) -> Color {
        self.sum / self.count.max(1) as f32
    }
}

/// Operator compressing linear radiance before gamma correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToneMap {
    /// Leave radiance as-is; values above 1 clip to white
    #[default]
    Clamp,
    /// c / (1 + c) per channel
    Reinhard,
}

impl ToneMap {
    pub fn apply(&self, color: Color) -> Color {
        match self {
            Self::Clamp => color,
            Self::Reinhard => color / (Color::ONE + color),
        }
    }
}

/// Apply display gamma.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.powf(1.0 / GAMMA)
    } else {
        0.0
    }
}

/// Convert a tone-mapped linear color to 8-bit RGBA with opaque alpha.
pub fn color_to_rgba(color: Color) -> Rgba8 {
    let channel = |c: f32| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)).round() as u8;
    Rgba8 {
        r: channel(color.x),
        g: channel(color.y),
        b: channel(color.z),
        a: 255,
    }
}

/// Width x height grid of accumulation cells.
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    cells: Vec<Mutex<AccumCell>>,
    tone_map: ToneMap,
}

impl std::fmt::Debug for AccumulationBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccumulationBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("tone_map", &self.tone_map)
            .finish_non_exhaustive()
    }
}

#[inline]
fn lock(cell: &Mutex<AccumCell>) -> MutexGuard<'_, AccumCell> {
    // A cell is plain data; a panic elsewhere cannot leave it half-written.
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AccumulationBuffer {
    /// Allocate a zeroed buffer.
    pub fn new(width: u32, height: u32, tone_map: ToneMap) -> RenderResult<Self> {
        let count = checked_pixel_count(width, height)?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(count)
            .map_err(|_| RenderError::Allocation { cells: count })?;
        cells.resize_with(count, || Mutex::new(AccumCell::default()));

        Ok(Self {
            width,
            height,
            cells,
            tone_map,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.cells.len()
    }

    /// Size of an RGBA8 snapshot in bytes.
    pub fn byte_length(&self) -> usize {
        self.cells.len() * 4
    }

    pub fn tone_map(&self) -> ToneMap {
        self.tone_map
    }

    /// Row-major cell index of pixel (x, y).
    ///
    /// # Panics
    ///
    /// If the pixel lies outside the buffer.
    #[inline]
    pub(crate) fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} buffer",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    /// Add one sample to pixel (x, y).
    pub(crate) fn merge_sample(&self, x: u32, y: u32, radiance: Color) {
        let mut cell = lock(&self.cells[self.index(x, y)]);
        cell.sum += radiance;
        cell.count += 1;
    }

    /// Samples merged into pixel (x, y) since the last clear. Panics if the
    /// pixel is out of bounds.
    pub fn sample_count(&self, x: u32, y: u32) -> u32 {
        lock(&self.cells[self.index(x, y)]).count
    }

    /// Consistent copy of one cell.
    pub fn cell(&self, x: u32, y: u32) -> AccumCell {
        *lock(&self.cells[self.index(x, y)])
    }

    /// Reset every cell to zero.
    pub fn clear(&self) {
        for cell in &self.cells {
            *lock(cell) = AccumCell::default();
        }
    }

    /// Convert every cell to display pixels, writing into `out`.
    ///
    /// `out` always comes from a buffer sized with [`Self::pixel_count`].
    pub(crate) fn snapshot_into(&self, out: &mut [Rgba8]) {
        assert_eq!(out.len(), self.cells.len(), "snapshot target has wrong size");
        for (pixel, cell) in out.iter_mut().zip(&self.cells) {
            let mean = lock(cell).mean();
            *pixel = color_to_rgba(self.tone_map.apply(mean));
        }
    }

    /// RGBA8 snapshot, `width * height * 4` bytes.
    pub fn snapshot_rgba(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.byte_length()];
        self.snapshot_into(bytemuck::cast_slice_mut(&mut bytes));
        bytes
    }
}
