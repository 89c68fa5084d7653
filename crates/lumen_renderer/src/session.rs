//! Render session: the object a driver talks to.
//!
//! A session owns the scene, the camera, the accumulation buffer, the RGBA
//! frame and the worker pool. Every method takes `&self`, so one session can
//! be shared between a progressive render loop and a reader that pulls
//! snapshots while samples are still being merged.
//!
//! State machine:
//!
//! ```text
//! Created --set_camera--> Configured --render--> Accumulating
//!    |                        ^                       |
//!    +--------render----------|-------> Accumulating  |
//!                             +---clear / set_camera--+
//! ```
//!
//! `render` is additive: `render(a, b)` then `render(c, b)` gives the same
//! accumulation, bit for bit, as `render(a + c, b)` from the same cleared
//! state. `clear` and `set_camera` discard accumulated samples and start a
//! new sample-stream epoch.
//!
//! Render, clear and camera changes are mutually exclusive. Issuing one
//! while another is in flight is a usage error reported as
//! [`RenderError::RenderInProgress`]; the running call is unaffected.

use crate::accumulation::{AccumulationBuffer, Rgba8};
use crate::config::SessionConfig;
use crate::error::{checked_pixel_count, RenderError, RenderResult};
use crate::scheduler::{ExecutionMode, RenderJob, Scheduler};
use crate::{Camera, Scene};
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Default camera, nothing accumulated
    Created,
    /// Camera set by the driver, nothing accumulated since the last reset
    Configured,
    /// At least one render call since the last reset
    Accumulating,
}

/// Marks the session busy for the lifetime of a mutating call.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> RenderResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RenderError::RenderInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Read-only view of the session's RGBA8 frame.
///
/// A new frame is published at the end of every render, clear and camera
/// change. A view shares the frame that was current when it was taken and
/// keeps it alive; it never holds up the next publication.
#[derive(Debug, Clone)]
pub struct FrameView {
    pixels: Arc<[Rgba8]>,
}

impl FrameView {
    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.pixels())
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.as_bytes().as_ptr()
    }
}

impl Deref for FrameView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn alloc_frame(pixel_count: usize) -> RenderResult<Vec<Rgba8>> {
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(pixel_count)
        .map_err(|_| RenderError::Allocation { cells: pixel_count })?;
    pixels.resize(pixel_count, Rgba8::OPAQUE_BLACK);
    Ok(pixels)
}

/// A progressive render of one scene at one resolution.
pub struct RenderSession {
    width: u32,
    height: u32,
    config: SessionConfig,
    scene: Scene,
    camera: RwLock<Camera>,
    camera_configured: AtomicBool,
    buffer: AccumulationBuffer,
    /// Published frame; readers clone the `Arc`, never wait on a refresh
    frame: RwLock<Arc<[Rgba8]>>,
    /// Previously published frame, overwritten in place once no view holds it
    spare: Mutex<Option<Arc<[Rgba8]>>>,
    scheduler: Scheduler,
    /// Bumped whenever accumulated samples are discarded
    epoch: AtomicU64,
    /// Samples per pixel merged since the last reset
    samples_per_pixel: AtomicU32,
    busy: AtomicBool,
}

impl RenderSession {
    /// Create a session rendering the demo scene.
    pub fn new(width: u32, height: u32, config: SessionConfig) -> RenderResult<Self> {
        Self::with_scene(width, height, Scene::demo(), config)
    }

    /// Create a session for `scene`. Nothing is returned unless every
    /// resource (buffers and worker pool) was acquired.
    pub fn with_scene(width: u32, height: u32, scene: Scene, config: SessionConfig) -> RenderResult<Self> {
        config.validate()?;
        let pixel_count = checked_pixel_count(width, height)?;

        let buffer = AccumulationBuffer::new(width, height, config.tone_map)?;

        let frame = alloc_frame(pixel_count)?;

        let scheduler = Scheduler::new(config.resolved_threads(), config.bucket_size)?;

        log::info!(
            "Created {}x{} render session: {} primitives, {} worker threads",
            width,
            height,
            scene.len(),
            scheduler.threads()
        );

        Ok(Self {
            width,
            height,
            config,
            scene,
            camera: RwLock::new(Camera::default()),
            camera_configured: AtomicBool::new(false),
            buffer,
            frame: RwLock::new(frame.into()),
            spare: Mutex::new(None),
            scheduler,
            epoch: AtomicU64::new(0),
            samples_per_pixel: AtomicU32::new(0),
            busy: AtomicBool::new(false),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Copy of the current camera.
    pub fn camera(&self) -> Camera {
        *read(&self.camera)
    }

    pub fn threads(&self) -> usize {
        self.scheduler.threads()
    }

    /// Samples per pixel accumulated since the last clear.
    pub fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel.load(Ordering::Acquire)
    }

    /// Raw accumulation state, for inspection.
    pub fn accumulation(&self) -> &AccumulationBuffer {
        &self.buffer
    }

    pub fn state(&self) -> SessionState {
        if self.samples_per_pixel() > 0 {
            SessionState::Accumulating
        } else if self.camera_configured.load(Ordering::Acquire) {
            SessionState::Configured
        } else {
            SessionState::Created
        }
    }

    fn acquire(&self, operation: &str) -> RenderResult<BusyGuard<'_>> {
        BusyGuard::acquire(&self.busy).inspect_err(|_| {
            log::warn!("Rejected {operation}: session is busy");
        })
    }

    /// Reposition the camera and discard accumulated samples.
    ///
    /// Invalid angles are rejected before anything changes.
    pub fn set_camera(&self, x_rotation: f32, y_rotation: f32, field_of_view: f32) -> RenderResult<()> {
        let camera = Camera::new(x_rotation, y_rotation, field_of_view)?;
        let _busy = self.acquire("set_camera")?;

        *write(&self.camera) = camera;
        self.camera_configured.store(true, Ordering::Release);
        self.reset_accumulation()?;

        log::debug!(
            "Camera set to x={} y={} fov={}, accumulation cleared",
            x_rotation,
            y_rotation,
            field_of_view
        );
        Ok(())
    }

    /// Discard accumulated samples.
    pub fn clear(&self) -> RenderResult<()> {
        let _busy = self.acquire("clear")?;
        self.reset_accumulation()?;
        log::debug!("Accumulation cleared");
        Ok(())
    }

    fn reset_accumulation(&self) -> RenderResult<()> {
        self.buffer.clear();
        self.samples_per_pixel.store(0, Ordering::Release);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.refresh_frame()
    }

    /// Convert the accumulation into a new frame and publish it.
    ///
    /// The conversion runs outside the frame lock; the lock is only held to
    /// swap the `Arc`. Only called with the busy flag held, so there is a
    /// single refresher at a time.
    fn refresh_frame(&self) -> RenderResult<()> {
        let next = self.snapshot_frame(lock(&self.spare).take())?;
        let previous = std::mem::replace(&mut *write(&self.frame), next);
        *lock(&self.spare) = Some(previous);
        Ok(())
    }

    /// Fill `recycled` if no view still shares it, else a fresh allocation.
    fn snapshot_frame(&self, recycled: Option<Arc<[Rgba8]>>) -> RenderResult<Arc<[Rgba8]>> {
        if let Some(mut pixels) = recycled {
            if let Some(target) = Arc::get_mut(&mut pixels) {
                self.buffer.snapshot_into(target);
                return Ok(pixels);
            }
        }

        let mut pixels = alloc_frame(self.buffer.pixel_count())?;
        self.buffer.snapshot_into(&mut pixels);
        Ok(pixels.into())
    }

    /// Add `samples_per_pixel` samples to every pixel on the calling thread.
    ///
    /// This is the low-latency progressive step.
    pub fn render(&self, samples_per_pixel: u32, max_bounces: u32) -> RenderResult<()> {
        self.render_with(ExecutionMode::Sequential, samples_per_pixel, max_bounces)
    }

    /// Add samples to every pixel using the given execution mode.
    ///
    /// Blocks until every sample of the call is merged; a call is a barrier,
    /// so no sample of the next call starts before this one finishes.
    pub fn render_with(&self, mode: ExecutionMode, samples_per_pixel: u32, max_bounces: u32) -> RenderResult<()> {
        if samples_per_pixel == 0 {
            return Err(RenderError::InvalidSampleCount);
        }
        let _busy = self.acquire("render")?;

        let camera = self.camera();
        let job = RenderJob {
            camera: &camera,
            scene: &self.scene,
            samples_per_pixel,
            max_bounces,
            seed: self.config.seed,
            epoch: self.epoch.load(Ordering::Acquire),
        };

        let start = Instant::now();
        self.scheduler.run(mode, &job, &self.buffer);
        let total = self.samples_per_pixel.fetch_add(samples_per_pixel, Ordering::AcqRel) + samples_per_pixel;
        self.refresh_frame()?;

        log::debug!(
            "{:?} render of {} spp (max {} bounces) in {:?}, {} spp total",
            mode,
            samples_per_pixel,
            max_bounces,
            start.elapsed(),
            total
        );
        Ok(())
    }

    /// One-shot batch render at any resolution on the worker pool.
    ///
    /// Uses the session's scene, camera and seed but a private buffer, so the
    /// session's accumulation is untouched. Returns RGBA8 bytes.
    pub fn render_parallel(
        &self,
        width: u32,
        height: u32,
        samples_per_pixel: u32,
        max_bounces: u32,
    ) -> RenderResult<Vec<u8>> {
        if samples_per_pixel == 0 {
            return Err(RenderError::InvalidSampleCount);
        }
        let buffer = AccumulationBuffer::new(width, height, self.config.tone_map)?;

        let camera = self.camera();
        let job = RenderJob {
            camera: &camera,
            scene: &self.scene,
            samples_per_pixel,
            max_bounces,
            seed: self.config.seed,
            epoch: 0,
        };

        let start = Instant::now();
        self.scheduler.run(ExecutionMode::Parallel, &job, &buffer);
        log::info!(
            "Batch render {}x{} @ {} spp finished in {:?}",
            width,
            height,
            samples_per_pixel,
            start.elapsed()
        );

        Ok(buffer.snapshot_rgba())
    }

    /// Fresh RGBA8 snapshot of the accumulation, safe to call mid-render.
    pub fn get_image_so_far(&self) -> Vec<u8> {
        self.buffer.snapshot_rgba()
    }

    /// Zero-copy view of the frame as of the last completed mutating call.
    ///
    /// Never blocks on, or holds up, a render running on another thread.
    pub fn frame(&self) -> FrameView {
        FrameView {
            pixels: Arc::clone(&read(&self.frame)),
        }
    }

    /// Address of the current frame's backing storage.
    ///
    /// Valid until the next render, clear or camera change publishes a new
    /// frame. Take a [`RenderSession::frame`] view to keep the bytes alive and
    /// unchanged past that point.
    pub fn get_pointer(&self) -> *const u8 {
        read(&self.frame).as_ptr().cast::<u8>()
    }

    /// Length in bytes of the frame behind [`RenderSession::get_pointer`].
    pub fn byte_length(&self) -> usize {
        self.buffer.byte_length()
    }

    /// Write the current snapshot to disk; the format follows the extension.
    pub fn save_image(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let path = path.as_ref();
        let rgba = image::RgbaImage::from_raw(self.width, self.height, self.get_image_so_far()).ok_or(
            RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            },
        )?;
        match image::ImageFormat::from_path(path)? {
            // PNM has no alpha channel.
            image::ImageFormat::Pnm => image::DynamicImage::ImageRgba8(rgba).to_rgb8().save(path)?,
            _ => rgba.save(path)?,
        }
        log::info!("Saved {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("state", &self.state())
            .field("samples_per_pixel", &self.samples_per_pixel())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
