//! Lumen - progressive, parallel CPU path tracing.
//!
//! A Monte Carlo path tracer built for an incremental display loop: a
//! [`RenderSession`] accumulates samples per pixel across many small
//! `render` calls (or one large batch) and converts the running average to
//! RGBA8 on demand, including while workers are still merging samples.
//!
//! ```no_run
//! use lumen_renderer::{RenderSession, SessionConfig};
//!
//! let session = RenderSession::new(300, 300, SessionConfig::default())?;
//! session.set_camera(0.0, 15.0, 70.0)?;
//! for _ in 0..100 {
//!     session.render(1, 5)?;
//!     let _rgba = session.get_image_so_far();
//! }
//! # Ok::<(), lumen_renderer::RenderError>(())
//! ```

mod accumulation;
mod bucket;
mod camera;
mod config;
mod error;
mod hittable;
mod integrator;
mod material;
mod sampling;
mod scene;
mod scheduler;
mod session;
mod sphere;

pub use accumulation::{
    color_to_rgba, linear_to_gamma, AccumCell, AccumulationBuffer, Rgba8, ToneMap, GAMMA,
};
pub use bucket::{generate_buckets, render_bucket, Bucket, DEFAULT_BUCKET_SIZE};
pub use camera::{Camera, CameraBasis, CameraSettings, ORBIT_DISTANCE, ORBIT_PIVOT};
pub use config::{SessionConfig, DEFAULT_SEED};
pub use error::{RenderError, RenderResult};
pub use hittable::{Hit, Hittable};
pub use integrator::{sample_pixel, sanitize, trace, T_MIN};
pub use material::{Color, Material, Scatter};
pub use sampling::{sample_rng, sample_seed};
pub use scene::{Background, Scene};
pub use scheduler::{ExecutionMode, RenderJob, Scheduler};
pub use session::{FrameView, RenderSession, SessionState};
pub use sphere::Sphere;

/// Re-export common math types from lumen_math
pub use lumen_math::{Interval, Ray, Vec2, Vec3};
