//! Work partitioning across the session's worker pool.
//!
//! One scheduler serves both entry points. Sequential mode walks the buckets
//! on the calling thread (low latency per progressive step); parallel mode
//! fans the same buckets out over a rayon pool built once per session. Both
//! call [`render_bucket`] with the same seeds, so they produce the same
//! image; only wall-clock time differs.

use crate::accumulation::AccumulationBuffer;
use crate::bucket::{generate_buckets, render_bucket};
use crate::error::{RenderError, RenderResult};
use crate::{Camera, Scene};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

/// How a render call spreads its work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Every bucket on the caller's thread, in order
    #[default]
    Sequential,
    /// Buckets distributed over the worker pool
    Parallel,
}

/// Everything a worker needs to trace samples for one call.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    pub camera: &'a Camera,
    pub scene: &'a Scene,
    pub samples_per_pixel: u32,
    pub max_bounces: u32,
    /// Base seed of the session
    pub seed: u64,
    /// Accumulation epoch; changes whenever accumulated state is discarded
    pub epoch: u64,
}

/// Fixed-size worker pool plus the partitioning policy.
pub struct Scheduler {
    pool: ThreadPool,
    bucket_size: u32,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.threads())
            .field("bucket_size", &self.bucket_size)
            .finish()
    }
}

impl Scheduler {
    /// Build the worker pool. Called once per session.
    pub fn new(threads: usize, bucket_size: u32) -> RenderResult<Self> {
        if threads == 0 {
            return Err(RenderError::InvalidConfig("thread count must be at least 1".into()));
        }
        if bucket_size == 0 {
            return Err(RenderError::InvalidConfig("bucket size must be at least 1".into()));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("lumen-worker-{i}"))
            .build()?;

        log::info!("Worker pool ready with {} threads", pool.current_num_threads());

        Ok(Self { pool, bucket_size })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn bucket_size(&self) -> u32 {
        self.bucket_size
    }

    /// Trace `job.samples_per_pixel` samples for every pixel of `buffer`.
    ///
    /// Blocks until every sample of the call has been merged.
    pub fn run(&self, mode: ExecutionMode, job: &RenderJob<'_>, buffer: &AccumulationBuffer) {
        let buckets = generate_buckets(buffer.width(), buffer.height(), self.bucket_size);

        match mode {
            ExecutionMode::Sequential => {
                for bucket in &buckets {
                    render_bucket(bucket, job, buffer);
                }
            }
            ExecutionMode::Parallel => self.pool.install(|| {
                buckets
                    .par_iter()
                    .for_each(|bucket| render_bucket(bucket, job, buffer));
            }),
        }
    }
}
