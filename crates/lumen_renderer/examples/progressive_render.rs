//! Progressive path tracer example.
//!
//! Drives a session the way an interactive viewer would: small render calls
//! in a loop, a snapshot after each one, then a camera change that restarts
//! accumulation. Finishes with a one-shot batch render. Set `RUST_LOG=info`
//! to see timings.

use lumen_renderer::{ExecutionMode, RenderSession, SessionConfig};
use std::time::Instant;

const WIDTH: u32 = 400;
const HEIGHT: u32 = 300;
const MAX_BOUNCES: u32 = 8;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SessionConfig::default(),
    };
    let session = RenderSession::new(WIDTH, HEIGHT, config)?;
    log::info!("{:?}", session);

    session.set_camera(10.0, 0.0, 70.0)?;
    let start = Instant::now();
    for pass in 1..=16 {
        session.render_with(ExecutionMode::Parallel, 4, MAX_BOUNCES)?;
        let rgba = session.get_image_so_far();
        log::info!(
            "Pass {:2}: {} spp, {} bytes, {:?} elapsed",
            pass,
            session.samples_per_pixel(),
            rgba.len(),
            start.elapsed()
        );
    }
    session.save_image("progressive.png")?;

    // Orbiting the camera discards everything accumulated so far.
    session.set_camera(25.0, -30.0, 60.0)?;
    assert_eq!(session.samples_per_pixel(), 0);
    session.render_with(ExecutionMode::Parallel, 32, MAX_BOUNCES)?;
    session.save_image("orbit.png")?;

    let batch = session.render_parallel(WIDTH * 2, HEIGHT * 2, 64, MAX_BOUNCES)?;
    image::save_buffer("batch.png", &batch, WIDTH * 2, HEIGHT * 2, image::ColorType::Rgba8)?;
    log::info!("Saved batch.png");

    Ok(())
}
