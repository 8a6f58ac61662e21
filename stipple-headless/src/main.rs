//! Stipple Headless
//!
//! Reference driver for the batched point store: generates (or loads) a large
//! point cloud, adds it to a [`PointCloudStore`], commits once, then renders a
//! fixed number of frames offscreen at a fixed interval.

mod camera;
mod config;
mod driver;
mod offscreen;
mod source;

use clap::Parser;
use config::{Args, BackendKind, init_logging};
use driver::{FrameDriver, FrameStats};
use offscreen::OffscreenTarget;
use source::{FeedMode, PointSource};
use std::error::Error;
use std::time::Instant;
use stipple_gpu::cloud::{CountingBackend, CountingScene};
use stipple_gpu::{
    BatchBackend, LayerConfig, PointCloudStore, RenderContext, Renderer, StoreConfig,
    WgpuBatchBackend, wgpu,
};
use tracing::info;

fn main() {
    let args = Args::parse();
    init_logging(&args.logging());

    if let Err(e) = run(&args) {
        eprintln!("stipple-headless error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let source = PointSource::from_args(args)?;
    let config = StoreConfig::default().with_batch_capacity(args.capacity);
    info!(
        "Feeding {} points in batches of {} ({:?})",
        source.len(),
        config.batch_capacity,
        FeedMode::from_args(args)
    );

    match args.backend {
        BackendKind::Wgpu => run_wgpu(args, &source, config),
        BackendKind::Counting => run_counting(args, &source, config),
    }
}

/// Feed and commit, logging how long each phase took.
fn populate<B: BatchBackend>(
    store: &mut PointCloudStore<B>,
    source: &PointSource,
    mode: FeedMode,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let added = source.feed(store, mode)?;
    info!(
        "Added {} points into {} batches in {:?}",
        added,
        store.batch_count(),
        start.elapsed()
    );

    let start = Instant::now();
    let report = store.commit()?;
    info!(
        "Committed {} batches ({} points) in {:?}",
        report.batches,
        report.points,
        start.elapsed()
    );
    Ok(())
}

fn log_frames(stats: &FrameStats) {
    info!(
        "Rendered {} frames: mean {:?}, slowest {:?}",
        stats.frames,
        stats.mean(),
        stats.slowest
    );
}

fn run_wgpu(args: &Args, source: &PointSource, config: StoreConfig) -> Result<(), Box<dyn Error>> {
    let renderer = pollster::block_on(Renderer::new())?;
    let layer_config = LayerConfig::default();
    let mut backend = WgpuBatchBackend::new(&renderer);
    let layer = backend.create_layer(layer_config)?;
    let mut store = PointCloudStore::new(config, backend, layer)?;

    populate(&mut store, source, FeedMode::from_args(args))?;

    let target = OffscreenTarget::new(
        store.backend().device(),
        args.width,
        args.height,
        layer_config.color_format,
    )?;
    let camera = camera::framing(&source.bounds(), target.aspect());
    let backend = store.backend();
    store
        .scene()
        .update_camera(backend.queue(), backend.registry(), &camera)?;
    info!(
        "Drawing {} batches into {:?} target",
        store.scene().batch_count(),
        target.size()
    );

    let stats = FrameDriver::new(args.interval(), args.frames).run(|frame| {
        let backend = store.backend();
        let mut encoder = backend
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        store.scene().render(
            &mut encoder,
            RenderContext {
                color_view: target.view(),
            },
            backend.registry(),
        )?;
        backend.queue().submit(Some(encoder.finish()));
        tracing::trace!("Submitted frame {}", frame);
        Ok::<_, Box<dyn Error>>(())
    })?;
    log_frames(&stats);

    Ok(())
}

fn run_counting(
    args: &Args,
    source: &PointSource,
    config: StoreConfig,
) -> Result<(), Box<dyn Error>> {
    let mut store = PointCloudStore::new(config, CountingBackend::new(), CountingScene::default())?;

    populate(&mut store, source, FeedMode::from_args(args))?;

    // Each frame re-commits; with nothing added it must touch no batch
    let stats = FrameDriver::new(args.interval(), args.frames).run(|_| {
        store.commit()?;
        Ok::<_, Box<dyn Error>>(())
    })?;
    log_frames(&stats);

    let backend = store.backend().stats();
    info!(
        "Backend calls: {} created, {} attached, {} uploads ({} points); {} visible",
        backend.created,
        backend.attached,
        backend.uploads,
        backend.uploaded_points,
        store.scene().visible_points()
    );

    Ok(())
}
