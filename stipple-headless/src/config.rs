//! Command line and logging configuration.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Stipple - streams a large point cloud into batched GPU buffers and renders it offscreen
#[derive(Parser, Debug)]
#[command(name = "stipple-headless")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PLY file to load instead of the generated grid
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Points per row and column of the generated grid
    #[arg(long, default_value_t = 1000)]
    pub grid: u32,

    /// Grids stacked along z
    #[arg(long, default_value_t = 10)]
    pub layers: u32,

    /// Points per batch
    #[arg(short, long, default_value_t = stipple_gpu::cloud::DEFAULT_BATCH_CAPACITY)]
    pub capacity: usize,

    /// Feed points with bulk adds of this many points instead of one at a time
    #[arg(long)]
    pub bulk: Option<usize>,

    /// Where batches are materialized
    #[arg(short, long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,

    /// Frames to render; 0 renders none
    #[arg(long, default_value_t = 10)]
    pub frames: u64,

    /// Milliseconds between frames
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Send spans to Tracy (requires the `tracy` feature)
    #[arg(long)]
    pub tracy: bool,
}

impl Args {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            enable_tracy: self.tracy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Upload batches to GPU vertex buffers
    Wgpu,
    /// Only count backend calls; no GPU needed
    Counting,
}

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
    pub enable_tracy: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_tracy: false,
        }
    }
}

pub fn init_logging(logging: &LoggingConfig) {
    #[cfg(feature = "tracy")]
    {
        if logging.enable_tracy {
            use tracing_subscriber::Layer;
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;
            tracing_subscriber::registry()
                .with(tracing_tracy::TracyLayer::default())
                .with(
                    tracing_subscriber::fmt::layer().with_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| logging.level.clone().into()),
                    ),
                )
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        )
        .with_target(false)
        .init();
}
