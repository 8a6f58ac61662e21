//! Fixed-interval frame pump.

use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Timing collected over a [`FrameDriver::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub total: Duration,
    pub slowest: Duration,
}

impl FrameStats {
    fn record(&mut self, elapsed: Duration) {
        self.frames += 1;
        self.total += elapsed;
        self.slowest = self.slowest.max(elapsed);
    }

    /// Mean time spent inside the frame callback.
    pub fn mean(&self) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        self.total.div_f64(self.frames as f64)
    }
}

/// Invokes a frame callback every `interval`, like a render timer.
///
/// A frame that overruns its slot starts the next one immediately; missed
/// ticks are not replayed.
#[derive(Debug, Clone, Copy)]
pub struct FrameDriver {
    interval: Duration,
    frames: u64,
}

impl FrameDriver {
    pub fn new(interval: Duration, frames: u64) -> Self {
        Self { interval, frames }
    }

    /// Run `frame` once per tick with the frame index. Stops on the first error.
    pub fn run<E>(&self, mut frame: impl FnMut(u64) -> Result<(), E>) -> Result<FrameStats, E> {
        let mut stats = FrameStats::default();
        let mut deadline = Instant::now();

        for index in 0..self.frames {
            let start = Instant::now();
            frame(index)?;
            let elapsed = start.elapsed();
            stats.record(elapsed);
            debug!("Frame {} took {:?}", index, elapsed);

            if index + 1 == self.frames {
                break;
            }
            deadline += self.interval;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }

        Ok(stats)
    }
}
