//! Frame counting for the viewer's periodic status line.

use std::time::{Duration, Instant};

/// Running totals plus a rate over the current reporting window.
#[derive(Debug, Clone)]
pub struct FrameStats {
    total: u64,
    total_bytes: u64,
    last_size: usize,
    window_start: Instant,
    window_frames: u64,
}

/// One reporting window, returned by [`FrameStats::take_window`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    pub frames: u64,
    pub elapsed: Duration,
    pub fps: f64,
    pub total: u64,
    pub last_size: usize,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            total: 0,
            total_bytes: 0,
            last_size: 0,
            window_start: now,
            window_frames: 0,
        }
    }

    pub fn record(&mut self, size: usize) {
        self.total += 1;
        self.total_bytes += size as u64;
        self.last_size = size;
        self.window_frames += 1;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Closes the current window at `now` and starts the next one.
    pub fn take_window(&mut self, now: Instant) -> WindowReport {
        let elapsed = now.saturating_duration_since(self.window_start);
        let secs = elapsed.as_secs_f64();
        let fps = if secs > 0.0 {
            self.window_frames as f64 / secs
        } else {
            0.0
        };
        let report = WindowReport {
            frames: self.window_frames,
            elapsed,
            fps,
            total: self.total,
            last_size: self.last_size,
        };
        self.window_start = now;
        self.window_frames = 0;
        report
    }
}
