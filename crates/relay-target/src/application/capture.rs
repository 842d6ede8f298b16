//! Capture loop: grabs frames at a fixed cadence and hands them to a sink.
//!
//! Grabbing and JPEG encoding block, so each capture runs on the blocking
//! thread pool. Failures never end the loop: a failed grab waits
//! `error_backoff`, a failed send (usually "not connected") waits
//! `send_backoff`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Error type for frame capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No capture backend on this platform or the monitor does not exist.
    #[error("capture unavailable: {0}")]
    Unavailable(String),

    /// The OS failed to produce pixels.
    #[error("screen grab failed: {0}")]
    Grab(String),

    /// Pixels could not be compressed.
    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Error type for frame delivery.
#[derive(Debug, Error)]
pub enum SinkError {
    /// No registered relay connection; the frame was dropped.
    #[error("not connected to the relay")]
    NotConnected,

    /// The connection failed while sending.
    #[error("frame delivery failed: {0}")]
    Delivery(String),
}

/// Produces compressed frames of one monitor.
pub trait FrameSource: Send {
    /// Grabs the monitor and returns JPEG bytes.
    fn capture(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Top-left corner of the captured monitor on the virtual desktop.
    fn origin(&self) -> (i32, i32) {
        (0, 0)
    }
}

/// Receives captured frames.
///
/// The relay client implements this; tests use a recording sink.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), SinkError>;
}

/// Cadence and backoff for [`run_capture_loop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub fps: u32,
    pub error_backoff: Duration,
    pub send_backoff: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            fps: 7,
            error_backoff: Duration::from_millis(100),
            send_backoff: Duration::from_secs(1),
        }
    }
}

impl CaptureSettings {
    fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

/// Captures and sends frames until `running` is cleared.
pub async fn run_capture_loop(
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    sink: Arc<dyn FrameSink>,
    settings: CaptureSettings,
    running: Arc<AtomicBool>,
) {
    info!("capture loop started at {} fps", settings.fps);
    let mut ticker = time::interval(settings.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;

        let grab = Arc::clone(&source);
        let captured = tokio::task::spawn_blocking(move || {
            grab.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .capture()
        })
        .await;

        let frame = match captured {
            Ok(Ok(frame)) if frame.is_empty() => {
                debug!("capture produced an empty frame; skipping");
                continue;
            }
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!("capture failed: {e}");
                time::sleep(settings.error_backoff).await;
                continue;
            }
            Err(e) => {
                error!("capture task panicked: {e}");
                break;
            }
        };

        if let Err(e) = sink.send_frame(frame).await {
            debug!("frame not sent: {e}");
            time::sleep(settings.send_backoff).await;
        }
    }
    info!("capture loop stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
