//! Drop-not-queue frame throttle.
//!
//! The relay forwards at most one frame per `min_interval`. A frame that
//! arrives sooner than `min_interval` after the previous *broadcast* is
//! discarded outright; it is never held back and sent later. The throttle
//! therefore never delays a frame, it only thins the stream, and the next
//! frame after the interval elapses is always admitted.
//!
//! Time is passed in by the caller so the policy can be tested without
//! sleeping.

use std::time::{Duration, Instant};

/// Outcome of offering one frame to the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Broadcast,
    Drop,
}

/// Rate limiter for frame broadcast.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    min_interval: Duration,
    last_broadcast: Option<Instant>,
    broadcast_count: u64,
    dropped_count: u64,
}

impl FrameThrottle {
    /// Creates a throttle that admits at most one frame per `min_interval`.
    ///
    /// A zero interval admits every frame.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_broadcast: None,
            broadcast_count: 0,
            dropped_count: 0,
        }
    }

    /// Creates a throttle for a target rate of `fps` frames per second.
    ///
    /// `fps == 0` disables throttling.
    pub fn from_fps(fps: u32) -> Self {
        Self::new(min_interval_for_fps(fps))
    }

    /// Offers a frame that arrived at `now`.
    pub fn admit(&mut self, now: Instant) -> ThrottleDecision {
        if let Some(last) = self.last_broadcast {
            if now.saturating_duration_since(last) < self.min_interval {
                self.dropped_count += 1;
                return ThrottleDecision::Drop;
            }
        }
        self.last_broadcast = Some(now);
        self.broadcast_count += 1;
        ThrottleDecision::Broadcast
    }

    /// Forgets the last broadcast so the next frame is admitted immediately.
    ///
    /// Called when the slot changes hands so a new target's first frame is
    /// not dropped because of the previous target's timing.
    pub fn reset(&mut self) {
        self.last_broadcast = None;
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of frames admitted since creation.
    pub fn broadcast_count(&self) -> u64 {
        self.broadcast_count
    }

    /// Number of frames dropped since creation.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }
}

/// Converts a frame rate into the minimum spacing between broadcasts.
pub fn min_interval_for_fps(fps: u32) -> Duration {
    if fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(1.0 / f64::from(fps))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_frame_is_always_broadcast() {
        // Arrange
        let mut throttle = FrameThrottle::new(ms(100));

        // Act / Assert
        assert_eq!(throttle.admit(Instant::now()), ThrottleDecision::Broadcast);
    }

    #[test]
    fn test_frame_inside_interval_is_dropped() {
        // Arrange
        let mut throttle = FrameThrottle::new(ms(100));
        let t0 = Instant::now();
        throttle.admit(t0);

        // Act
        let decision = throttle.admit(t0 + ms(99));

        // Assert
        assert_eq!(decision, ThrottleDecision::Drop);
        assert_eq!(throttle.dropped_count(), 1);
    }

    #[test]
    fn test_frame_exactly_at_interval_is_broadcast() {
        let mut throttle = FrameThrottle::new(ms(100));
        let t0 = Instant::now();
        throttle.admit(t0);
        assert_eq!(throttle.admit(t0 + ms(100)), ThrottleDecision::Broadcast);
    }

    #[test]
    fn test_dropped_frames_do_not_move_the_window() {
        // Arrange: broadcast at t0, drops at 60 and 90 must not push the next
        // admission past t0 + 100.
        let mut throttle = FrameThrottle::new(ms(100));
        let t0 = Instant::now();
        throttle.admit(t0);
        throttle.admit(t0 + ms(60));
        throttle.admit(t0 + ms(90));

        // Act
        let decision = throttle.admit(t0 + ms(101));

        // Assert
        assert_eq!(decision, ThrottleDecision::Broadcast);
    }

    #[test]
    fn test_thirty_fps_input_at_ten_fps_limit_yields_ten_per_second() {
        // Arrange: 30 frames/s for one second (frames at 0, 33.3, 66.6, ... ms)
        let mut throttle = FrameThrottle::from_fps(10);
        let t0 = Instant::now();
        let mut broadcast_times = Vec::new();

        // Act
        for i in 0..30u64 {
            let now = t0 + Duration::from_micros(i * 33_334);
            if throttle.admit(now) == ThrottleDecision::Broadcast {
                broadcast_times.push(now);
            }
        }

        // Assert: never above 10, spacing never below the interval
        assert!(broadcast_times.len() <= 10, "got {}", broadcast_times.len());
        assert!(broadcast_times.len() >= 8, "got {}", broadcast_times.len());
        for pair in broadcast_times.windows(2) {
            assert!(pair[1] - pair[0] >= throttle.min_interval());
        }
        assert_eq!(
            throttle.broadcast_count() + throttle.dropped_count(),
            30,
            "every frame is either broadcast or dropped"
        );
    }

    #[test]
    fn test_reset_admits_next_frame_immediately() {
        let mut throttle = FrameThrottle::new(ms(100));
        let t0 = Instant::now();
        throttle.admit(t0);
        throttle.reset();
        assert_eq!(throttle.admit(t0 + ms(1)), ThrottleDecision::Broadcast);
    }

    #[test]
    fn test_zero_fps_disables_throttling() {
        let mut throttle = FrameThrottle::from_fps(0);
        let t0 = Instant::now();
        assert_eq!(throttle.admit(t0), ThrottleDecision::Broadcast);
        assert_eq!(throttle.admit(t0), ThrottleDecision::Broadcast);
    }

    #[test]
    fn test_min_interval_for_fps_ten_is_100ms() {
        assert_eq!(min_interval_for_fps(10), ms(100));
    }
}
