//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings. The
//! binary fills it from CLI arguments and environment variables; tests build
//! it directly.

use std::net::SocketAddr;
use std::time::Duration;

use relay_core::domain::throttle::min_interval_for_fps;
use thiserror::Error;

/// Failed-authentication limit per connection before the relay disconnects it.
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 3;

/// Errors raised by [`RelayConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("target secret must not be empty")]
    EmptyTargetSecret,
    #[error("viewer secret must not be empty")]
    EmptyViewerSecret,
    #[error("control queue capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("idle timeout ({idle:?}) must be longer than the ping interval ({ping:?})")]
    TimeoutNotAbovePing { idle: Duration, ping: Duration },
}

/// All runtime configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Token a target must present in `register`.
    pub target_secret: String,

    /// Secret a viewer must present in `authenticate`.
    pub viewer_secret: String,

    /// Maximum frame broadcast rate. `0` disables throttling.
    pub target_fps: u32,

    /// Control messages buffered per connection before new ones are dropped.
    pub control_queue_capacity: usize,

    /// Failed `authenticate` attempts allowed before the connection is closed.
    pub max_auth_attempts: u32,

    /// How often the relay sends a WebSocket ping to each participant.
    pub ping_interval: Duration,

    /// A connection that sends nothing (not even a pong) for this long is closed.
    pub idle_timeout: Duration,
}

impl RelayConfig {
    /// Minimum spacing between two broadcast frames.
    pub fn min_frame_interval(&self) -> Duration {
        min_interval_for_fps(self.target_fps)
    }

    /// Checks invariants the CLI parser cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_secret.is_empty() {
            return Err(ConfigError::EmptyTargetSecret);
        }
        if self.viewer_secret.is_empty() {
            return Err(ConfigError::EmptyViewerSecret);
        }
        if self.control_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.idle_timeout <= self.ping_interval {
            return Err(ConfigError::TimeoutNotAbovePing {
                idle: self.idle_timeout,
                ping: self.ping_interval,
            });
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    /// | Field                   | Default        |
    /// |-------------------------|----------------|
    /// | bind_addr               | `0.0.0.0:5000` |
    /// | target_secret           | empty          |
    /// | viewer_secret           | empty          |
    /// | target_fps              | 10             |
    /// | control_queue_capacity  | 64             |
    /// | max_auth_attempts       | 3              |
    /// | ping_interval           | 30 seconds     |
    /// | idle_timeout            | 90 seconds     |
    ///
    /// The secrets are left empty so a default config never validates by
    /// accident.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            target_secret: String::new(),
            viewer_secret: String::new(),
            target_fps: 10,
            control_queue_capacity: 64,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RelayConfig {
        RelayConfig {
            target_secret: "t".to_string(),
            viewer_secret: "v".to_string(),
            ..RelayConfig::default()
        }
    }

    #[test]
    fn test_default_port_is_5000() {
        // Arrange / Act
        let cfg = RelayConfig::default();
        // Assert
        assert_eq!(cfg.bind_addr.port(), 5000);
    }

    #[test]
    fn test_default_config_does_not_validate() {
        assert_eq!(
            RelayConfig::default().validate(),
            Err(ConfigError::EmptyTargetSecret)
        );
    }

    #[test]
    fn test_config_with_secrets_validates() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_empty_viewer_secret_is_rejected() {
        let cfg = RelayConfig {
            viewer_secret: String::new(),
            ..valid()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyViewerSecret));
    }

    #[test]
    fn test_zero_queue_capacity_is_rejected() {
        let cfg = RelayConfig {
            control_queue_capacity: 0,
            ..valid()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroQueueCapacity));
    }

    #[test]
    fn test_idle_timeout_must_exceed_ping_interval() {
        let cfg = RelayConfig {
            ping_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(10),
            ..valid()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::TimeoutNotAbovePing { .. })
        ));
    }

    #[test]
    fn test_min_frame_interval_follows_fps() {
        let cfg = RelayConfig {
            target_fps: 5,
            ..valid()
        };
        assert_eq!(cfg.min_frame_interval(), Duration::from_millis(200));
    }
}
