//! Viewer configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for one viewer session.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// `ws://` or `wss://` URL of the relay.
    pub url: String,
    /// Secret presented in `authenticate`.
    pub secret: String,
    /// Where to write the most recent frame, if anywhere.
    pub save_frame: Option<PathBuf>,
    /// How often frame statistics are logged.
    pub stats_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000".to_string(),
            secret: String::new(),
            save_frame: None,
            stats_interval: Duration::from_secs(5),
        }
    }
}

impl ViewerConfig {
    /// Checks the values a session cannot start without.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(format!(
                "relay url must start with ws:// or wss://, got {:?}",
                self.url
            ));
        }
        if self.secret.is_empty() {
            return Err("viewer secret is empty".into());
        }
        if self.stats_interval.is_zero() {
            return Err("stats interval must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ViewerConfig {
        ViewerConfig {
            secret: "s".into(),
            ..ViewerConfig::default()
        }
    }

    #[test]
    fn test_default_with_secret_is_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_http_url_is_rejected() {
        let cfg = ViewerConfig {
            url: "http://relay:5000".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(ViewerConfig::default().validate().is_err());
    }
}
