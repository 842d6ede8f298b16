//! TOML configuration for the target agent.
//!
//! Read from `--config <path>` or the platform config file:
//! - Windows:  `%APPDATA%\ScreenRelay\target.toml`
//! - Linux:    `~/.config/screen-relay/target.toml`
//! - macOS:    `~/Library/Application Support/ScreenRelay/target.toml`
//!
//! A missing file yields [`AgentConfig::default()`]; missing fields take
//! their defaults, so a file only needs the values it changes:
//!
//! ```toml
//! [relay]
//! url = "ws://relay.example:5000"
//! token = "s3cret"
//!
//! [capture]
//! fps = 7
//! jpeg_quality = 65
//! monitor_index = 1
//!
//! [typing]
//! mistake_probability = 0.025
//! backspace_pause_ms = [150, 400]
//! ```
//!
//! Environment variables override the file: `REMOTE_SERVER_URL`,
//! `REMOTE_ACCESS_PASSWORD`, `CLIENT_TARGET_FPS`, `JPEG_QUALITY` and
//! `CAPTURE_MONITOR_INDEX`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::capture::CaptureSettings;
use crate::application::typing::{PauseRange, TypingConfig};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An environment override did not parse.
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub typing: TypingSection,
}

/// Where and how to reach the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelaySection {
    /// WebSocket URL of the relay.
    #[serde(default = "default_url")]
    pub url: String,
    /// Token presented in `register`.
    #[serde(default)]
    pub token: String,
    /// Delay before reconnecting after the connection drops.
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_interval_secs: u64,
}

/// Screen capture cadence and quality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureSection {
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// JPEG quality, 1-100.
    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,
    /// 0 = whole desktop, 1 = primary monitor, 2.. = other monitors.
    #[serde(default = "default_monitor_index")]
    pub monitor_index: usize,
}

/// Typing engine timing, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypingSection {
    #[serde(default = "default_mistake_probability")]
    pub mistake_probability: f64,
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_interval_variation_ms")]
    pub interval_variation_ms: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_backspace_pause_ms")]
    pub backspace_pause_ms: [u64; 2],
    #[serde(default = "default_correction_pause_ms")]
    pub correction_pause_ms: [u64; 2],
    #[serde(default = "default_insertion_pause_ms")]
    pub insertion_pause_ms: [u64; 2],
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_url() -> String {
    "ws://localhost:5000".to_string()
}
fn default_reconnect_secs() -> u64 {
    5
}
fn default_fps() -> u32 {
    7
}
fn default_quality() -> u8 {
    65
}
fn default_monitor_index() -> usize {
    1
}
fn default_mistake_probability() -> f64 {
    0.025
}
fn default_base_interval_ms() -> u64 {
    120
}
fn default_interval_variation_ms() -> u64 {
    60
}
fn default_min_interval_ms() -> u64 {
    20
}
fn default_backspace_pause_ms() -> [u64; 2] {
    [150, 400]
}
fn default_correction_pause_ms() -> [u64; 2] {
    [100, 300]
}
fn default_insertion_pause_ms() -> [u64; 2] {
    [10, 50]
}
fn default_pause_poll_ms() -> u64 {
    100
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: String::new(),
            reconnect_interval_secs: default_reconnect_secs(),
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            jpeg_quality: default_quality(),
            monitor_index: default_monitor_index(),
        }
    }
}

impl Default for TypingSection {
    fn default() -> Self {
        Self {
            mistake_probability: default_mistake_probability(),
            base_interval_ms: default_base_interval_ms(),
            interval_variation_ms: default_interval_variation_ms(),
            min_interval_ms: default_min_interval_ms(),
            backspace_pause_ms: default_backspace_pause_ms(),
            correction_pause_ms: default_correction_pause_ms(),
            insertion_pause_ms: default_insertion_pause_ms(),
            pause_poll_ms: default_pause_poll_ms(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

fn range([min, max]: [u64; 2]) -> PauseRange {
    PauseRange::from_millis(min, max)
}

impl TypingSection {
    pub fn to_typing_config(&self) -> TypingConfig {
        TypingConfig {
            mistake_probability: self.mistake_probability,
            base_interval: Duration::from_millis(self.base_interval_ms),
            interval_variation: Duration::from_millis(self.interval_variation_ms),
            min_interval: Duration::from_millis(self.min_interval_ms),
            backspace_pause: range(self.backspace_pause_ms),
            correction_pause: range(self.correction_pause_ms),
            insertion_pause: range(self.insertion_pause_ms),
            pause_poll: Duration::from_millis(self.pause_poll_ms),
        }
    }
}

impl CaptureSection {
    pub fn to_settings(&self) -> CaptureSettings {
        CaptureSettings {
            fps: self.fps,
            ..CaptureSettings::default()
        }
    }
}

impl RelaySection {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }
}

impl AgentConfig {
    /// Applies environment overrides through `lookup`, normally
    /// `|name| std::env::var(name).ok()`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] when a numeric variable does not
    /// parse.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = lookup("REMOTE_SERVER_URL") {
            self.relay.url = url;
        }
        if let Some(token) = lookup("REMOTE_ACCESS_PASSWORD") {
            self.relay.token = token;
        }
        if let Some(v) = lookup("CLIENT_TARGET_FPS") {
            self.capture.fps = parse_env("CLIENT_TARGET_FPS", v)?;
        }
        if let Some(v) = lookup("JPEG_QUALITY") {
            self.capture.jpeg_quality = parse_env("JPEG_QUALITY", v)?;
        }
        if let Some(v) = lookup("CAPTURE_MONITOR_INDEX") {
            self.capture.monitor_index = parse_env("CAPTURE_MONITOR_INDEX", v)?;
        }
        Ok(())
    }

    /// Checks ranges that would otherwise fail at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.relay.url.starts_with("ws://") || self.relay.url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "relay url must start with ws:// or wss://, got {:?}",
                self.relay.url
            )));
        }
        if self.relay.token.is_empty() {
            return Err(ConfigError::Invalid("relay token is empty".into()));
        }
        if self.capture.fps == 0 {
            return Err(ConfigError::Invalid("capture fps must be at least 1".into()));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg quality must be 1-100, got {}",
                self.capture.jpeg_quality
            )));
        }
        if !(0.0..=1.0).contains(&self.typing.mistake_probability) {
            return Err(ConfigError::Invalid(format!(
                "mistake probability must be 0-1, got {}",
                self.typing.mistake_probability
            )));
        }
        for (name, [min, max]) in [
            ("backspace_pause_ms", self.typing.backspace_pause_ms),
            ("correction_pause_ms", self.typing.correction_pause_ms),
            ("insertion_pause_ms", self.typing.insertion_pause_ms),
        ] {
            if min > max {
                return Err(ConfigError::Invalid(format!("{name}: {min} > {max}")));
            }
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("target.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config at `path`, returning defaults when the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AgentConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AgentConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ScreenRelay"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("screen-relay"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ScreenRelay")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn valid() -> AgentConfig {
        let mut cfg = AgentConfig::default();
        cfg.relay.token = "t".into();
        cfg
    }

    #[test]
    fn test_defaults_match_agent_behaviour() {
        // Arrange / Act
        let cfg = AgentConfig::default();

        // Assert
        assert_eq!(cfg.capture.fps, 7);
        assert_eq!(cfg.capture.jpeg_quality, 65);
        assert_eq!(cfg.capture.monitor_index, 1);
        assert_eq!(cfg.relay.reconnect_interval(), Duration::from_secs(5));
        assert_eq!(cfg.typing.to_typing_config(), TypingConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        // Arrange
        let text = r#"
            [relay]
            token = "abc"

            [typing]
            mistake_probability = 0.1
            backspace_pause_ms = [50, 60]
        "#;

        // Act
        let cfg: AgentConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.relay.token, "abc");
        assert_eq!(cfg.relay.url, "ws://localhost:5000");
        assert_eq!(cfg.capture, CaptureSection::default());
        let typing = cfg.typing.to_typing_config();
        assert_eq!(typing.mistake_probability, 0.1);
        assert_eq!(typing.backspace_pause, PauseRange::from_millis(50, 60));
        assert_eq!(typing.base_interval, Duration::from_millis(120));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut cfg = valid();
        cfg.apply_env(env(&[
            ("REMOTE_SERVER_URL", "wss://relay:443"),
            ("REMOTE_ACCESS_PASSWORD", "pw"),
            ("CLIENT_TARGET_FPS", "12"),
            ("JPEG_QUALITY", "80"),
            ("CAPTURE_MONITOR_INDEX", "2"),
        ]))
        .unwrap();

        assert_eq!(cfg.relay.url, "wss://relay:443");
        assert_eq!(cfg.relay.token, "pw");
        assert_eq!(cfg.capture.fps, 12);
        assert_eq!(cfg.capture.jpeg_quality, 80);
        assert_eq!(cfg.capture.monitor_index, 2);
    }

    #[test]
    fn test_bad_numeric_env_is_reported() {
        let mut cfg = valid();
        let err = cfg.apply_env(env(&[("JPEG_QUALITY", "high")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "JPEG_QUALITY", .. }));
    }

    #[test]
    fn test_validate_accepts_defaults_with_token() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        assert!(AgentConfig::default().validate().is_err());
    }

    #[test]
    fn test_validate_rejects_http_url() {
        let mut cfg = valid();
        cfg.relay.url = "http://relay".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_pause_range() {
        let mut cfg = valid();
        cfg.typing.correction_pause_ms = [300, 100];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_quality_out_of_range() {
        let mut cfg = valid();
        cfg.capture.jpeg_quality = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("relay-target-no-such-dir/none.toml");
        assert_eq!(load_config_from(&path).unwrap(), AgentConfig::default());
    }

    #[test]
    fn test_saved_config_loads_back() {
        // Arrange
        let path = std::env::temp_dir()
            .join(format!("relay-target-config-{}", std::process::id()))
            .join("target.toml");
        let mut cfg = valid();
        cfg.capture.fps = 3;

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("relay-target-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[capture\nfps = ").unwrap();
        let result = load_config_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
