//! Screen Relay server entry point.
//!
//! Accepts WebSocket connections from one target and any number of viewers,
//! keeps at most one target registered, forwards the target's frames to
//! authenticated viewers and routes viewer commands back to the target.
//!
//! # Usage
//!
//! ```text
//! relay-server --secret <SECRET> [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>            Listen address [default: 0.0.0.0]
//!   --port <PORT>            Listen port [default: 5000]
//!   --secret <SECRET>        Token a target must present to register
//!   --viewer-secret <SECRET> Secret viewers authenticate with [default: --secret]
//!   --target-fps <FPS>       Maximum frame broadcast rate, 0 = unlimited [default: 10]
//!   --queue <N>              Control messages buffered per connection [default: 64]
//!   --ping-interval <SECS>   Keepalive ping interval [default: 30]
//!   --idle-timeout <SECS>    Drop a silent connection after this long [default: 90]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                 | Flag               |
//! |--------------------------|--------------------|
//! | `RELAY_BIND`             | `--bind`           |
//! | `RELAY_PORT`             | `--port`           |
//! | `REMOTE_ACCESS_PASSWORD` | `--secret`         |
//! | `RELAY_VIEWER_SECRET`    | `--viewer-secret`  |
//! | `RELAY_TARGET_FPS`       | `--target-fps`     |

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_server::domain::config::DEFAULT_MAX_AUTH_ATTEMPTS;
use relay_server::domain::RelayConfig;
use relay_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screen Relay server.
#[derive(Debug, Parser)]
#[command(
    name = "relay-server",
    about = "Single-target screen relay with frame fan-out and command routing",
    version
)]
struct Cli {
    /// IP address to listen on.
    #[arg(long, default_value = "0.0.0.0", env = "RELAY_BIND")]
    bind: String,

    /// TCP port to listen on.
    #[arg(long, default_value_t = 5000, env = "RELAY_PORT")]
    port: u16,

    /// Token a target must present in its `register` message.
    #[arg(long, env = "REMOTE_ACCESS_PASSWORD", hide_env_values = true)]
    secret: String,

    /// Secret viewers must present in `authenticate`. Defaults to `--secret`.
    #[arg(long, env = "RELAY_VIEWER_SECRET", hide_env_values = true)]
    viewer_secret: Option<String>,

    /// Maximum frame broadcast rate in frames per second. `0` disables throttling.
    #[arg(long, default_value_t = 10, env = "RELAY_TARGET_FPS")]
    target_fps: u32,

    /// Control messages buffered per connection before new ones are dropped.
    #[arg(long, default_value_t = 64)]
    queue: usize,

    /// Seconds between keepalive pings.
    #[arg(long, default_value_t = 30)]
    ping_interval: u64,

    /// Seconds of silence after which a connection is dropped.
    #[arg(long, default_value_t = 90)]
    idle_timeout: u64,
}

impl Cli {
    /// Converts the parsed arguments into a validated [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address or the resulting
    /// configuration fails [`RelayConfig::validate`].
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        let viewer_secret = self.viewer_secret.unwrap_or_else(|| self.secret.clone());

        let config = RelayConfig {
            bind_addr,
            target_secret: self.secret,
            viewer_secret,
            target_fps: self.target_fps,
            control_queue_capacity: self.queue,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            ping_interval: Duration::from_secs(self.ping_interval),
            idle_timeout: Duration::from_secs(self.idle_timeout),
        };
        config.validate().context("invalid relay configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;

    info!(
        "Screen Relay server starting on {} (target fps {})",
        config.bind_addr, config.target_fps
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("Screen Relay server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
