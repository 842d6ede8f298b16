//! Screen Relay viewer entry point.
//!
//! Authenticates with the relay, logs status events, counts incoming frames
//! (optionally saving the latest one to a file) and sends console commands
//! to the current target.
//!
//! # Usage
//!
//! ```text
//! relay-viewer --secret <SECRET> [OPTIONS]
//!
//! Options:
//!   --url <URL>             Relay WebSocket URL [default: ws://localhost:5000]
//!   --secret <SECRET>       Viewer secret
//!   --save-frame <PATH>     Overwrite PATH with every received frame
//!   --stats-interval <SECS> Seconds between frame statistics lines [default: 5]
//!   --no-console            Watch only; do not read commands from stdin
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Flag       |
//! |-----------------------|------------|
//! | `RELAY_URL`           | `--url`    |
//! | `RELAY_VIEWER_SECRET` | `--secret` |

use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use relay_core::{AckStatus, RelayMsg};
use relay_viewer::application::console::USAGE;
use relay_viewer::application::{parse_line, FrameStats, ViewerInput};
use relay_viewer::domain::ViewerConfig;
use relay_viewer::infrastructure::{ViewerEvent, ViewerSession};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screen Relay viewer.
#[derive(Debug, Parser)]
#[command(
    name = "relay-viewer",
    about = "Watches the relay's target and sends it commands",
    version
)]
struct Cli {
    /// Relay WebSocket URL.
    #[arg(long, default_value = "ws://localhost:5000", env = "RELAY_URL")]
    url: String,

    /// Secret presented in `authenticate`.
    #[arg(long, env = "RELAY_VIEWER_SECRET", hide_env_values = true)]
    secret: String,

    /// Overwrite this file with every received frame.
    #[arg(long)]
    save_frame: Option<PathBuf>,

    /// Seconds between frame statistics lines.
    #[arg(long, default_value_t = 5)]
    stats_interval: u64,

    /// Watch only; do not read commands from stdin.
    #[arg(long)]
    no_console: bool,
}

impl Cli {
    /// Converts the parsed arguments into a validated [`ViewerConfig`].
    fn to_viewer_config(&self) -> anyhow::Result<ViewerConfig> {
        let config = ViewerConfig {
            url: self.url.clone(),
            secret: self.secret.clone(),
            save_frame: self.save_frame.clone(),
            stats_interval: Duration::from_secs(self.stats_interval),
        };
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid viewer configuration")?;
        Ok(config)
    }
}

/// Reads stdin lines on a dedicated thread.
fn spawn_console() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("console input error: {e}");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

fn log_status(msg: &RelayMsg) {
    match msg {
        RelayMsg::TargetConnected { message } => info!("target connected: {message}"),
        RelayMsg::TargetDisconnected { message } => info!("target disconnected: {message}"),
        RelayMsg::CommandError { message } => warn!("command rejected: {message}"),
        RelayMsg::TextInjectionAck { status, message } => match status {
            AckStatus::Success => info!("injection text delivered"),
            AckStatus::Error => warn!(
                "injection text rejected: {}",
                message.as_deref().unwrap_or("no reason given")
            ),
        },
        other => debug!("status {}", other.kind()),
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

    let cli = Cli::parse();
    let config = cli.to_viewer_config()?;

    let mut session = ViewerSession::connect(&config.url)
        .await
        .with_context(|| format!("connecting to relay at {}", config.url))?;
    session
        .authenticate(&config.secret)
        .await
        .context("authenticating with relay")?;

    let mut console = if cli.no_console {
        None
    } else {
        info!("{USAGE}");
        Some(spawn_console().context("starting console reader")?)
    };

    let mut stats = FrameStats::new(Instant::now());
    let mut stats_tick = time::interval(config.stats_interval);
    stats_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    stats_tick.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = session.next_event() => match event? {
                Some(ViewerEvent::Frame(frame)) => {
                    stats.record(frame.len());
                    if let Some(path) = &config.save_frame {
                        if let Err(e) = tokio::fs::write(path, &frame).await {
                            error!("failed to write frame to {}: {e}", path.display());
                        }
                    }
                }
                Some(ViewerEvent::Status(msg)) => log_status(&msg),
                None => {
                    info!("relay closed the connection");
                    break;
                }
            },
            line = recv_line(&mut console) => match line {
                Some(line) => match parse_line(&line) {
                    Ok(ViewerInput::Send(msgs)) => {
                        for msg in &msgs {
                            session.send(msg).await?;
                        }
                    }
                    Ok(ViewerInput::Help) => println!("{USAGE}"),
                    Ok(ViewerInput::Quit) => break,
                    Ok(ViewerInput::Nothing) => {}
                    Err(e) => warn!("{e}; {USAGE}"),
                },
                None => {
                    debug!("console closed");
                    console = None;
                }
            },
            _ = stats_tick.tick() => {
                let report = stats.take_window(Instant::now());
                info!(
                    "{} frames in {:.1?} ({:.1} fps), {} total, last {} bytes",
                    report.frames, report.elapsed, report.fps, report.total, report.last_size
                );
            }
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!("failed to listen for Ctrl+C signal: {e}");
                }
                info!("received Ctrl+C; disconnecting");
                break;
            }
        }
    }

    info!(
        "received {} frames ({} bytes)",
        stats.total(),
        stats.total_bytes()
    );
    session.close().await.context("closing relay connection")?;
    Ok(())
}

/// Next console line, or pending forever once the console is gone.
async fn recv_line(console: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match console {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["relay-viewer", "--secret", "s3cret", "--url", "ws://relay:5000"];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn test_cli_builds_config() {
        // Arrange / Act
        let config = cli(&["--save-frame", "latest.jpg"]).to_viewer_config().unwrap();

        // Assert
        assert_eq!(config.url, "ws://relay:5000");
        assert_eq!(config.secret, "s3cret");
        assert_eq!(config.save_frame, Some(PathBuf::from("latest.jpg")));
        assert_eq!(config.stats_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_stats_interval_is_rejected() {
        assert!(cli(&["--stats-interval", "0"]).to_viewer_config().is_err());
    }

    #[test]
    fn test_non_websocket_url_is_rejected() {
        assert!(cli(&["--url", "relay:5000"]).to_viewer_config().is_err());
    }
}
