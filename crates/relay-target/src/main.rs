//! Screen Relay target entry point.
//!
//! Registers with the relay, streams the selected monitor, replays viewer
//! commands and types injected text when the operator toggles it.
//!
//! # Usage
//!
//! ```text
//! relay-target [OPTIONS]
//!
//! Options:
//!   --config <PATH>       TOML config file [default: platform config dir]
//!   --url <URL>           Relay WebSocket URL
//!   --token <TOKEN>       Registration token
//!   --monitor <INDEX>     Monitor to capture, 0 = whole desktop
//!   --fps <FPS>           Capture rate
//!   --list-monitors       Print the capturable monitors and exit (Windows)
//!   --seed <SEED>         Seed the typing engine's randomness
//!   --no-console          Do not read toggle/stop/quit from stdin
//! ```
//!
//! Screen capture is implemented for Windows only. Elsewhere the target
//! streams a synthetic test pattern and says so at startup.
//!
//! Settings are layered: config file, then environment variables
//! (`REMOTE_SERVER_URL`, `REMOTE_ACCESS_PASSWORD`, `CLIENT_TARGET_FPS`,
//! `JPEG_QUALITY`, `CAPTURE_MONITOR_INDEX`), then command-line flags.
//!
//! # Local controls
//!
//! Press Enter (or `t`) to start, pause and resume typing, `s` to stop and
//! `q` to quit. On Windows F2 toggles and Shift+F2 stops from any window.

use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relay_target::application::dispatch::CommandDispatcher;
use relay_target::application::typing::TypingEngine;
use relay_target::infrastructure::capture::{
    list_monitors, platform_source, HAS_CAPTURE_BACKEND, NO_CAPTURE_BACKEND,
};
use relay_target::infrastructure::injector::platform_injector;
use relay_target::infrastructure::local_input::console::spawn_console_reader;
use relay_target::infrastructure::relay_client::{ClientExit, RelayClientConfig};
use relay_target::infrastructure::storage::config::config_file_path;
use relay_target::infrastructure::storage::{load_config_from, AgentConfig};
use relay_target::infrastructure::{run_agent, TargetAgent};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screen Relay target agent.
#[derive(Debug, Parser)]
#[command(
    name = "relay-target",
    about = "Streams this screen to a relay and replays viewer input",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Relay WebSocket URL (overrides config and environment).
    #[arg(long)]
    url: Option<String>,

    /// Registration token (overrides config and environment).
    #[arg(long)]
    token: Option<String>,

    /// Monitor to capture: 0 = whole desktop, 1 = primary.
    #[arg(long)]
    monitor: Option<usize>,

    /// Capture rate in frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Print the capturable monitors and exit. Windows only; elsewhere the
    /// target streams a test pattern.
    #[arg(long)]
    list_monitors: bool,

    /// Seed for the typing engine's timing and mistakes.
    #[arg(long)]
    seed: Option<u64>,

    /// Do not read local controls from stdin.
    #[arg(long)]
    no_console: bool,
}

impl Cli {
    /// Loads the config file, then applies environment and flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, an override does not
    /// parse, or the result fails [`AgentConfig::validate`].
    fn resolve_config(&self, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<AgentConfig> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => config_file_path()?,
        };
        let mut config = load_config_from(&path)
            .with_context(|| format!("loading config from {}", path.display()))?;
        config.apply_env(env)?;
        self.apply_overrides(&mut config);
        config.validate().context("invalid target configuration")?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(url) = &self.url {
            config.relay.url = url.clone();
        }
        if let Some(token) = &self.token {
            config.relay.token = token.clone();
        }
        if let Some(monitor) = self.monitor {
            config.capture.monitor_index = monitor;
        }
        if let Some(fps) = self.fps {
            config.capture.fps = fps;
        }
    }
}

fn print_monitors() -> anyhow::Result<()> {
    let monitors = list_monitors().context("listing monitors")?;
    for (index, m) in monitors.iter().enumerate() {
        let label = match (index, m.primary) {
            (0, _) => " (whole desktop)",
            (_, true) => " (primary)",
            _ => "",
        };
        println!(
            "{index}: {}x{} at ({}, {}){label}",
            m.width, m.height, m.left, m.top
        );
    }
    Ok(())
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
    if cli.list_monitors {
        return print_monitors();
    }

    let config = cli.resolve_config(|name| std::env::var(name).ok())?;
    info!(
        "Screen Relay target starting (relay {}, monitor {}, {} fps)",
        config.relay.url, config.capture.monitor_index, config.capture.fps
    );
    if !HAS_CAPTURE_BACKEND {
        warn!("{NO_CAPTURE_BACKEND}");
    }

    // ── Platform adapters ─────────────────────────────────────────────────────
    let injector = platform_injector().context("opening input injector")?;
    let source = platform_source(config.capture.monitor_index, config.capture.jpeg_quality)
        .context("opening screen capture")?;

    let mut engine = TypingEngine::new(Arc::clone(&injector), config.typing.to_typing_config());
    if let Some(seed) = cli.seed {
        engine = engine.with_seed(seed);
    }
    let dispatcher = CommandDispatcher::new(injector, source.origin());

    // ── Local controls ────────────────────────────────────────────────────────
    let (local_tx, local_rx) = mpsc::channel(16);
    if !cli.no_console {
        spawn_console_reader(BufReader::new(std::io::stdin()), local_tx.clone())
            .context("starting console reader")?;
        info!("press Enter to toggle typing, 's' + Enter to stop, 'q' + Enter to quit");
    }
    #[cfg(target_os = "windows")]
    {
        use relay_target::infrastructure::local_input::hotkey::spawn_hotkeys;
        if let Err(e) = spawn_hotkeys(local_tx.clone()) {
            warn!("global hotkeys unavailable: {e}");
        }
    }
    drop(local_tx);

    // ── Shutdown signal ───────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let agent = TargetAgent {
        relay: RelayClientConfig {
            url: config.relay.url.clone(),
            token: config.relay.token.clone(),
            reconnect_interval: config.relay.reconnect_interval(),
        },
        engine: Arc::new(engine),
        dispatcher,
        source,
        capture: config.capture.to_settings(),
    };

    match run_agent(agent, local_rx, running).await? {
        ClientExit::Shutdown => info!("Screen Relay target stopped"),
        ClientExit::Rejected(reason) => {
            anyhow::bail!("relay rejected the registration: {reason}")
        }
        ClientExit::Evicted(reason) => warn!("another target took over: {reason}"),
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
