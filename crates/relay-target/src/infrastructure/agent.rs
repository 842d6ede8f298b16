//! Target agent: wires the relay connection, capture loop, command
//! dispatcher and typing engine together.
//!
//! ```text
//! run_agent()
//!  ├─ RelayClient::start()      reconnect loop → RelayEvent channel
//!  ├─ run_capture_loop()        frames → RelayClient (FrameSink)
//!  ├─ dispatch thread           DispatchJob → CommandDispatcher
//!  └─ event loop
//!       ├─ Registered           → dispatch thread (reset)
//!       ├─ Command              → dispatch thread
//!       ├─ InjectionText        → TypingEngine::set_text
//!       ├─ LocalAction::Toggle  → TypingEngine::trigger
//!       ├─ LocalAction::Stop    → TypingEngine::stop
//!       └─ LocalAction::Quit / running cleared → shutdown
//! ```
//!
//! Typing engine calls may block briefly while the worker finishes a
//! character, so they run on the blocking pool.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use relay_core::ControlCommand;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::application::capture::{run_capture_loop, CaptureSettings, FrameSink, FrameSource};
use crate::application::dispatch::CommandDispatcher;
use crate::application::typing::{TriggerOutcome, TypingEngine};
use crate::infrastructure::local_input::LocalAction;
use crate::infrastructure::relay_client::{ClientExit, RelayClient, RelayClientConfig, RelayEvent};

/// How often the event loop checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Commands waiting for the dispatch thread.
const COMMAND_QUEUE: usize = 256;

/// Work for the dispatch thread.
#[derive(Debug)]
pub enum DispatchJob {
    Command(ControlCommand),
    /// Forget pointer state from the previous connection.
    Reset,
}

/// Replays jobs until the channel closes.
pub fn run_dispatch(mut dispatcher: CommandDispatcher, mut jobs: mpsc::Receiver<DispatchJob>) {
    while let Some(job) = jobs.blocking_recv() {
        match job {
            DispatchJob::Command(command) => match dispatcher.dispatch_with_retry(&command) {
                Ok(outcome) => debug!("{} {outcome:?}", command.action()),
                Err(e) => error!("{} injection failed: {e}", command.action()),
            },
            DispatchJob::Reset => dispatcher.reset(),
        }
    }
}

/// Everything the agent runs.
pub struct TargetAgent {
    pub relay: RelayClientConfig,
    pub engine: Arc<TypingEngine>,
    pub dispatcher: CommandDispatcher,
    pub source: Box<dyn FrameSource>,
    pub capture: CaptureSettings,
}

/// Runs the agent until the relay ends the connection for good, the operator
/// quits, or `running` is cleared.
///
/// Returns why the relay connection ended.
pub async fn run_agent(
    agent: TargetAgent,
    mut local: mpsc::Receiver<LocalAction>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<ClientExit> {
    let TargetAgent {
        relay,
        engine,
        dispatcher,
        source,
        capture,
    } = agent;

    // ── Command dispatch thread ───────────────────────────────────────────────
    let (cmd_tx, cmd_rx) = mpsc::channel::<DispatchJob>(COMMAND_QUEUE);
    let dispatch_task = tokio::task::spawn_blocking(move || run_dispatch(dispatcher, cmd_rx));

    // ── Relay connection and capture ──────────────────────────────────────────
    let client = Arc::new(RelayClient::new(relay));
    let (mut events, client_task) = Arc::clone(&client).start();

    let capture_running = Arc::new(AtomicBool::new(true));
    let sink: Arc<dyn FrameSink> = client.clone();
    let capture_task = tokio::spawn(run_capture_loop(
        Arc::new(Mutex::new(source)),
        sink,
        capture,
        Arc::clone(&capture_running),
    ));

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut shutdown_tick = time::interval(SHUTDOWN_POLL);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(RelayEvent::Registered) => {
                    info!("streaming to relay");
                    if cmd_tx.send(DispatchJob::Reset).await.is_err() {
                        error!("command dispatcher stopped");
                        break;
                    }
                }
                Some(RelayEvent::Command(command)) => {
                    if cmd_tx.send(DispatchJob::Command(command)).await.is_err() {
                        error!("command dispatcher stopped");
                        break;
                    }
                }
                Some(RelayEvent::InjectionText(text)) => {
                    let engine = Arc::clone(&engine);
                    tokio::task::spawn_blocking(move || engine.set_text(text)).await?;
                }
                Some(RelayEvent::Disconnected) => warn!("relay connection lost"),
                None => break,
            },
            Some(action) = local.recv() => match action {
                LocalAction::Toggle => {
                    let engine = Arc::clone(&engine);
                    let outcome = tokio::task::spawn_blocking(move || engine.trigger()).await?;
                    if outcome == TriggerOutcome::NothingToType {
                        info!("no injection text received yet");
                    }
                }
                LocalAction::Stop => {
                    let engine = Arc::clone(&engine);
                    if !tokio::task::spawn_blocking(move || engine.stop()).await? {
                        debug!("stop ignored: typing is idle");
                    }
                }
                LocalAction::Quit => {
                    info!("quit requested");
                    break;
                }
            },
            _ = shutdown_tick.tick() => {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    info!("stopping target agent");
    let stopper = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || stopper.stop()).await?;
    capture_running.store(false, Ordering::Relaxed);
    client.shutdown();
    drop(cmd_tx);

    let exit = client_task.await?;
    capture_task.abort();
    let _ = dispatch_task.await;
    Ok(exit)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
