//! Target agent against a real relay.
//!
//! Each test starts a relay on an ephemeral localhost port, runs the agent
//! with a recording injector and a test-pattern source, and plays the viewer
//! with a plain tokio-tungstenite client.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

use relay_core::{decode_relay_msg, encode, ClientMsg, ControlCommand, MouseButton, RelayMsg};
use relay_server::domain::RelayConfig;
use relay_server::infrastructure::serve;
use relay_target::application::capture::CaptureSettings;
use relay_target::application::dispatch::CommandDispatcher;
use relay_target::application::inject::InputInjector;
use relay_target::application::typing::{PauseRange, TypingConfig, TypingEngine};
use relay_target::infrastructure::capture::TestPatternSource;
use relay_target::infrastructure::injector::mock::{InjectedEvent, MockInjector};
use relay_target::infrastructure::local_input::LocalAction;
use relay_target::infrastructure::{run_agent, ClientExit, RelayClientConfig, TargetAgent};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TOKEN: &str = "target-token";
const SECRET: &str = "viewer-secret";
const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = RelayConfig {
        bind_addr: addr,
        target_secret: TOKEN.to_string(),
        viewer_secret: SECRET.to_string(),
        target_fps: 0,
        ..RelayConfig::default()
    };
    tokio::spawn(serve(listener, config, Arc::new(AtomicBool::new(true))));
    format!("ws://{addr}")
}

fn instant_typing() -> TypingConfig {
    TypingConfig {
        mistake_probability: 0.0,
        base_interval: Duration::ZERO,
        interval_variation: Duration::ZERO,
        min_interval: Duration::ZERO,
        backspace_pause: PauseRange::from_millis(0, 0),
        correction_pause: PauseRange::from_millis(0, 0),
        insertion_pause: PauseRange::from_millis(0, 0),
        pause_poll: Duration::from_millis(5),
    }
}

struct RunningAgent {
    mock: Arc<MockInjector>,
    engine: Arc<TypingEngine>,
    local: mpsc::Sender<LocalAction>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<anyhow::Result<ClientExit>>,
}

fn spawn_agent(url: &str, token: &str) -> RunningAgent {
    let mock = Arc::new(MockInjector::new());
    let injector: Arc<dyn InputInjector> = mock.clone();
    let engine = Arc::new(TypingEngine::new(Arc::clone(&injector), instant_typing()).with_seed(7));
    let agent = TargetAgent {
        relay: RelayClientConfig {
            url: url.to_string(),
            token: token.to_string(),
            reconnect_interval: Duration::from_millis(200),
        },
        engine: Arc::clone(&engine),
        dispatcher: CommandDispatcher::new(injector, (0, 0)).with_click_settle(Duration::ZERO),
        source: Box::new(TestPatternSource::new(32, 16, 50)),
        capture: CaptureSettings {
            fps: 20,
            error_backoff: Duration::from_millis(10),
            send_backoff: Duration::from_millis(20),
        },
    };
    let (local, local_rx) = mpsc::channel(8);
    let running = Arc::new(AtomicBool::new(true));
    let handle = tokio::spawn(run_agent(agent, local_rx, Arc::clone(&running)));
    RunningAgent {
        mock,
        engine,
        local,
        running,
        handle,
    }
}

impl RunningAgent {
    async fn stop(self) -> ClientExit {
        self.running.store(false, Ordering::Relaxed);
        timeout(WAIT, self.handle)
            .await
            .expect("agent did not stop")
            .unwrap()
            .unwrap()
    }
}

async fn viewer(url: &str) -> Ws {
    let (mut ws, _) = connect_async(url).await.unwrap();
    send(&mut ws, ClientMsg::Authenticate { secret: SECRET.into() }).await;
    assert_eq!(recv_msg(&mut ws).await, RelayMsg::Authenticated);
    ws
}

async fn send(ws: &mut Ws, msg: ClientMsg) {
    ws.send(WsMessage::Text(encode(&msg).unwrap())).await.unwrap();
}

/// Next control message, skipping frames and keepalives.
async fn recv_msg(ws: &mut Ws) -> RelayMsg {
    loop {
        let next = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a control message")
            .expect("stream ended")
            .expect("WebSocket error");
        if let WsMessage::Text(text) = next {
            return decode_relay_msg(&text).unwrap();
        }
    }
}

/// Next binary frame, skipping control messages and keepalives.
async fn recv_frame(ws: &mut Ws) -> Vec<u8> {
    loop {
        let next = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("WebSocket error");
        if let WsMessage::Binary(bytes) = next {
            return bytes;
        }
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !check() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        sleep(Duration::from_millis(10)).await;
    }
}

// ── Frames ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_viewer_receives_jpeg_frames_from_agent() {
    // Arrange
    let url = start_relay().await;
    let mut v = viewer(&url).await;
    let agent = spawn_agent(&url, TOKEN);

    // Act
    let frame = recv_frame(&mut v).await;

    // Assert: JPEG start-of-image marker
    assert_eq!(&frame[..2], &[0xFF, 0xD8]);
    assert_eq!(agent.stop().await, ClientExit::Shutdown);
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_viewer_click_is_injected_on_target() {
    // Arrange
    let url = start_relay().await;
    let mut v = viewer(&url).await;
    let agent = spawn_agent(&url, TOKEN);
    recv_frame(&mut v).await;

    // Act
    send(
        &mut v,
        ClientMsg::Command {
            command: ControlCommand::Click {
                button: MouseButton::Right,
                x: 12,
                y: 34,
            },
        },
    )
    .await;

    // Assert
    let mock = Arc::clone(&agent.mock);
    eventually(|| mock.recorded().contains(&InjectedEvent::Click(MouseButton::Right))).await;
    let events = mock.recorded();
    let click_at = events
        .iter()
        .position(|e| *e == InjectedEvent::Click(MouseButton::Right))
        .unwrap();
    assert_eq!(events[click_at - 1], InjectedEvent::Move(12, 34));
    agent.stop().await;
}

// ── Typing ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_injected_text_is_typed_after_local_toggle() {
    // Arrange
    let url = start_relay().await;
    let mut v = viewer(&url).await;
    let agent = spawn_agent(&url, TOKEN);
    recv_frame(&mut v).await;

    // Act: the viewer only stages the text
    send(&mut v, ClientMsg::SetInjectionText { text: "hello".into() }).await;
    let engine = Arc::clone(&agent.engine);
    eventually(|| engine.pending() == "hello").await;
    assert_eq!(agent.mock.typed_text(), "");

    // Act: the operator starts typing
    agent.local.send(LocalAction::Toggle).await.unwrap();

    // Assert
    let mock = Arc::clone(&agent.mock);
    eventually(|| mock.typed_text() == "hello").await;
    agent.stop().await;
}

#[tokio::test]
async fn test_quit_action_stops_agent() {
    // Arrange
    let url = start_relay().await;
    let mut v = viewer(&url).await;
    let agent = spawn_agent(&url, TOKEN);
    recv_frame(&mut v).await;

    // Act
    agent.local.send(LocalAction::Quit).await.unwrap();

    // Assert
    let exit = timeout(WAIT, agent.handle).await.unwrap().unwrap().unwrap();
    assert_eq!(exit, ClientExit::Shutdown);
}

// ── Registration ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_agent_evicts_first() {
    // Arrange
    let url = start_relay().await;
    let mut v = viewer(&url).await;
    let first = spawn_agent(&url, TOKEN);
    recv_frame(&mut v).await;

    // Act
    let second = spawn_agent(&url, TOKEN);

    // Assert
    let exit = timeout(WAIT, first.handle).await.unwrap().unwrap().unwrap();
    assert!(matches!(exit, ClientExit::Evicted(_)), "{exit:?}");
    recv_frame(&mut v).await;
    assert_eq!(second.stop().await, ClientExit::Shutdown);
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    // Arrange
    let url = start_relay().await;

    // Act
    let agent = spawn_agent(&url, "not-the-token");

    // Assert
    let exit = timeout(WAIT, agent.handle).await.unwrap().unwrap().unwrap();
    assert!(matches!(exit, ClientExit::Rejected(_)), "{exit:?}");
}
