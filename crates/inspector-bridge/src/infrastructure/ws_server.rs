//! WebSocket server: accept loop and per-session wiring.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each accepted connection to a WebSocket session.
//! 3. Building the per-session object graph: a [`FrontendSink`], a
//!    [`DebuggeeConnection`], a [`ScriptStore`], a [`BreakEventHandler`],
//!    a [`DebuggerAgent`] and a [`Dispatcher`] with the default
//!    registrations.
//! 4. Running three concurrent tasks per session:
//!    - **front-end reader**: parses each text frame as a command and spawns
//!      its dispatch, so a slow command never blocks the next one;
//!    - **front-end writer**: drains the sink's queue into the WebSocket;
//!    - **backend router**: feeds debuggee events to the break handler and
//!      the script store, and reports a lost debuggee with
//!      `Inspector.detached`.
//! 5. Gracefully stopping the accept loop when the `running` flag is cleared.
//!
//! The debuggee connection is opened lazily by `Debugger.enable`, not when
//! the WebSocket session starts.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::ports::{BreakNotifier, FrontendChannel, WireClient};
use crate::application::{DebuggerAgent, DispatchError, Dispatcher};
use crate::domain::config::BridgeConfig;
use crate::domain::messages::{Command, Event};
use crate::infrastructure::break_events::BreakEventHandler;
use crate::infrastructure::debuggee_conn::{BackendNotice, DebuggeeConnection};
use crate::infrastructure::frontend_sink::FrontendSink;
use crate::infrastructure::script_store::ScriptStore;

/// Methods answered with an empty result.
const NOOP_METHODS: &[&str] = &[
    "Network.enable",
    "Console.enable",
    "Database.enable",
    "DOMStorage.enable",
    "DOM.hideHighlight",
    "Inspector.enable",
    "Profiler.enable",
    "CSS.enable",
    "Page.enable",
    "Runtime.enable",
];

/// Capability queries answered with `{result: false}`.
const DENIED_CAPABILITIES: &[&str] = &[
    "Worker.canInspectWorkers",
    "Network.canClearBrowserCache",
    "Network.canClearBrowserCookies",
    "Page.canScreencast",
    "Profiler.causesRecompilation",
    "Profiler.isSampling",
    "Profiler.hasHeapProfiler",
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the main WebSocket accept loop until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(config: BridgeConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    info!("inspector bridge listening on ws://{}", config.ws_bind_addr);
    serve(listener, config, running).await
}

/// Accept loop over an already bound listener.
///
/// Split out of [`run_server`] so tests can bind port 0 and learn the
/// address first.
pub async fn serve(
    listener: TcpListener,
    config: BridgeConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let config = Arc::new(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the loop can notice the shutdown flag even when
        // no front end is connecting.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("new front-end connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_frontend_session(stream, peer_addr, cfg).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

/// Registers the canned answers every session starts with.
pub fn register_defaults(dispatcher: &mut Dispatcher) {
    for method in NOOP_METHODS {
        dispatcher.register_noop(method);
    }
    dispatcher.register_query("CSS.getSupportedCSSProperties", json!({ "cssProperties": [] }));
    for method in DENIED_CAPABILITIES {
        dispatcher.register_query(method, json!({ "result": false }));
    }
    dispatcher.register_query("Page.getResourceTree", resource_tree());
}

/// A single empty top-level frame; the debuggee has no page.
fn resource_tree() -> Value {
    json!({
        "frameTree": {
            "frame": {
                "id": "inspector-bridge-toplevel-frame",
                "url": "node.js",
                "loaderId": "",
                "mimeType": "text/javascript",
                "securityOrigin": "inspector-bridge",
            },
            "resources": [],
        }
    })
}

// ── Per-session object graph ──────────────────────────────────────────────────

/// Everything one front-end session owns.
pub struct Session {
    pub dispatcher: Arc<Dispatcher>,
    pub frontend: Arc<FrontendSink>,
    pub connection: Arc<DebuggeeConnection>,
    pub scripts: Arc<ScriptStore>,
    pub breaks: Arc<BreakEventHandler>,
}

impl Session {
    /// Wires the session's components together.
    ///
    /// Outbound front-end text goes to `outbound`; debuggee events and link
    /// loss go to `notices`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if a domain handler fails registration.
    pub fn build(
        config: &BridgeConfig,
        session_id: &str,
        outbound: mpsc::UnboundedSender<String>,
        notices: mpsc::UnboundedSender<BackendNotice>,
    ) -> Result<Self, DispatchError> {
        let frontend = Arc::new(FrontendSink::new(outbound, session_id));
        let connection = Arc::new(DebuggeeConnection::new(
            config.debuggee_addr,
            session_id,
            notices,
        ));
        let scripts = Arc::new(ScriptStore::new(frontend.clone()));
        let breaks = Arc::new(BreakEventHandler::new(connection.clone(), frontend.clone()));
        let agent = Arc::new(DebuggerAgent::new(
            connection.clone(),
            frontend.clone(),
            breaks.clone(),
            scripts.clone(),
        ));

        let mut dispatcher = Dispatcher::new(frontend.clone());
        register_defaults(&mut dispatcher);
        dispatcher.register_domain("Debugger", agent)?;

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            frontend,
            connection,
            scripts,
            breaks,
        })
    }

    /// Applies one backend notice.
    pub async fn route_notice(&self, notice: BackendNotice) {
        match notice {
            BackendNotice::Event(event) => {
                let body = event.body.unwrap_or(Value::Null);
                match event.event.as_str() {
                    "break" => self.breaks.handle_break(&body).await,
                    "exception" => self.breaks.handle_exception(&body).await,
                    "afterCompile" => self.scripts.handle_after_compile(&body),
                    other => debug!("ignoring debuggee event `{other}`"),
                }
            }
            BackendNotice::Closed { reason } => {
                // A live edit waiting for its step-in pause would wait forever.
                self.breaks.slots().disarm_next_pause();
                self.frontend.send_event(Event::detached(&reason));
            }
        }
    }

    /// Releases everything the session still has in flight.
    pub async fn shutdown(&self) {
        self.breaks.slots().disarm_next_pause();
        self.connection.close().await;
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_frontend_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BridgeConfig>,
) {
    match run_session(raw_stream, peer_addr, config).await {
        Ok(()) => info!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BridgeConfig>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let session_id = Uuid::new_v4().to_string();
    info!("session {session_id}: front end {peer_addr} attached");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<BackendNotice>();

    let session = Arc::new(
        Session::build(&config, &session_id, out_tx, notice_tx)
            .context("failed to build session")?,
    );

    // ── Task A: front-end reader ──────────────────────────────────────────────
    let dispatcher = Arc::clone(&session.dispatcher);
    let sid = session_id.clone();
    let mut reader_task = tokio::spawn(async move {
        // Dropped with the reader, which aborts any command still running.
        let mut commands = JoinSet::new();
        loop {
            let ws_msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("session {sid}: front-end WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("session {sid}: front-end WebSocket error: {e}");
                    break;
                }
                None => break,
            };

            match ws_msg {
                WsMessage::Text(text) => {
                    let command: Command = match serde_json::from_str(&text) {
                        Ok(c) => c,
                        Err(e) => {
                            warn!("session {sid}: invalid command JSON: {e}");
                            continue;
                        }
                    };
                    debug!("session {sid}: → {}", command.method);
                    while commands.try_join_next().is_some() {}
                    let dispatcher = Arc::clone(&dispatcher);
                    commands.spawn(async move {
                        dispatcher.dispatch(command).await;
                    });
                }
                WsMessage::Close(_) => {
                    debug!("session {sid}: Close frame received");
                    break;
                }
                WsMessage::Binary(_) => {
                    warn!("session {sid}: unexpected binary WebSocket frame (ignored)");
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
    });

    // ── Task B: front-end writer ──────────────────────────────────────────────
    let sid = session_id.clone();
    let mut writer_task = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if ws_tx.send(WsMessage::Text(text)).await.is_err() {
                debug!("session {sid}: WebSocket send failed (front end disconnected)");
                break;
            }
        }
    });

    // ── Task C: backend notice router ─────────────────────────────────────────
    let router_session = Arc::clone(&session);
    let mut router_task = tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            router_session.route_notice(notice).await;
        }
    });

    tokio::select! {
        _ = &mut reader_task => debug!("session {session_id}: front-end reader ended"),
        _ = &mut writer_task => debug!("session {session_id}: front-end writer ended"),
        _ = &mut router_task => debug!("session {session_id}: backend router ended"),
    }
    reader_task.abort();
    writer_task.abort();
    router_task.abort();

    session.shutdown().await;
    info!("session {session_id}: detached");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
