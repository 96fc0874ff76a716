//! Recording test doubles for the four ports.
//!
//! They let tests drive the debugger domain without a debuggee or a browser:
//! script what the "backend" answers, then inspect what was requested and
//! what reached the "front end".

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use inspector_core::protocol::ScriptDescriptor;

use super::{BreakNotifier, FrontendChannel, PauseContext, ScriptRegistry, WireClient, WireError};
use crate::application::pause_slots::PauseSlots;
use crate::domain::messages::{CallFrame, ConsoleLevel, Event, Response};

// ── Wire ──────────────────────────────────────────────────────────────────────

/// One request seen by [`ScriptedWire`].
#[derive(Debug, Clone, PartialEq)]
pub struct WireCall {
    pub command: String,
    pub arguments: Option<Value>,
}

type RequestHook = Box<dyn Fn(Option<&Value>) + Send + Sync>;

/// A [`WireClient`] that answers from a per-command script.
///
/// Unscripted commands succeed with `Value::Null`.  A scripted queue is
/// consumed front to back and its last entry repeats.
#[derive(Default)]
pub struct ScriptedWire {
    replies: Mutex<HashMap<String, VecDeque<Result<Value, WireError>>>>,
    hooks: Mutex<HashMap<String, RequestHook>>,
    calls: Mutex<Vec<WireCall>>,
    running: AtomicBool,
    connects: AtomicUsize,
    closes: AtomicUsize,
    connect_error: Mutex<Option<WireError>>,
}

impl ScriptedWire {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Queues a successful reply body for `command`.
    pub fn reply(&self, command: &str, body: Value) -> &Self {
        self.push(command, Ok(body))
    }

    /// Queues a failure for `command`.
    pub fn fail(&self, command: &str, error: WireError) -> &Self {
        self.push(command, Err(error))
    }

    /// Runs `hook` synchronously whenever `command` is requested, before the
    /// reply is returned.
    pub fn on_request(&self, command: &str, hook: impl Fn(Option<&Value>) + Send + Sync + 'static) {
        self.hooks
            .lock()
            .expect("lock poisoned")
            .insert(command.to_string(), Box::new(hook));
    }

    pub fn fail_connect(&self, error: WireError) {
        *self.connect_error.lock().expect("lock poisoned") = Some(error);
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<WireCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Command names in request order.
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn push(&self, command: &str, reply: Result<Value, WireError>) -> &Self {
        self.replies
            .lock()
            .expect("lock poisoned")
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn next_reply(&self, command: &str) -> Result<Value, WireError> {
        let mut replies = self.replies.lock().expect("lock poisoned");
        match replies.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(Value::Null)),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(Value::Null)),
            None => Ok(Value::Null),
        }
    }
}

#[async_trait]
impl WireClient for ScriptedWire {
    async fn connect(&self) -> Result<(), WireError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.connect_error.lock().expect("lock poisoned").clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn request(&self, command: &str, arguments: Option<Value>) -> Result<Value, WireError> {
        self.calls.lock().expect("lock poisoned").push(WireCall {
            command: command.to_string(),
            arguments: arguments.clone(),
        });
        if let Some(hook) = self.hooks.lock().expect("lock poisoned").get(command) {
            hook(arguments.as_ref());
        }
        self.next_reply(command)
    }
}

// ── Front end ─────────────────────────────────────────────────────────────────

/// Everything sent to a [`RecordingFrontend`], in send order.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Response(Response),
    Event(Event),
}

#[derive(Debug, Default)]
pub struct RecordingFrontend {
    sent: Mutex<Vec<Outbound>>,
}

impl RecordingFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    pub fn responses(&self) -> Vec<Response> {
        self.sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Response(r) => Some(r),
                Outbound::Event(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Event(e) => Some(e),
                Outbound::Response(_) => None,
            })
            .collect()
    }

    pub fn event_methods(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.method).collect()
    }

    /// `(level, text)` of every console message.
    pub fn console_messages(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter(|e| e.method == "Console.messageAdded")
            .filter_map(|e| {
                let message = e.params?.get("message")?.clone();
                Some((
                    message.get("level")?.as_str()?.to_string(),
                    message.get("text")?.as_str()?.to_string(),
                ))
            })
            .collect()
    }
}

impl FrontendChannel for RecordingFrontend {
    fn send_response(&self, response: Response) {
        self.sent
            .lock()
            .expect("lock poisoned")
            .push(Outbound::Response(response));
    }

    fn send_event(&self, event: Event) {
        self.sent.lock().expect("lock poisoned").push(Outbound::Event(event));
    }
}

// ── Break notifier ────────────────────────────────────────────────────────────

/// A [`BreakNotifier`] that serves canned frames and sends `Debugger.paused`
/// to the given front end.
pub struct RecordingNotifier {
    frontend: Arc<dyn FrontendChannel>,
    frames: Mutex<Result<Vec<CallFrame>, WireError>>,
    pauses: Mutex<Vec<PauseContext>>,
    fetches: AtomicUsize,
    slots: PauseSlots,
}

impl RecordingNotifier {
    pub fn new(frontend: Arc<dyn FrontendChannel>) -> Self {
        Self {
            frontend,
            frames: Mutex::new(Ok(Vec::new())),
            pauses: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            slots: PauseSlots::new(),
        }
    }

    pub fn set_frames(&self, frames: Vec<CallFrame>) {
        *self.frames.lock().expect("lock poisoned") = Ok(frames);
    }

    pub fn fail_fetch(&self, error: WireError) {
        *self.frames.lock().expect("lock poisoned") = Err(error);
    }

    pub fn pauses(&self) -> Vec<PauseContext> {
        self.pauses.lock().expect("lock poisoned").clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BreakNotifier for RecordingNotifier {
    async fn emit_pause(&self, context: PauseContext) -> Result<(), WireError> {
        self.pauses.lock().expect("lock poisoned").push(context.clone());
        match self.fetch_call_frames().await {
            Ok(frames) => {
                self.frontend.send_event(Event::paused(&context.into_params(frames)));
                Ok(())
            }
            Err(e) => {
                self.frontend.send_log_to_console(ConsoleLevel::Error, &e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_call_frames(&self) -> Result<Vec<CallFrame>, WireError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.frames.lock().expect("lock poisoned").clone()
    }

    fn slots(&self) -> &PauseSlots {
        &self.slots
    }
}

// ── Script registry ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOp {
    Reset,
    Add(u64),
}

#[derive(Debug, Default)]
pub struct RecordingRegistry {
    ops: Mutex<Vec<RegistryOp>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<RegistryOp> {
        self.ops.lock().expect("lock poisoned").clone()
    }
}

impl ScriptRegistry for RecordingRegistry {
    fn reset(&self) {
        self.ops.lock().expect("lock poisoned").push(RegistryOp::Reset);
    }

    fn add_script(&self, script: ScriptDescriptor) {
        self.ops
            .lock()
            .expect("lock poisoned")
            .push(RegistryOp::Add(script.id));
    }
}
