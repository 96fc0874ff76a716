//! Ports: the interfaces the application layer talks through.
//!
//! The debugger domain never sees a socket.  Everything it needs from the
//! outside world comes through one of these four traits:
//!
//! | Port               | Implemented by (production)                 |
//! |--------------------|---------------------------------------------|
//! | [`WireClient`]     | `infrastructure::DebuggeeConnection`        |
//! | [`FrontendChannel`]| `infrastructure::FrontendSink`              |
//! | [`BreakNotifier`]  | `infrastructure::BreakEventHandler`         |
//! | [`ScriptRegistry`] | `infrastructure::ScriptStore`               |
//!
//! Test doubles for all four live in [`mock`].

pub mod mock;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use inspector_core::protocol::ScriptDescriptor;

use crate::application::pause_slots::PauseSlots;
use crate::domain::messages::{
    CallFrame, ConsoleLevel, Event, PausedParams, RemoteObject, Response,
};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure of one backend request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WireError {
    /// The debuggee answered `success: false`.  Displays as exactly the
    /// debuggee's message so it can be passed through to the front end.
    #[error("{message}")]
    Rejected { message: String },

    /// The connection closed while the request was outstanding.
    #[error("connection closed")]
    Closed,

    /// A request was issued before `connect` succeeded.
    #[error("not connected to the debuggee")]
    NotConnected,

    /// Socket-level failure (connect refused, write error, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The debuggee answered with a body this side could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl WireError {
    pub fn rejected(message: impl Into<String>) -> Self {
        WireError::Rejected {
            message: message.into(),
        }
    }
}

// ── Wire client ───────────────────────────────────────────────────────────────

/// Request/response access to the debuggee.
#[async_trait]
pub trait WireClient: Send + Sync {
    /// Opens the connection.  Calling it on an open connection is a no-op.
    async fn connect(&self) -> Result<(), WireError>;

    /// Closes the connection and fails every outstanding request with
    /// [`WireError::Closed`].  Idempotent.
    async fn close(&self);

    /// `false` while the debuggee is paused.
    fn is_running(&self) -> bool;

    /// Sends one request and waits for its response body (`Value::Null`
    /// when the response has none).
    async fn request(&self, command: &str, arguments: Option<Value>) -> Result<Value, WireError>;
}

// ── Front-end channel ─────────────────────────────────────────────────────────

/// Outbound half of the front-end connection.
///
/// Sends never fail from the caller's point of view: if the front end has
/// gone away there is nobody left to tell.
pub trait FrontendChannel: Send + Sync {
    fn send_response(&self, response: Response);

    fn send_event(&self, event: Event);

    /// Writes a line to the front-end console.
    fn send_log_to_console(&self, level: ConsoleLevel, text: &str) {
        self.send_event(Event::console_message(level, text));
    }
}

// ── Break notifier ────────────────────────────────────────────────────────────

/// Extra information attached to a pause notification.
///
/// The default value is a plain pause: reason `other`, no exception, no
/// breakpoint hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PauseContext {
    /// Set when the debuggee stopped on a thrown exception.
    pub exception: Option<RemoteObject>,
    /// Backend ids of the breakpoints that were hit.
    pub hit_breakpoints: Vec<u64>,
}

impl PauseContext {
    /// Builds the `Debugger.paused` parameters around freshly fetched frames.
    pub fn into_params(self, call_frames: Vec<CallFrame>) -> PausedParams {
        let reason = if self.exception.is_some() { "exception" } else { "other" };
        PausedParams {
            call_frames,
            reason: reason.to_string(),
            data: self
                .exception
                .and_then(|exception| serde_json::to_value(exception).ok()),
            hit_breakpoints: self
                .hit_breakpoints
                .iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }
}

/// Owner of pause-state notifications and call-frame retrieval.
#[async_trait]
pub trait BreakNotifier: Send + Sync {
    /// Fetches the current frames and sends `Debugger.paused`.
    ///
    /// A failed fetch has already been reported to the front-end console
    /// when this returns `Err`.
    async fn emit_pause(&self, context: PauseContext) -> Result<(), WireError>;

    async fn fetch_call_frames(&self) -> Result<Vec<CallFrame>, WireError>;

    /// The next-pause and continue-to slots shared with the debugger domain.
    fn slots(&self) -> &PauseSlots;
}

// ── Script registry ───────────────────────────────────────────────────────────

/// Storage for the scripts the debuggee has loaded.
pub trait ScriptRegistry: Send + Sync {
    /// Forgets every script.
    fn reset(&self);

    fn add_script(&self, script: ScriptDescriptor);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
