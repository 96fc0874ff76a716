//! V8 debugger protocol message types.
//!
//! Every body on the wire is a JSON object with a `"type"` discriminant:
//!
//! ```json
//! {"seq":3,"type":"request","command":"continue","arguments":{"stepaction":"in"}}
//! {"seq":9,"type":"response","request_seq":3,"command":"continue","success":true,"running":true}
//! {"seq":10,"type":"event","event":"break","body":{"breakpoints":[2]}}
//! ```
//!
//! The envelope types are fully typed.  Response and event *bodies* stay as
//! [`serde_json::Value`] at this level because their shape depends on the
//! command; the typed body structs further down are parsed out of them by the
//! code that issued the request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Envelope ──────────────────────────────────────────────────────────────────

/// Any message that can appear in a frame body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    /// Bridge → debuggee.
    Request(WireRequest),
    /// Debuggee → bridge, correlated with a request by `request_seq`.
    Response(WireResponse),
    /// Debuggee → bridge, unsolicited (`break`, `exception`, `afterCompile`).
    Event(WireEvent),
}

/// A request sent to the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    /// Sequence number used to correlate the response.
    pub seq: u64,
    /// Command name, e.g. `"setbreakpoint"`.
    pub command: String,
    /// Command arguments; omitted entirely when the command takes none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl WireRequest {
    /// Builds a request with the given sequence number.
    pub fn new(seq: u64, command: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            seq,
            command: command.into(),
            arguments,
        }
    }
}

/// A response from the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    /// The debuggee's own sequence number for this message.
    #[serde(default)]
    pub seq: u64,
    /// Sequence number of the request this answers.
    pub request_seq: u64,
    /// Echo of the request's command name.
    #[serde(default)]
    pub command: Option<String>,
    /// `false` when the debuggee rejected the request; `message` says why.
    pub success: bool,
    /// Rejection message (also used for thrown expressions in `evaluate`).
    #[serde(default)]
    pub message: Option<String>,
    /// Command-specific payload.
    #[serde(default)]
    pub body: Option<Value>,
    /// Whether the debuggee was running (not paused) after the command.
    #[serde(default)]
    pub running: Option<bool>,
}

/// An unsolicited event from the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(default)]
    pub seq: u64,
    /// Event name: `"break"`, `"exception"`, `"afterCompile"`, ...
    pub event: String,
    #[serde(default)]
    pub body: Option<Value>,
}

// ── Typed bodies ──────────────────────────────────────────────────────────────

/// One entry of the `scripts` response (and the `afterCompile` event body's
/// `script` field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDescriptor {
    /// Backend numeric script id.
    pub id: u64,
    /// File name or URL the runtime reports; absent for eval'd code.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub line_offset: u32,
    #[serde(default)]
    pub column_offset: u32,
    #[serde(default)]
    pub line_count: u32,
    /// Only present when requested with `includeSource: true`.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_length: Option<u64>,
}

/// One entry of the `listbreakpoints` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointDescriptor {
    /// Backend breakpoint id.
    pub number: u64,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub actual_locations: Vec<ActualLocation>,
}

/// Body of the `listbreakpoints` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakpointList {
    #[serde(default)]
    pub breakpoints: Vec<BreakpointDescriptor>,
    #[serde(default)]
    pub break_on_exceptions: Option<bool>,
    #[serde(default)]
    pub break_on_uncaught_exceptions: Option<bool>,
}

/// A resolved location of a breakpoint.
///
/// One breakpoint can resolve to several of these when the same source is
/// loaded more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualLocation {
    pub script_id: u64,
    pub line: u32,
    pub column: u32,
}

/// Body of the `setbreakpoint` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBreakpointBody {
    /// Id assigned by the debuggee.
    pub breakpoint: u64,
    #[serde(default)]
    pub actual_locations: Vec<ActualLocation>,
}

/// The `result` object inside a `changelive` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveEditResult {
    #[serde(default)]
    pub stack_modified: bool,
    #[serde(default)]
    pub stack_update_needs_step_in: bool,
}

/// One frame of the `backtrace` response, requested with `inlineRefs: true`
/// so `receiver` and `func` carry their own descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub index: u32,
    #[serde(default)]
    pub receiver: Value,
    #[serde(default)]
    pub func: Value,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub scopes: Vec<ScopeRef>,
}

/// A scope reference inside a [`StackFrame`] or a function `lookup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRef {
    /// V8 scope type code (0 = global, 1 = local, ...).
    #[serde(rename = "type")]
    pub scope_type: u8,
    pub index: u32,
}

/// Body of the `backtrace` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktraceBody {
    #[serde(default)]
    pub from_frame: u32,
    #[serde(default)]
    pub to_frame: u32,
    #[serde(default)]
    pub total_frames: u32,
    #[serde(default)]
    pub frames: Vec<StackFrame>,
}
