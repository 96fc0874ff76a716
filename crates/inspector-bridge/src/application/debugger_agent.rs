//! The `Debugger` domain: front-end debugger commands translated into V8
//! debugger requests.
//!
//! Most methods are a single request plus a shape translation.  Three are
//! not:
//!
//! * **`enable`** connects and then runs a three-step bootstrap waterfall
//!   (clear stale breakpoints, reload scripts, replay pause state), each
//!   step with its own failure policy.
//! * **`setScriptSource`** answers differently depending on how the live
//!   edit affected the paused stack.  When the debuggee needs a step-in
//!   before its stack can be read, the response waits for the next pause.
//! * **`setBreakpointByUrl`** turns one breakpoint into as many locations as
//!   the debuggee resolved it to.
//!
//! The agent keeps no state of its own; everything lives behind the ports.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use inspector_core::domain::debugger::{LiveEditOutcome, PauseOnExceptions, StepAction};
use inspector_core::protocol::{
    BreakpointList, LiveEditResult, ScriptDescriptor, SetBreakpointBody,
};

use crate::application::dispatcher::{DomainHandler, HandlerResult};
use crate::application::errors::AgentError;
use crate::application::pause_slots::ArmOutcome;
use crate::application::pipeline::{for_each_serial, StepPolicy, Waterfall};
use crate::application::ports::{
    BreakNotifier, FrontendChannel, PauseContext, ScriptRegistry, WireClient, WireError,
};
use crate::application::translate::{
    exception_remote_object, function_details_from_lookup, location_from_actual,
    remote_object_from_wire, url_to_script_name,
};
use crate::domain::messages::{CallFrame, ConsoleLevel, Event, Location};

/// `scripts` request filter: normal (non-native, non-extension) scripts.
const NORMAL_SCRIPTS: u32 = 4;

// ── Method set ────────────────────────────────────────────────────────────────

/// Every method of the `Debugger` domain this bridge implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerMethod {
    Enable,
    Disable,
    Resume,
    Pause,
    StepOver,
    StepInto,
    StepOut,
    ContinueToLocation,
    GetScriptSource,
    SetScriptSource,
    SetPauseOnExceptions,
    SetBreakpointByUrl,
    RemoveBreakpoint,
    SetBreakpointsActive,
    EvaluateOnCallFrame,
    GetFunctionDetails,
}

impl DebuggerMethod {
    pub const ALL: [DebuggerMethod; 16] = [
        DebuggerMethod::Enable,
        DebuggerMethod::Disable,
        DebuggerMethod::Resume,
        DebuggerMethod::Pause,
        DebuggerMethod::StepOver,
        DebuggerMethod::StepInto,
        DebuggerMethod::StepOut,
        DebuggerMethod::ContinueToLocation,
        DebuggerMethod::GetScriptSource,
        DebuggerMethod::SetScriptSource,
        DebuggerMethod::SetPauseOnExceptions,
        DebuggerMethod::SetBreakpointByUrl,
        DebuggerMethod::RemoveBreakpoint,
        DebuggerMethod::SetBreakpointsActive,
        DebuggerMethod::EvaluateOnCallFrame,
        DebuggerMethod::GetFunctionDetails,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DebuggerMethod::Enable => "enable",
            DebuggerMethod::Disable => "disable",
            DebuggerMethod::Resume => "resume",
            DebuggerMethod::Pause => "pause",
            DebuggerMethod::StepOver => "stepOver",
            DebuggerMethod::StepInto => "stepInto",
            DebuggerMethod::StepOut => "stepOut",
            DebuggerMethod::ContinueToLocation => "continueToLocation",
            DebuggerMethod::GetScriptSource => "getScriptSource",
            DebuggerMethod::SetScriptSource => "setScriptSource",
            DebuggerMethod::SetPauseOnExceptions => "setPauseOnExceptions",
            DebuggerMethod::SetBreakpointByUrl => "setBreakpointByUrl",
            DebuggerMethod::RemoveBreakpoint => "removeBreakpoint",
            DebuggerMethod::SetBreakpointsActive => "setBreakpointsActive",
            DebuggerMethod::EvaluateOnCallFrame => "evaluateOnCallFrame",
            DebuggerMethod::GetFunctionDetails => "getFunctionDetails",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

// ── Params ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ContinueToLocationParams {
    location: Location,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptIdParams {
    script_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetScriptSourceParams {
    script_id: String,
    script_source: String,
}

#[derive(Debug, Deserialize)]
struct SetPauseOnExceptionsParams {
    state: PauseOnExceptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetBreakpointByUrlParams {
    url: Option<String>,
    line_number: u32,
    column_number: Option<u32>,
    condition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBreakpointParams {
    breakpoint_id: String,
}

#[derive(Debug, Deserialize)]
struct SetBreakpointsActiveParams {
    active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateOnCallFrameParams {
    call_frame_id: String,
    expression: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetFunctionDetailsParams {
    function_id: String,
}

// ── Agent ─────────────────────────────────────────────────────────────────────

/// Implements the `Debugger` domain on top of the four ports.
pub struct DebuggerAgent {
    wire: Arc<dyn WireClient>,
    frontend: Arc<dyn FrontendChannel>,
    notifier: Arc<dyn BreakNotifier>,
    registry: Arc<dyn ScriptRegistry>,
}

impl DebuggerAgent {
    pub fn new(
        wire: Arc<dyn WireClient>,
        frontend: Arc<dyn FrontendChannel>,
        notifier: Arc<dyn BreakNotifier>,
        registry: Arc<dyn ScriptRegistry>,
    ) -> Self {
        Self {
            wire,
            frontend,
            notifier,
            registry,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    async fn enable(&self) -> HandlerResult {
        self.wire.connect().await?;

        let report = Waterfall::new("enable")
            .step(
                "clear stale breakpoints",
                StepPolicy::LogAndContinue,
                self.clear_stale_breakpoints(),
            )
            .step("reload scripts", StepPolicy::Fatal, self.reload_scripts())
            .step(
                "replay pause state",
                StepPolicy::LogAndContinue,
                self.replay_pause_state(),
            )
            .run()
            .await?;

        info!(tolerated = report.tolerated.len(), "debugger enabled");
        Ok(None)
    }

    /// Breakpoints left behind by an earlier session would fire with ids the
    /// front end has never seen.
    async fn clear_stale_breakpoints(&self) -> Result<(), AgentError> {
        let body = self.wire.request("listbreakpoints", None).await?;
        let list: BreakpointList = parse_body_or_default(body)?;
        let ids: Vec<u64> = list.breakpoints.iter().map(|bp| bp.number).collect();

        let failed = for_each_serial(
            "clear stale breakpoint",
            ids,
            StepPolicy::LogAndContinue,
            |id| self.clear_breakpoint(id),
        )
        .await?;
        debug!(count = list.breakpoints.len(), failed, "stale breakpoints cleared");
        Ok(())
    }

    async fn reload_scripts(&self) -> Result<(), AgentError> {
        self.registry.reset();
        let body = self
            .wire
            .request(
                "scripts",
                Some(json!({ "includeSource": false, "types": NORMAL_SCRIPTS })),
            )
            .await?;
        let scripts: Vec<ScriptDescriptor> = parse_body_or_default(body)?;
        debug!(count = scripts.len(), "scripts reloaded");
        for script in scripts {
            self.registry.add_script(script);
        }
        Ok(())
    }

    /// The debuggee may already be stopped (e.g. `--debug-brk`).
    async fn replay_pause_state(&self) -> Result<(), AgentError> {
        if self.wire.is_running() {
            return Ok(());
        }
        self.notifier.emit_pause(PauseContext::default()).await?;
        Ok(())
    }

    async fn disable(&self) -> HandlerResult {
        self.wire.close().await;
        Ok(None)
    }

    // ── Execution control ─────────────────────────────────────────────────────

    async fn continue_with(&self, action: StepAction) -> HandlerResult {
        self.wire
            .request("continue", action.continue_arguments())
            .await?;
        self.frontend.send_event(Event::resumed());
        Ok(None)
    }

    async fn pause(&self) -> HandlerResult {
        self.wire.request("suspend", None).await?;
        if let Err(e) = self.notifier.emit_pause(PauseContext::default()).await {
            warn!("suspended, but the pause notification failed: {e}");
        }
        Ok(None)
    }

    async fn continue_to_location(&self, params: Value) -> HandlerResult {
        let ContinueToLocationParams { location } = parse_params(params)?;
        let script_id = parse_id(&location.script_id, "scriptId")?;

        let body = self
            .wire
            .request(
                "setbreakpoint",
                Some(json!({
                    "type": "scriptId",
                    "target": script_id,
                    "line": location.line_number,
                    "column": location.column_number,
                })),
            )
            .await?;
        let set: SetBreakpointBody = parse_body(body)?;
        if let Some(previous) = self.notifier.slots().set_continue_to(set.breakpoint) {
            debug!(previous, "continue-to breakpoint replaced before it was hit");
        }

        self.continue_with(StepAction::None).await
    }

    // ── Scripts ───────────────────────────────────────────────────────────────

    async fn get_script_source(&self, params: Value) -> HandlerResult {
        let ScriptIdParams { script_id } = parse_params(params)?;
        let id = parse_id(&script_id, "scriptId")?;

        let body = self
            .wire
            .request(
                "scripts",
                Some(json!({ "includeSource": true, "types": NORMAL_SCRIPTS, "ids": [id] })),
            )
            .await?;
        let scripts: Vec<ScriptDescriptor> = parse_body_or_default(body)?;
        let script = scripts
            .into_iter()
            .next()
            .ok_or(AgentError::ScriptNotFound(script_id))?;

        Ok(Some(json!({ "scriptSource": script.source.unwrap_or_default() })))
    }

    async fn set_script_source(&self, params: Value) -> HandlerResult {
        let SetScriptSourceParams {
            script_id,
            script_source,
        } = parse_params(params)?;
        let id = parse_id(&script_id, "scriptId")?;

        let body = self
            .wire
            .request(
                "changelive",
                Some(json!({
                    "script_id": id,
                    "new_source": script_source,
                    "preview_only": false,
                })),
            )
            .await?;
        let raw_result = body.get("result").cloned().unwrap_or(Value::Null);
        let flags: LiveEditResult = parse_body_or_default(raw_result.clone())?;

        let call_frames = match LiveEditOutcome::from(&flags) {
            LiveEditOutcome::Unchanged => Vec::new(),
            LiveEditOutcome::StackModified => self.frames_or_empty().await,
            LiveEditOutcome::StepInRequired => {
                self.step_into_edited_frame().await;
                self.frames_or_empty().await
            }
        };

        Ok(Some(json!({
            "callFrames": call_frames,
            "result": raw_result,
        })))
    }

    /// Steps in once and waits for the resulting pause, so the rewritten
    /// stack can be read.  Failures are reported to the console only.
    async fn step_into_edited_frame(&self) {
        let slots = self.notifier.slots();
        let (waiter, outcome) = slots.arm_next_pause();
        if outcome == ArmOutcome::Rearmed {
            debug!("next-pause slot was already armed; earlier live edit released");
        }

        match self
            .wire
            .request("continue", StepAction::Into.continue_arguments())
            .await
        {
            Ok(_) => {
                // Err means the slot was disarmed; either way the frames are
                // read now.
                let _ = waiter.await;
            }
            Err(e) => {
                slots.disarm_next_pause();
                warn!("step-in after live edit failed: {e}");
                self.frontend.send_log_to_console(
                    ConsoleLevel::Warning,
                    &format!("Cannot step into the edited function, the call stack may be stale: {e}"),
                );
            }
        }
    }

    async fn frames_or_empty(&self) -> Vec<CallFrame> {
        match self.notifier.fetch_call_frames().await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("cannot refresh call frames: {e}");
                self.frontend
                    .send_log_to_console(ConsoleLevel::Error, &format!("Cannot refresh call frames: {e}"));
                Vec::new()
            }
        }
    }

    // ── Breakpoints ───────────────────────────────────────────────────────────

    async fn set_pause_on_exceptions(&self, params: Value) -> HandlerResult {
        let SetPauseOnExceptionsParams { state } = parse_params(params)?;

        for_each_serial(
            "setexceptionbreak",
            state.exception_breaks(),
            StepPolicy::Fatal,
            |brk| async move {
                self.wire
                    .request("setexceptionbreak", Some(brk.arguments()))
                    .await
                    .map(|_| ())
            },
        )
        .await?;
        Ok(None)
    }

    async fn set_breakpoint_by_url(&self, params: Value) -> HandlerResult {
        if params.get("urlRegex").is_some_and(|v| !v.is_null()) {
            return Err(AgentError::Unsupported(
                "setBreakpointByUrl using a url regex is not supported".to_string(),
            ));
        }
        let SetBreakpointByUrlParams {
            url,
            line_number,
            column_number,
            condition,
        } = parse_params(params)?;
        let url = url.ok_or_else(|| AgentError::invalid_params("missing `url`"))?;

        let mut arguments = Map::new();
        arguments.insert("type".into(), json!("script"));
        arguments.insert("target".into(), json!(url_to_script_name(&url)));
        arguments.insert("line".into(), json!(line_number));
        if let Some(column) = column_number {
            arguments.insert("column".into(), json!(column));
        }
        if let Some(condition) = condition {
            arguments.insert("condition".into(), json!(condition));
        }

        let body = self
            .wire
            .request("setbreakpoint", Some(Value::Object(arguments)))
            .await?;
        let set: SetBreakpointBody = parse_body(body)?;
        let locations: Vec<Location> = set.actual_locations.iter().map(location_from_actual).collect();

        Ok(Some(json!({
            "breakpointId": set.breakpoint.to_string(),
            "locations": locations,
        })))
    }

    async fn remove_breakpoint(&self, params: Value) -> HandlerResult {
        let RemoveBreakpointParams { breakpoint_id } = parse_params(params)?;
        let id = parse_id(&breakpoint_id, "breakpointId")?;
        self.clear_breakpoint(id).await?;
        Ok(Some(Value::Null))
    }

    async fn set_breakpoints_active(&self, params: Value) -> HandlerResult {
        let SetBreakpointsActiveParams { active } = parse_params(params)?;

        let body = self.wire.request("listbreakpoints", None).await?;
        let list: BreakpointList = parse_body_or_default(body)?;
        let ids: Vec<u64> = list.breakpoints.iter().map(|bp| bp.number).collect();

        for_each_serial(
            "changebreakpoint",
            ids,
            StepPolicy::Fatal,
            |id| async move {
                self.wire
                    .request(
                        "changebreakpoint",
                        Some(json!({ "breakpoint": id, "enabled": active })),
                    )
                    .await
                    .map(|_| ())
            },
        )
        .await?;
        Ok(None)
    }

    async fn clear_breakpoint(&self, id: u64) -> Result<(), WireError> {
        self.wire
            .request("clearbreakpoint", Some(json!({ "breakpoint": id })))
            .await
            .map(|_| ())
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    async fn evaluate_on_call_frame(&self, params: Value) -> HandlerResult {
        let EvaluateOnCallFrameParams {
            call_frame_id,
            expression,
        } = parse_params(params)?;
        let frame: u32 = call_frame_id
            .parse()
            .map_err(|_| AgentError::invalid_params(format!("bad callFrameId `{call_frame_id}`")))?;

        let reply = self
            .wire
            .request("evaluate", Some(json!({ "expression": expression, "frame": frame })))
            .await;

        match reply {
            Ok(body) => Ok(Some(json!({
                "result": remote_object_from_wire(&body),
                "wasThrown": false,
            }))),
            // The debuggee reports a thrown expression as a rejected request.
            Err(WireError::Rejected { message }) => Ok(Some(json!({
                "result": exception_remote_object(&message),
                "wasThrown": true,
            }))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_function_details(&self, params: Value) -> HandlerResult {
        let GetFunctionDetailsParams { function_id } = parse_params(params)?;
        let handle = parse_id(&function_id, "functionId")?;

        let body = self
            .wire
            .request(
                "lookup",
                Some(json!({ "handles": [handle], "includeSource": false })),
            )
            .await?;
        let mirror = body.get(&function_id).ok_or_else(|| {
            WireError::Malformed(format!("lookup returned no mirror for handle {function_id}"))
        })?;

        Ok(Some(json!({
            "details": function_details_from_lookup(&function_id, mirror),
        })))
    }
}

#[async_trait]
impl DomainHandler for DebuggerAgent {
    fn methods(&self) -> Vec<&'static str> {
        DebuggerMethod::ALL.iter().map(|m| m.as_str()).collect()
    }

    async fn invoke(&self, method: &str, params: Value) -> HandlerResult {
        let Some(method) = DebuggerMethod::parse(method) else {
            return Err(AgentError::Unsupported(format!(
                "Debugger.{method} is not implemented"
            )));
        };

        match method {
            DebuggerMethod::Enable => self.enable().await,
            DebuggerMethod::Disable => self.disable().await,
            DebuggerMethod::Resume => self.continue_with(StepAction::None).await,
            DebuggerMethod::Pause => self.pause().await,
            DebuggerMethod::StepOver => self.continue_with(StepAction::Over).await,
            DebuggerMethod::StepInto => self.continue_with(StepAction::Into).await,
            DebuggerMethod::StepOut => self.continue_with(StepAction::Out).await,
            DebuggerMethod::ContinueToLocation => self.continue_to_location(params).await,
            DebuggerMethod::GetScriptSource => self.get_script_source(params).await,
            DebuggerMethod::SetScriptSource => self.set_script_source(params).await,
            DebuggerMethod::SetPauseOnExceptions => self.set_pause_on_exceptions(params).await,
            DebuggerMethod::SetBreakpointByUrl => self.set_breakpoint_by_url(params).await,
            DebuggerMethod::RemoveBreakpoint => self.remove_breakpoint(params).await,
            DebuggerMethod::SetBreakpointsActive => self.set_breakpoints_active(params).await,
            DebuggerMethod::EvaluateOnCallFrame => self.evaluate_on_call_frame(params).await,
            DebuggerMethod::GetFunctionDetails => self.get_function_details(params).await,
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, AgentError> {
    serde_json::from_value(params).map_err(|e| AgentError::invalid_params(e.to_string()))
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, WireError> {
    serde_json::from_value(body).map_err(|e| WireError::Malformed(e.to_string()))
}

/// Like [`parse_body`], but an absent body means "nothing".
fn parse_body_or_default<T: DeserializeOwned + Default>(body: Value) -> Result<T, WireError> {
    if body.is_null() {
        return Ok(T::default());
    }
    parse_body(body)
}

/// Front-end ids are decimal strings of backend numbers.
fn parse_id(raw: &str, field: &str) -> Result<u64, AgentError> {
    raw.parse()
        .map_err(|_| AgentError::invalid_params(format!("`{field}` must be numeric, got `{raw}`")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
