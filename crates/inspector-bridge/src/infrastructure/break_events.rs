//! Turning backend `break` / `exception` events into `Debugger.paused`.
//!
//! [`BreakEventHandler`] is the production [`BreakNotifier`].  It owns the
//! [`PauseSlots`] the debugger domain uses to intercept the next pause
//! (after a live edit) and to clean up a continue-to-location breakpoint.
//!
//! On `break`:
//!
//! 1. a recorded continue-to breakpoint is cleared (failures are logged);
//! 2. if the next-pause slot is armed, it is fired and nothing is emitted,
//!    because the waiting command reports the new frames itself;
//! 3. otherwise `Debugger.paused` is sent with the hit breakpoint ids.
//!
//! On `exception`, `Debugger.paused` is sent with reason `exception` and the
//! thrown value as `data`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use inspector_core::protocol::BacktraceBody;

use crate::application::pause_slots::PauseSlots;
use crate::application::ports::{BreakNotifier, FrontendChannel, PauseContext, WireClient, WireError};
use crate::application::translate::{call_frame_from_wire, exception_remote_object, remote_object_from_wire};
use crate::domain::messages::{CallFrame, ConsoleLevel, Event};

pub struct BreakEventHandler {
    wire: Arc<dyn WireClient>,
    frontend: Arc<dyn FrontendChannel>,
    slots: PauseSlots,
}

impl BreakEventHandler {
    pub fn new(wire: Arc<dyn WireClient>, frontend: Arc<dyn FrontendChannel>) -> Self {
        Self {
            wire,
            frontend,
            slots: PauseSlots::new(),
        }
    }

    /// Handles the body of a backend `break` event.
    pub async fn handle_break(&self, body: &Value) {
        let continue_to = self.slots.take_continue_to();
        if let Some(id) = continue_to {
            if let Err(e) = self
                .wire
                .request("clearbreakpoint", Some(json!({ "breakpoint": id })))
                .await
            {
                warn!(breakpoint = id, "cannot clear continue-to breakpoint: {e}");
            }
        }

        if self.slots.fire_next_pause() {
            debug!("pause delivered to waiting command");
            return;
        }

        let hit_breakpoints: Vec<u64> = body
            .get("breakpoints")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_u64)
                    .filter(|id| Some(*id) != continue_to)
                    .collect()
            })
            .unwrap_or_default();

        // A failed emit has already been reported to the console.
        let _ = self
            .emit_pause(PauseContext {
                exception: None,
                hit_breakpoints,
            })
            .await;
    }

    /// Handles the body of a backend `exception` event.
    pub async fn handle_exception(&self, body: &Value) {
        let exception = body
            .get("exception")
            .map(remote_object_from_wire)
            .unwrap_or_else(|| exception_remote_object("Uncaught exception"));

        let _ = self
            .emit_pause(PauseContext {
                exception: Some(exception),
                hit_breakpoints: Vec::new(),
            })
            .await;
    }
}

#[async_trait]
impl BreakNotifier for BreakEventHandler {
    async fn emit_pause(&self, context: PauseContext) -> Result<(), WireError> {
        match self.fetch_call_frames().await {
            Ok(frames) => {
                self.frontend
                    .send_event(Event::paused(&context.into_params(frames)));
                Ok(())
            }
            Err(e) => {
                warn!("cannot read call frames for pause: {e}");
                self.frontend.send_log_to_console(
                    ConsoleLevel::Error,
                    &format!("Cannot read the call stack of the paused debuggee: {e}"),
                );
                Err(e)
            }
        }
    }

    async fn fetch_call_frames(&self) -> Result<Vec<CallFrame>, WireError> {
        let body = self
            .wire
            .request("backtrace", Some(json!({ "inlineRefs": true })))
            .await?;
        let backtrace: BacktraceBody = if body.is_null() {
            BacktraceBody::default()
        } else {
            serde_json::from_value(body).map_err(|e| WireError::Malformed(e.to_string()))?
        };
        Ok(backtrace.frames.iter().map(call_frame_from_wire).collect())
    }

    fn slots(&self) -> &PauseSlots {
        &self.slots
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::mock::{RecordingFrontend, ScriptedWire};

    fn backtrace_body() -> Value {
        json!({
            "fromFrame": 0, "toFrame": 1, "totalFrames": 1,
            "frames": [{
                "index": 0,
                "receiver": {"type": "object", "className": "global", "ref": 2},
                "func": {"type": "function", "name": "tick", "scriptId": 31, "ref": 3},
                "line": 9, "column": 4,
                "scopes": [{"type": 1, "index": 0}, {"type": 0, "index": 1}]
            }]
        })
    }

    fn setup() -> (Arc<ScriptedWire>, Arc<RecordingFrontend>, BreakEventHandler) {
        let wire = Arc::new(ScriptedWire::new());
        let frontend = Arc::new(RecordingFrontend::new());
        wire.reply("backtrace", backtrace_body());
        let handler = BreakEventHandler::new(wire.clone(), frontend.clone());
        (wire, frontend, handler)
    }

    #[tokio::test]
    async fn test_break_emits_paused_with_hit_breakpoints() {
        // Arrange
        let (wire, frontend, handler) = setup();

        // Act
        handler.handle_break(&json!({"breakpoints": [2, 7]})).await;

        // Assert
        assert_eq!(wire.commands(), vec!["backtrace"]);
        let params = frontend.events()[0].params.clone().unwrap();
        assert_eq!(params["reason"], json!("other"));
        assert_eq!(params["hitBreakpoints"], json!(["2", "7"]));
        assert_eq!(params["callFrames"][0]["functionName"], json!("tick"));
        assert_eq!(params["callFrames"][0]["scopeChain"][0]["type"], json!("local"));
    }

    #[tokio::test]
    async fn test_break_clears_continue_to_breakpoint_first() {
        let (wire, frontend, handler) = setup();
        handler.slots().set_continue_to(12);

        handler.handle_break(&json!({"breakpoints": [12]})).await;

        assert_eq!(wire.commands(), vec!["clearbreakpoint", "backtrace"]);
        assert_eq!(wire.calls()[0].arguments, Some(json!({"breakpoint": 12})));
        assert_eq!(handler.slots().take_continue_to(), None);
        let params = frontend.events()[0].params.clone().unwrap();
        assert!(params.get("hitBreakpoints").is_none());
    }

    #[tokio::test]
    async fn test_break_with_armed_slot_fires_and_emits_nothing() {
        let (wire, frontend, handler) = setup();
        let (waiter, _) = handler.slots().arm_next_pause();

        handler.handle_break(&json!({})).await;

        assert!(waiter.await.is_ok());
        assert!(wire.calls().is_empty());
        assert!(frontend.events().is_empty());
    }

    #[tokio::test]
    async fn test_exception_emits_reason_exception_with_data() {
        let (_wire, frontend, handler) = setup();

        handler
            .handle_exception(&json!({
                "uncaught": true,
                "exception": {"type": "error", "className": "TypeError", "text": "TypeError: x is not a function", "handle": 14}
            }))
            .await;

        let params = frontend.events()[0].params.clone().unwrap();
        assert_eq!(params["reason"], json!("exception"));
        assert_eq!(params["data"]["className"], json!("TypeError"));
    }

    #[tokio::test]
    async fn test_failed_backtrace_is_reported_to_console() {
        let (wire, frontend, handler) = setup();
        wire.fail("backtrace", WireError::Closed);
        // The scripted success is consumed first.
        let _ = handler.fetch_call_frames().await;

        let result = handler.emit_pause(PauseContext::default()).await;

        assert_eq!(result, Err(WireError::Closed));
        assert_eq!(frontend.console_messages()[0].0, "error");
        assert!(frontend.event_methods().iter().all(|m| m != "Debugger.paused"));
    }
}
