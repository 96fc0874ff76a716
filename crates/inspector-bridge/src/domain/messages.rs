//! JSON message types for the front-end debugging protocol.
//!
//! The front end speaks three kinds of message over its WebSocket:
//!
//! ```json
//! {"id":7,"method":"Debugger.pause","params":{}}                 // command
//! {"id":7,"error":null}                                         // response
//! {"method":"Debugger.resumed"}                                 // event
//! ```
//!
//! A command without an `id` is a notification: it is executed but never
//! answered.  Every response carries the `id` of the command it answers;
//! events never carry one.
//!
//! The result shapes further down (`Location`, `RemoteObject`, `CallFrame`,
//! ...) are what the debugger domain hands back inside `result` or event
//! `params`.  They use the front end's camelCase field names.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ── Envelope ──────────────────────────────────────────────────────────────────

/// An inbound command from the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Opaque request id; `None` (absent or `null`) marks a notification.
    #[serde(default)]
    pub id: Option<Value>,
    /// Full method name, `"Domain.method"`.
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Command {
    /// `true` when no response may be sent for this command.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Splits `"Domain.method"` into its two halves.
///
/// Returns `None` when there is no separator or either half is empty.
pub fn split_method(full: &str) -> Option<(&str, &str)> {
    match full.split_once('.') {
        Some((domain, method)) if !domain.is_empty() && !method.is_empty() => {
            Some((domain, method))
        }
        _ => None,
    }
}

/// The single answer to a command that carried an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    /// Error message, serialised as `null` on success.
    pub error: Option<String>,
    /// Omitted entirely when the method produced no result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    pub fn success(id: Value, result: Option<Value>) -> Self {
        Self {
            id,
            error: None,
            result,
        }
    }

    pub fn failure(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(message.into()),
            result: None,
        }
    }
}

/// An outbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Event {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params: Some(params),
        }
    }

    /// An event with no parameters.
    pub fn bare(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    pub fn resumed() -> Self {
        Self::bare("Debugger.resumed")
    }

    pub fn paused(params: &PausedParams) -> Self {
        // PausedParams only holds strings, numbers and Values; serialisation
        // cannot fail.
        Self::new(
            "Debugger.paused",
            serde_json::to_value(params).unwrap_or(Value::Null),
        )
    }

    pub fn console_message(level: ConsoleLevel, text: &str) -> Self {
        Self::new(
            "Console.messageAdded",
            json!({
                "message": {
                    "source": "other",
                    "level": level.as_str(),
                    "text": text,
                }
            }),
        )
    }

    pub fn detached(reason: &str) -> Self {
        Self::new("Inspector.detached", json!({ "reason": reason }))
    }
}

/// Severity of a message written to the front-end console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Warning,
    Error,
}

impl ConsoleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Warning => "warning",
            ConsoleLevel::Error => "error",
        }
    }
}

// ── Result shapes ─────────────────────────────────────────────────────────────

/// A position in a script, as the front end addresses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Front-end script id (the decimal string of the backend id).
    pub script_id: String,
    pub line_number: u32,
    #[serde(default)]
    pub column_number: u32,
}

/// A mirror of a value in the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// `object`, `function`, `undefined`, `string`, `number` or `boolean`.
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Handle for later property lookups; absent for primitives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Primitive value; `Some(Value::Null)` serialises as `"value": null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One entry of a frame's scope chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: String,
    pub object: RemoteObject,
}

/// A stack frame snapshot at a pause point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    /// The frame index as a string; `evaluateOnCallFrame` parses it back.
    pub call_frame_id: String,
    pub function_name: String,
    pub location: Location,
    pub scope_chain: Vec<Scope>,
    pub this: RemoteObject,
}

/// `Debugger.paused` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedParams {
    pub call_frames: Vec<CallFrame>,
    /// `"other"` or `"exception"`.
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hit_breakpoints: Vec<String>,
}

/// `Debugger.getFunctionDetails` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDetails {
    pub location: Location,
    pub function_name: String,
    pub scope_chain: Vec<Scope>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_without_id_is_notification() {
        // Arrange / Act
        let cmd: Command = serde_json::from_str(r#"{"method":"Debugger.resumed"}"#).unwrap();

        // Assert
        assert!(cmd.is_notification());
        assert_eq!(cmd.params, Value::Null);
    }

    #[test]
    fn test_command_with_null_id_is_notification() {
        let cmd: Command =
            serde_json::from_str(r#"{"id":null,"method":"Debugger.pause"}"#).unwrap();
        assert!(cmd.is_notification());
    }

    #[test]
    fn test_command_keeps_opaque_id() {
        let cmd: Command =
            serde_json::from_str(r#"{"id":"abc","method":"Debugger.pause","params":{}}"#).unwrap();
        assert_eq!(cmd.id, Some(json!("abc")));
    }

    #[test]
    fn test_split_method() {
        assert_eq!(split_method("Debugger.pause"), Some(("Debugger", "pause")));
        assert_eq!(split_method("Debugger"), None);
        assert_eq!(split_method(".pause"), None);
        assert_eq!(split_method("Debugger."), None);
    }

    #[test]
    fn test_success_without_result_serialises_null_error_and_no_result() {
        // The front end distinguishes "result absent" from "result: null".
        let json = serde_json::to_value(Response::success(json!(7), None)).unwrap();
        assert_eq!(json, json!({"id": 7, "error": null}));
    }

    #[test]
    fn test_success_with_null_result_keeps_the_field() {
        let json = serde_json::to_value(Response::success(json!(7), Some(Value::Null))).unwrap();
        assert_eq!(json, json!({"id": 7, "error": null, "result": null}));
    }

    #[test]
    fn test_failure_carries_message() {
        let json = serde_json::to_value(Response::failure(json!(3), "boom")).unwrap();
        assert_eq!(json, json!({"id": 3, "error": "boom"}));
    }

    #[test]
    fn test_bare_event_has_no_params() {
        let json = serde_json::to_value(Event::resumed()).unwrap();
        assert_eq!(json, json!({"method": "Debugger.resumed"}));
    }

    #[test]
    fn test_null_remote_object_serialises_null_value() {
        let obj = RemoteObject {
            object_type: "object".to_string(),
            subtype: Some("null".to_string()),
            object_id: None,
            class_name: None,
            value: Some(Value::Null),
            description: Some("null".to_string()),
        };
        let json = serde_json::to_value(obj).unwrap();
        assert_eq!(
            json,
            json!({"type": "object", "subtype": "null", "value": null, "description": "null"})
        );
    }

    #[test]
    fn test_console_message_event_shape() {
        let event = Event::console_message(ConsoleLevel::Warning, "stale stack");
        assert_eq!(event.method, "Console.messageAdded");
        assert_eq!(
            event.params.unwrap()["message"]["level"],
            json!("warning")
        );
    }
}
