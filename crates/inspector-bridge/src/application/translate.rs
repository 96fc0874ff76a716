//! Pure translations between backend wire shapes and front-end result shapes.
//!
//! Nothing here does I/O; every function maps one value to another.

use serde_json::{json, Value};

use inspector_core::domain::debugger::scope_type_name;
use inspector_core::protocol::{ActualLocation, ScopeRef, ScriptDescriptor, StackFrame};

use crate::domain::messages::{CallFrame, FunctionDetails, Location, RemoteObject, Scope};

/// Longest description sent to the front end, in characters.
const MAX_DESCRIPTION_CHARS: usize = 100;

// ── Script names ──────────────────────────────────────────────────────────────

/// Converts a backend script name (a file path) to a front-end URL.
///
/// ```rust
/// use inspector_bridge::application::translate::script_name_to_url;
///
/// assert_eq!(script_name_to_url("/app/index.js"), "file:///app/index.js");
/// assert_eq!(script_name_to_url("C:\\app\\index.js"), "file:///C:/app/index.js");
/// assert_eq!(script_name_to_url("node.js"), "node.js");
/// ```
pub fn script_name_to_url(name: &str) -> String {
    if name.starts_with('/') {
        return format!("file://{name}");
    }
    if is_windows_path(name) {
        return format!("file:///{}", name.replace('\\', "/"));
    }
    name.to_string()
}

/// Inverse of [`script_name_to_url`].
pub fn url_to_script_name(url: &str) -> String {
    let Some(path) = url.strip_prefix("file://") else {
        return url.to_string();
    };
    // file:///C:/dir/f.js → C:\dir\f.js
    if let Some(rest) = path.strip_prefix('/') {
        if is_windows_path(rest) {
            return rest.replace('/', "\\");
        }
    }
    path.to_string()
}

/// `C:\...` or `C:/...`.
fn is_windows_path(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

// ── Locations ─────────────────────────────────────────────────────────────────

pub fn location_from_actual(actual: &ActualLocation) -> Location {
    Location {
        script_id: actual.script_id.to_string(),
        line_number: actual.line,
        column_number: actual.column,
    }
}

/// `Debugger.scriptParsed` parameters for a newly registered script.
pub fn script_parsed_params(script: &ScriptDescriptor, url: &str) -> Value {
    json!({
        "scriptId": script.id.to_string(),
        "url": url,
        "startLine": script.line_offset,
        "startColumn": script.column_offset,
        "endLine": script.line_offset + script.line_count,
        "endColumn": 0,
        "isContentScript": false,
    })
}

// ── Values ────────────────────────────────────────────────────────────────────

/// Converts a V8 value mirror (`{handle|ref, type, value?, className?,
/// text?, ...}`) into a front-end remote object.
pub fn remote_object_from_wire(mirror: &Value) -> RemoteObject {
    let wire_type = mirror.get("type").and_then(Value::as_str).unwrap_or("undefined");
    let text = mirror.get("text").and_then(Value::as_str);
    let class_name = mirror.get("className").and_then(Value::as_str);

    match wire_type {
        "undefined" => primitive("undefined", None, "undefined".to_string()),
        "null" => RemoteObject {
            object_type: "object".to_string(),
            subtype: Some("null".to_string()),
            object_id: None,
            class_name: None,
            value: Some(Value::Null),
            description: Some("null".to_string()),
        },
        "boolean" | "number" | "string" => {
            let value = mirror.get("value").cloned().unwrap_or(Value::Null);
            let description = match (text, &value) {
                (Some(t), _) => t.to_string(),
                (None, Value::String(s)) => s.clone(),
                (None, other) => other.to_string(),
            };
            primitive(wire_type, Some(value), description)
        }
        "function" => {
            let name = mirror.get("name").and_then(Value::as_str).unwrap_or("");
            let description = text
                .map(str::to_string)
                .unwrap_or_else(|| format!("function {name}()"));
            object("function", None, mirror, Some("Function"), description)
        }
        "regexp" => {
            let description = text.unwrap_or("RegExp").to_string();
            object("object", Some("regexp"), mirror, Some("RegExp"), description)
        }
        "error" => {
            let description = text.unwrap_or("Error").to_string();
            object("object", None, mirror, Some(class_name.unwrap_or("Error")), description)
        }
        _ => {
            let class_name = class_name.unwrap_or("Object");
            let subtype = (class_name == "Array").then_some("array");
            let description = text.unwrap_or(class_name).to_string();
            object("object", subtype, mirror, Some(class_name), description)
        }
    }
}

/// The object reported for an expression that threw inside `evaluate`.
pub fn exception_remote_object(message: &str) -> RemoteObject {
    RemoteObject {
        object_type: "object".to_string(),
        subtype: None,
        object_id: Some("ERROR".to_string()),
        class_name: Some("Error".to_string()),
        value: None,
        description: Some(message.to_string()),
    }
}

fn primitive(object_type: &str, value: Option<Value>, description: String) -> RemoteObject {
    RemoteObject {
        object_type: object_type.to_string(),
        subtype: None,
        object_id: None,
        class_name: None,
        value,
        description: Some(truncate(description)),
    }
}

fn object(
    object_type: &str,
    subtype: Option<&str>,
    mirror: &Value,
    class_name: Option<&str>,
    description: String,
) -> RemoteObject {
    RemoteObject {
        object_type: object_type.to_string(),
        subtype: subtype.map(str::to_string),
        object_id: mirror_handle(mirror).map(|h| h.to_string()),
        class_name: class_name.map(str::to_string),
        value: None,
        description: Some(truncate(description)),
    }
}

/// `handle` on looked-up mirrors, `ref` on inlined ones.
fn mirror_handle(mirror: &Value) -> Option<i64> {
    mirror
        .get("handle")
        .or_else(|| mirror.get("ref"))
        .and_then(Value::as_i64)
}

fn truncate(description: String) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_CHARS {
        return description;
    }
    let mut short: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
    short.push('…');
    short
}

// ── Frames and functions ──────────────────────────────────────────────────────

/// Builds a front-end call frame from one `backtrace` frame.
pub fn call_frame_from_wire(frame: &StackFrame) -> CallFrame {
    let scope_chain = frame
        .scopes
        .iter()
        .map(|scope| scope_object(&format!("scope:{}:{}", frame.index, scope.index), scope))
        .collect();

    CallFrame {
        call_frame_id: frame.index.to_string(),
        function_name: function_name(&frame.func),
        location: Location {
            script_id: script_id_of(&frame.func),
            line_number: frame.line,
            column_number: frame.column,
        },
        scope_chain,
        this: remote_object_from_wire(&frame.receiver),
    }
}

/// Builds `getFunctionDetails` from a function mirror returned by `lookup`.
pub fn function_details_from_lookup(function_id: &str, mirror: &Value) -> FunctionDetails {
    let scopes: Vec<ScopeRef> = mirror
        .get("scopes")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    FunctionDetails {
        location: Location {
            script_id: script_id_of(mirror),
            line_number: u32_field(mirror, "line"),
            column_number: u32_field(mirror, "column"),
        },
        function_name: function_name(mirror),
        scope_chain: scopes
            .iter()
            .map(|scope| scope_object(&format!("scope:fn{function_id}:{}", scope.index), scope))
            .collect(),
    }
}

fn scope_object(object_id: &str, scope: &ScopeRef) -> Scope {
    Scope {
        scope_type: scope_type_name(scope.scope_type).to_string(),
        object: RemoteObject {
            object_type: "object".to_string(),
            subtype: None,
            object_id: Some(object_id.to_string()),
            class_name: Some("Object".to_string()),
            value: None,
            description: Some("Object".to_string()),
        },
    }
}

/// `name`, falling back to `inferredName` for anonymous functions.
fn function_name(func: &Value) -> String {
    ["name", "inferredName"]
        .iter()
        .filter_map(|key| func.get(*key).and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .unwrap_or("")
        .to_string()
}

fn script_id_of(func: &Value) -> String {
    func.get("scriptId")
        .and_then(Value::as_u64)
        .map(|id| id.to_string())
        .unwrap_or_default()
}

fn u32_field(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_path_round_trips_through_url() {
        let url = script_name_to_url("/srv/app/main.js");
        assert_eq!(url, "file:///srv/app/main.js");
        assert_eq!(url_to_script_name(&url), "/srv/app/main.js");
    }

    #[test]
    fn test_windows_path_round_trips_through_url() {
        let url = script_name_to_url("C:\\srv\\main.js");
        assert_eq!(url, "file:///C:/srv/main.js");
        assert_eq!(url_to_script_name(&url), "C:\\srv\\main.js");
    }

    #[test]
    fn test_non_file_names_are_unchanged() {
        assert_eq!(script_name_to_url("events.js"), "events.js");
        assert_eq!(url_to_script_name("http://host/x.js"), "http://host/x.js");
    }

    #[test]
    fn test_location_script_id_is_a_string() {
        let loc = location_from_actual(&ActualLocation {
            script_id: 31,
            line: 10,
            column: 2,
        });
        assert_eq!(loc.script_id, "31");
        assert_eq!((loc.line_number, loc.column_number), (10, 2));
    }

    #[test]
    fn test_number_mirror_becomes_primitive() {
        let obj = remote_object_from_wire(&json!({"handle": 5, "type": "number", "value": 42, "text": "42"}));
        assert_eq!(obj.object_type, "number");
        assert_eq!(obj.value, Some(json!(42)));
        assert_eq!(obj.description.as_deref(), Some("42"));
        assert!(obj.object_id.is_none());
    }

    #[test]
    fn test_null_mirror_becomes_null_object() {
        let obj = remote_object_from_wire(&json!({"type": "null"}));
        assert_eq!(obj.object_type, "object");
        assert_eq!(obj.subtype.as_deref(), Some("null"));
        assert_eq!(obj.value, Some(Value::Null));
    }

    #[test]
    fn test_object_mirror_carries_handle_and_class() {
        let obj = remote_object_from_wire(&json!({"ref": 17, "type": "object", "className": "Request"}));
        assert_eq!(obj.object_id.as_deref(), Some("17"));
        assert_eq!(obj.class_name.as_deref(), Some("Request"));
        assert_eq!(obj.description.as_deref(), Some("Request"));
    }

    #[test]
    fn test_long_description_is_truncated() {
        let long = "x".repeat(150);
        let obj = remote_object_from_wire(&json!({"type": "string", "value": long}));
        let description = obj.description.unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS + 1);
        assert!(description.ends_with('…'));
    }

    #[test]
    fn test_call_frame_from_backtrace_frame() {
        // Arrange
        let frame: StackFrame = serde_json::from_value(json!({
            "index": 1,
            "receiver": {"ref": 3, "type": "object", "className": "global"},
            "func": {"ref": 4, "type": "function", "name": "", "inferredName": "handler", "scriptId": 31},
            "line": 12,
            "column": 4,
            "scopes": [{"type": 1, "index": 0}, {"type": 0, "index": 1}]
        }))
        .unwrap();

        // Act
        let cf = call_frame_from_wire(&frame);

        // Assert
        assert_eq!(cf.call_frame_id, "1");
        assert_eq!(cf.function_name, "handler");
        assert_eq!(cf.location.script_id, "31");
        assert_eq!(cf.scope_chain[0].scope_type, "local");
        assert_eq!(cf.scope_chain[1].scope_type, "global");
        assert_eq!(cf.scope_chain[1].object.object_id.as_deref(), Some("scope:1:1"));
        assert_eq!(cf.this.class_name.as_deref(), Some("global"));
    }

    #[test]
    fn test_function_details_from_lookup_mirror() {
        let mirror = json!({
            "handle": 9, "type": "function", "name": "main", "scriptId": 31,
            "line": 3, "column": 15, "scopes": [{"type": 3, "index": 0}]
        });

        let details = function_details_from_lookup("9", &mirror);

        assert_eq!(details.function_name, "main");
        assert_eq!(details.location.line_number, 3);
        assert_eq!(details.scope_chain[0].scope_type, "closure");
    }

    #[test]
    fn test_script_parsed_params_use_string_id_and_url() {
        let script = ScriptDescriptor {
            id: 31,
            name: Some("/app/index.js".to_string()),
            line_offset: 0,
            column_offset: 0,
            line_count: 40,
            source: None,
            source_length: None,
        };

        let params = script_parsed_params(&script, "file:///app/index.js");

        assert_eq!(params["scriptId"], json!("31"));
        assert_eq!(params["endLine"], json!(40));
        assert_eq!(params["isContentScript"], json!(false));
    }
}
