//! Debugger concepts shared by both protocols.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::messages::LiveEditResult;

// ── Stepping ──────────────────────────────────────────────────────────────────

/// What the debuggee should do when it resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Plain continue.
    None,
    /// Step into the next call.
    Into,
    /// Step over to the next statement.
    Over,
    /// Run until the current function returns.
    Out,
}

impl StepAction {
    /// The `stepaction` argument value, or `None` for a plain continue.
    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            StepAction::None => None,
            StepAction::Into => Some("in"),
            StepAction::Over => Some("next"),
            StepAction::Out => Some("out"),
        }
    }

    /// Arguments for the `continue` request.
    ///
    /// A plain continue sends no arguments at all rather than an empty object.
    pub fn continue_arguments(self) -> Option<Value> {
        self.wire_name().map(|name| json!({ "stepaction": name }))
    }
}

// ── Live edit ─────────────────────────────────────────────────────────────────

/// How a successful live edit affected the paused stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEditOutcome {
    /// No frame on the stack ran the edited code.
    Unchanged,
    /// Frames were dropped/restarted; the stack must be re-read.
    StackModified,
    /// The debuggee is between frames and needs one step-in before the new
    /// stack can be read.
    StepInRequired,
}

impl From<&LiveEditResult> for LiveEditOutcome {
    fn from(result: &LiveEditResult) -> Self {
        if result.stack_update_needs_step_in {
            LiveEditOutcome::StepInRequired
        } else if result.stack_modified {
            LiveEditOutcome::StackModified
        } else {
            LiveEditOutcome::Unchanged
        }
    }
}

// ── Exceptions ────────────────────────────────────────────────────────────────

/// The front end's tri-state pause-on-exceptions mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseOnExceptions {
    None,
    Uncaught,
    All,
}

/// Backend exception-break category (`setexceptionbreak` `type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCategory {
    All,
    Uncaught,
}

impl ExceptionCategory {
    pub fn wire_name(self) -> &'static str {
        match self {
            ExceptionCategory::All => "all",
            ExceptionCategory::Uncaught => "uncaught",
        }
    }
}

/// One `setexceptionbreak` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionBreak {
    pub category: ExceptionCategory,
    pub enabled: bool,
}

impl ExceptionBreak {
    pub fn arguments(self) -> Value {
        json!({ "type": self.category.wire_name(), "enabled": self.enabled })
    }
}

impl PauseOnExceptions {
    /// The two backend switches, in the order they must be sent.
    ///
    /// At most one of them is enabled.
    pub fn exception_breaks(self) -> [ExceptionBreak; 2] {
        [
            ExceptionBreak {
                category: ExceptionCategory::All,
                enabled: self == PauseOnExceptions::All,
            },
            ExceptionBreak {
                category: ExceptionCategory::Uncaught,
                enabled: self == PauseOnExceptions::Uncaught,
            },
        ]
    }
}

// ── Scopes ────────────────────────────────────────────────────────────────────

/// Maps a V8 scope type code to the front-end scope type name.
pub fn scope_type_name(code: u8) -> &'static str {
    match code {
        0 => "global",
        1 => "local",
        2 => "with",
        3 => "closure",
        4 => "catch",
        5 => "block",
        6 => "script",
        _ => "local",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_continue_sends_no_arguments() {
        assert_eq!(StepAction::None.continue_arguments(), None);
    }

    #[test]
    fn test_step_actions_use_wire_names() {
        assert_eq!(StepAction::Into.continue_arguments(), Some(json!({"stepaction": "in"})));
        assert_eq!(StepAction::Over.continue_arguments(), Some(json!({"stepaction": "next"})));
        assert_eq!(StepAction::Out.continue_arguments(), Some(json!({"stepaction": "out"})));
    }

    #[test]
    fn test_live_edit_without_flags_is_unchanged() {
        let outcome = LiveEditOutcome::from(&LiveEditResult::default());
        assert_eq!(outcome, LiveEditOutcome::Unchanged);
    }

    #[test]
    fn test_live_edit_stack_modified() {
        let result = LiveEditResult {
            stack_modified: true,
            stack_update_needs_step_in: false,
        };
        assert_eq!(LiveEditOutcome::from(&result), LiveEditOutcome::StackModified);
    }

    #[test]
    fn test_live_edit_step_in_wins_over_stack_modified() {
        let result = LiveEditResult {
            stack_modified: true,
            stack_update_needs_step_in: true,
        };
        assert_eq!(LiveEditOutcome::from(&result), LiveEditOutcome::StepInRequired);
    }

    #[test]
    fn test_pause_on_all_exceptions_maps_to_break_on_all_only() {
        let [all, uncaught] = PauseOnExceptions::All.exception_breaks();
        assert_eq!(all.arguments(), json!({"type": "all", "enabled": true}));
        assert_eq!(uncaught.arguments(), json!({"type": "uncaught", "enabled": false}));
    }

    #[test]
    fn test_pause_on_uncaught_maps_to_break_on_uncaught_only() {
        let [all, uncaught] = PauseOnExceptions::Uncaught.exception_breaks();
        assert!(!all.enabled);
        assert!(uncaught.enabled);
    }

    #[test]
    fn test_pause_on_none_disables_both() {
        let breaks = PauseOnExceptions::None.exception_breaks();
        assert!(breaks.iter().all(|b| !b.enabled));
    }

    #[test]
    fn test_pause_on_exceptions_parses_lowercase() {
        let state: PauseOnExceptions = serde_json::from_value(json!("uncaught")).unwrap();
        assert_eq!(state, PauseOnExceptions::Uncaught);
        assert!(serde_json::from_value::<PauseOnExceptions>(json!("sometimes")).is_err());
    }

    #[test]
    fn test_scope_type_names() {
        assert_eq!(scope_type_name(0), "global");
        assert_eq!(scope_type_name(3), "closure");
        assert_eq!(scope_type_name(6), "script");
    }
}
