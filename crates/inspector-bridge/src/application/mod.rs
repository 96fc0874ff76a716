//! Application layer: command routing and the `Debugger` domain.
//!
//! This layer decides *what* happens for each front-end command.  It reaches
//! the debuggee and the front end only through the traits in [`ports`], so
//! every use case can be exercised in tests with the doubles in
//! [`ports::mock`].
//!
//! - [`dispatcher`]: routes `Domain.method` commands to handlers and
//!   guarantees at most one response per command id.
//! - [`debugger_agent`]: the `Debugger` domain.
//! - [`pipeline`]: sequential multi-step workflows with per-step failure
//!   policies.
//! - [`pause_slots`]: the next-pause and continue-to slots shared between
//!   the domain and the break notifier.
//! - [`translate`]: pure shape conversions between the two protocols.

pub mod debugger_agent;
pub mod dispatcher;
pub mod errors;
pub mod pause_slots;
pub mod pipeline;
pub mod ports;
pub mod translate;

pub use debugger_agent::{DebuggerAgent, DebuggerMethod};
pub use dispatcher::{DispatchOutcome, Dispatcher, DomainHandler, HandlerResult, StaticReply};
pub use errors::{AgentError, DispatchError};
pub use pause_slots::{ArmOutcome, PauseSlots};
pub use pipeline::{for_each_serial, StepPolicy, Waterfall};
