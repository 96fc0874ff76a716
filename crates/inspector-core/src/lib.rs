//! # inspector-core
//!
//! Shared library for the inspector bridge containing the V8 debugger wire
//! protocol types, the `Content-Length` framing codec, and the small debugger
//! domain vocabulary (step actions, live-edit outcomes, exception-break modes)
//! that both sides of the bridge agree on.
//!
//! It has zero dependencies on async runtimes, sockets, or the front-end
//! protocol.
//!
//! # Architecture overview
//!
//! The bridge sits between a DevTools front end and a runtime that speaks the
//! V8 debugger protocol.  This crate is the backend-facing foundation:
//!
//! - **`protocol`** – How bytes travel to and from the debuggee.  Requests are
//!   JSON bodies framed with HTTP-like headers (`Content-Length: N\r\n\r\n`),
//!   and the debuggee answers with responses and unsolicited events in the
//!   same framing.
//!
//! - **`domain`** – Pure debugger concepts with no I/O: what a step action is
//!   called on the wire, how the two live-edit flags collapse into one
//!   outcome, and how the front end's tri-state exception mode becomes two
//!   backend booleans.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `inspector_core::WireRequest` instead of the full module path.
pub use domain::debugger::{ExceptionBreak, LiveEditOutcome, PauseOnExceptions, StepAction};
pub use protocol::codec::{decode_frame, encode_request, CodecError, WireFrame};
pub use protocol::messages::{WireEvent, WireMessage, WireRequest, WireResponse};
