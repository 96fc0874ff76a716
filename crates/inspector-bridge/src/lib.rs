//! inspector-bridge library crate.
//!
//! Lets a DevTools front end debug a process that only speaks the V8
//! debugger protocol.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! DevTools front end (JSON commands/events over WebSocket)
//!         ↕
//! [inspector-bridge]
//!   ├── domain/           Pure types: front-end messages, BridgeConfig
//!   ├── application/      Dispatcher, Debugger domain, ports, translation
//!   └── infrastructure/
//!         ├── ws_server/      WebSocket accept loop and session wiring
//!         ├── debuggee_conn/  TCP connection to the debuggee (inspector-core codec)
//!         ├── break_events/   break/exception → Debugger.paused
//!         ├── script_store/   loaded scripts → Debugger.scriptParsed
//!         └── config_file/    TOML configuration
//!         ↕
//! Debuggee (V8 debugger protocol, Content-Length framed JSON over TCP)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `inspector-core`, and reaches the
//!   outside world only through the traits in `application::ports`.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tokio-tungstenite`.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: routing and debugger semantics.
pub mod application;

/// Infrastructure layer: sockets, sessions and port implementations.
pub mod infrastructure;
