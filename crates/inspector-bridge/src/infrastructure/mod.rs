//! Infrastructure layer for inspector-bridge.
//!
//! The infrastructure layer handles all I/O: accepting WebSocket connections
//! from DevTools front ends, talking to the debuggee over TCP, and reading
//! the configuration file.  It also provides the production implementations
//! of the application ports.
//!
//! # What does NOT belong here?
//!
//! - Command routing and debugger semantics (application layer)
//! - Message type definitions (domain layer)

pub mod break_events;
pub mod config_file;
pub mod debuggee_conn;
pub mod frontend_sink;
pub mod script_store;
pub mod ws_server;

pub use break_events::BreakEventHandler;
pub use config_file::{load_config_file, ConfigError};
pub use debuggee_conn::{BackendNotice, DebuggeeConnection};
pub use frontend_sink::FrontendSink;
pub use script_store::ScriptStore;
pub use ws_server::{run_server, serve, Session};
