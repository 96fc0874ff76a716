//! Domain layer for inspector-bridge.
//!
//! Pure types with no I/O: the front-end protocol's JSON shapes and the
//! bridge configuration.  Nothing in here touches `tokio`, sockets or files,
//! so every type can be built and inspected directly in tests.

pub mod config;
pub mod messages;

pub use config::BridgeConfig;
pub use messages::{
    split_method, CallFrame, Command, ConsoleLevel, Event, FunctionDetails, Location,
    PausedParams, RemoteObject, Response, Scope,
};
