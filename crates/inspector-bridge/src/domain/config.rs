//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built in three layers, later layers winning:
//!
//! 1. the defaults below;
//! 2. an optional TOML file (`--config bridge.toml`);
//! 3. command-line flags / environment variables (see `main.rs`).
//!
//! A config file only needs the keys it wants to change:
//!
//! ```toml
//! ws_bind_addr  = "0.0.0.0:9229"
//! debuggee_addr = "127.0.0.1:5858"
//! log_level     = "debug"
//! ```
//!
//! Parsing a file's *text* is pure and lives here; reading the file from disk
//! is the infrastructure layer's job (`infrastructure::config_file`).

use std::net::{Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use inspector_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 8080);
/// assert_eq!(cfg.debuggee_addr.port(), 5858);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Address the front-end WebSocket server binds to.
    ///
    /// Defaults to loopback: the debug port can run arbitrary code in the
    /// debuggee, so exposing it on a LAN is an explicit choice.
    #[serde(default = "default_ws_bind_addr")]
    pub ws_bind_addr: SocketAddr,

    /// TCP address of the debuggee's V8 debugger agent
    /// (`node --debug=5858` listens here by default).
    #[serde(default = "default_debuggee_addr")]
    pub debuggee_addr: SocketAddr,

    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_ws_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}
fn default_debuggee_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 5858))
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeConfig {
    /// | Field           | Default           |
    /// |-----------------|-------------------|
    /// | ws_bind_addr    | `127.0.0.1:8080`  |
    /// | debuggee_addr   | `127.0.0.1:5858`  |
    /// | log_level       | `info`            |
    fn default() -> Self {
        Self {
            ws_bind_addr: default_ws_bind_addr(),
            debuggee_addr: default_debuggee_addr(),
            log_level: default_log_level(),
        }
    }
}

impl BridgeConfig {
    /// Parses the text of a TOML config file.  Missing keys take their
    /// defaults; unknown keys are rejected so typos do not go unnoticed.
    ///
    /// # Errors
    ///
    /// Returns the `toml` parse error for malformed TOML, unknown keys, or
    /// addresses that are not `ip:port`.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
