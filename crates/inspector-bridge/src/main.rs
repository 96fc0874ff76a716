//! Inspector bridge: entry point.
//!
//! This binary accepts WebSocket connections from DevTools front ends and
//! bridges each one to a debuggee's V8 debugger port.
//!
//! # Usage
//!
//! ```text
//! inspector-bridge [OPTIONS]
//!
//! Options:
//!   --config    <FILE>       TOML configuration file
//!   --ws-bind   <ADDR:PORT>  WebSocket listen address [default: 127.0.0.1:8080]
//!   --debuggee  <ADDR:PORT>  Debuggee V8 debugger address [default: 127.0.0.1:5858]
//!   --log-level <FILTER>     Log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the config file, then flags / environment
//! variables.  `RUST_LOG` overrides the log level entirely.
//!
//! | Variable              | Flag          |
//! |-----------------------|---------------|
//! | `INSPECTOR_CONFIG`    | `--config`    |
//! | `INSPECTOR_WS_BIND`   | `--ws-bind`   |
//! | `INSPECTOR_DEBUGGEE`  | `--debuggee`  |
//! | `INSPECTOR_LOG_LEVEL` | `--log-level` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use inspector_bridge::domain::BridgeConfig;
use inspector_bridge::infrastructure::{load_config_file, run_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// DevTools front-end to V8 debugger bridge.
#[derive(Debug, Parser)]
#[command(
    name = "inspector-bridge",
    about = "Bridges DevTools front ends to a V8 debugger port",
    version
)]
struct Cli {
    /// TOML configuration file.  Keys: ws_bind_addr, debuggee_addr, log_level.
    #[arg(long, env = "INSPECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Address the WebSocket server listens on.
    ///
    /// Use `0.0.0.0:PORT` to accept front ends from other machines.
    #[arg(long, env = "INSPECTOR_WS_BIND")]
    ws_bind: Option<SocketAddr>,

    /// Address of the debuggee's V8 debugger agent.
    #[arg(long, env = "INSPECTOR_DEBUGGEE")]
    debuggee: Option<SocketAddr>,

    /// `tracing` filter used when `RUST_LOG` is not set.
    #[arg(long, env = "INSPECTOR_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Layers the flags over the config file (or the defaults).
    ///
    /// # Errors
    ///
    /// Returns an error if `--config` names a file that cannot be read or
    /// parsed.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)
                .with_context(|| format!("cannot load config {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(addr) = self.ws_bind {
            config.ws_bind_addr = addr;
        }
        if let Some(addr) = self.debuggee {
            config.debuggee_addr = addr;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_bridge_config()?;

    // Logging starts after the config is known so its level can apply;
    // `RUST_LOG` still wins when set.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "inspector bridge starting: ws={}, debuggee={}",
        config.ws_bind_addr, config.debuggee_addr
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    // The accept loop in `run_server` checks this flag every 200 ms.
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("inspector bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_cli() -> Cli {
        Cli {
            config: None,
            ws_bind: None,
            debuggee: None,
            log_level: None,
        }
    }

    #[test]
    fn test_no_flags_give_default_config() {
        // Arrange
        let cli = bare_cli();

        // Act
        let config = cli.into_bridge_config().unwrap();

        // Assert
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_cli_parses_socket_addresses() {
        let cli = Cli::parse_from([
            "inspector-bridge",
            "--ws-bind",
            "0.0.0.0:9229",
            "--debuggee",
            "10.0.0.5:5858",
        ]);

        assert_eq!(cli.ws_bind, Some("0.0.0.0:9229".parse().unwrap()));
        assert_eq!(cli.debuggee, Some("10.0.0.5:5858".parse().unwrap()));
    }

    #[test]
    fn test_cli_rejects_malformed_address() {
        let result = Cli::try_parse_from(["inspector-bridge", "--debuggee", "not-an-addr"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli {
            debuggee: Some("127.0.0.1:9000".parse().unwrap()),
            log_level: Some("debug".to_string()),
            ..bare_cli()
        };

        let config = cli.into_bridge_config().unwrap();

        assert_eq!(config.debuggee_addr.port(), 9000);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.ws_bind_addr.port(), 8080);
    }

    #[test]
    fn test_flags_override_config_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("inspector-cli-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "debuggee_addr = \"127.0.0.1:7000\"\nlog_level = \"warn\"\n").unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            log_level: Some("trace".to_string()),
            ..bare_cli()
        };

        // Act
        let config = cli.into_bridge_config().unwrap();
        std::fs::remove_file(&path).ok();

        // Assert
        assert_eq!(config.debuggee_addr.port(), 7000);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/inspector-bridge.toml")),
            ..bare_cli()
        };
        assert!(cli.into_bridge_config().is_err());
    }
}
