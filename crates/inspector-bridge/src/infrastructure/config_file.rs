//! Reading [`BridgeConfig`] from a TOML file on disk.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::BridgeConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads the configuration file at `path`.
///
/// Unlike an implicit default location, an explicitly named file must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid bridge TOML (unknown keys are
/// rejected).
pub fn load_config_file(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BridgeConfig::from_toml_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("inspector-bridge-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        // Arrange
        let path = scratch_file("debuggee_addr = \"127.0.0.1:9000\"\n");

        // Act
        let cfg = load_config_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        // Assert
        assert_eq!(cfg.debuggee_addr.port(), 9000);
        assert_eq!(cfg.ws_bind_addr, BridgeConfig::default().ws_bind_addr);
    }

    #[test]
    fn test_missing_file_is_io_error_with_path() {
        let path = std::env::temp_dir().join("inspector-bridge-does-not-exist.toml");

        let err = load_config_file(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("inspector-bridge-does-not-exist.toml"));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let path = scratch_file("ping_interval = 5\n");

        let result = load_config_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
