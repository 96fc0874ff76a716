//! Application-level error types.

use thiserror::Error;

use crate::application::ports::WireError;

/// Why a domain method failed.  The `Display` text becomes the `error` field
/// of the front-end response.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AgentError {
    /// A backend request failed; its message is passed through unchanged.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The front end asked for something this bridge cannot do.
    #[error("{0}")]
    Unsupported(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("script {0} not found")]
    ScriptNotFound(String),
}

impl AgentError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        AgentError::InvalidParams(message.into())
    }
}

/// A domain handler could not be registered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("domain `{domain}` has no methods")]
    EmptyMethodSet { domain: String },

    #[error("domain `{domain}` lists method `{method}` more than once")]
    DuplicateMethod { domain: String, method: String },
}
