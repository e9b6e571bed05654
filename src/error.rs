// ABOUTME: Crate-wide error taxonomy — one thiserror enum per boundary, rolled up into AgentError
// ABOUTME: The supervisor matches on AgentError's variants to decide log level and exit code

use crate::port::PortError;
use crate::wire::WireError;
use thiserror::Error;

/// Bad CLI usage or an invalid plugin option value, fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("plugin option '{0}' is missing '=' (expected key=value)")]
    MissingEquals(String),

    #[error("invalid value for plugin option '{key}': {reason}")]
    InvalidOptionValue { key: String, reason: String },

    #[error("could not read plugins directory {path}: {source}")]
    PluginsDirUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open frame log {path}: {source}")]
    FrameLogUnwritable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure inside a capture provider (pixel grab or encode).
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture provider failed: {0}")]
    ProviderFailed(String),

    #[error("display surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

/// The top-level error the supervisor matches on to decide how to log and
/// exit. Every fatal path in the agent eventually becomes one of these.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("protocol error: {0}")]
    Protocol(#[from] WireError),

    #[error("I/O error: {0}")]
    Io(#[from] PortError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no capture provider available for the client's accepted codecs")]
    NoCaptureAvailable,

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
}
