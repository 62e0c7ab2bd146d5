use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error codes the channel layer itself produces. Hosts are free to send others.
pub mod codes {
    pub const MISSING_PLUGIN: &str = "MissingPluginException";
    pub const CHANNEL_CLOSED: &str = "channel_closed";
    pub const HANDLER_FAILED: &str = "handler_failed";
    pub const NOT_IMPLEMENTED: &str = "not_implemented";
    pub const INVALID_ARGUMENTS: &str = "invalid_arguments";
    pub const NO_CAMERA: &str = "no_camera";
}

/// Failure reply for a method call, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct PlatformError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl PlatformError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn channel_closed(channel: &str) -> Self {
        Self::new(codes::CHANNEL_CLOSED, format!("channel '{channel}' is closed"))
    }

    pub fn missing_plugin(channel: &str, method: &str) -> Self {
        Self::new(
            codes::MISSING_PLUGIN,
            format!("no handler for method {method} on channel {channel}"),
        )
    }
}
