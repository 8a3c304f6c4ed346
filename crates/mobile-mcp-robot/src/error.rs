//! Error types for device backends
//!
//! Errors fall into two tiers. [`RobotError::Actionable`] is a condition the
//! caller can fix (wrong button name, tunnel not running, unsafe archive) and is
//! rendered as guidance. Every other variant is an unexpected infrastructure
//! failure.

use crate::exec::ExecError;
use mobile_mcp_protocol::{ParseError, PngError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RobotError>;

#[derive(Debug, Error)]
pub enum RobotError {
    /// User-fixable condition, message is shown as-is
    #[error("{0}")]
    Actionable(String),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse UI hierarchy: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Png(#[from] PngError),

    #[error("{0}")]
    Parse(String),
}

impl RobotError {
    pub fn actionable(message: impl Into<String>) -> Self {
        Self::Actionable(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Actionable(_))
    }

    /// Turn a failed helper-tool invocation into an actionable error carrying
    /// the tool's own output, so the caller sees why adb/simctl/go-ios refused.
    pub fn from_tool_output(err: ExecError) -> Self {
        match err.output() {
            Some(output) if !output.is_empty() => Self::Actionable(output),
            _ => Self::Actionable(err.to_string()),
        }
    }
}

impl From<ParseError> for RobotError {
    fn from(err: ParseError) -> Self {
        Self::Actionable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_actionable_is_actionable() {
        assert!(RobotError::actionable("fix me").is_actionable());
        assert!(!RobotError::parse("bad output").is_actionable());
        assert!(!RobotError::from(std::io::Error::other("boom")).is_actionable());
    }

    #[test]
    fn test_parse_error_becomes_actionable() {
        let err: RobotError = "POWER".parse::<mobile_mcp_protocol::Button>().unwrap_err().into();
        assert!(err.is_actionable());
        assert_eq!(err.to_string(), "Button \"POWER\" is not supported");
    }

    #[test]
    fn test_tool_output_is_preferred_over_exit_status() {
        let err = ExecError::Failed {
            program: "adb".to_string(),
            args: "install -r app.apk".to_string(),
            status: "exit status: 1".to_string(),
            stdout: "Performing Streamed Install\n".to_string(),
            stderr: "adb: failed to install app.apk: INSTALL_FAILED_OLDER_SDK\n".to_string(),
        };
        let robot_err = RobotError::from_tool_output(err);
        assert!(robot_err.is_actionable());
        let msg = robot_err.to_string();
        assert!(msg.starts_with("Performing Streamed Install"));
        assert!(msg.ends_with("INSTALL_FAILED_OLDER_SDK"));
    }

    #[test]
    fn test_tool_without_output_falls_back_to_message() {
        let err = ExecError::Timeout {
            program: "xcrun".to_string(),
            timeout: std::time::Duration::from_secs(30),
        };
        let robot_err = RobotError::from_tool_output(err);
        assert!(robot_err.is_actionable());
        assert!(robot_err.to_string().contains("timed out"));
    }
}
