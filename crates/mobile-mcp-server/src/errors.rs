//! Error types for the MCP server
//!
//! A tool either fails in a way the caller can fix, which is rendered as
//! guidance, or unexpectedly, which is rendered as an error result.

use mobile_mcp_protocol::ParseError;
use mobile_mcp_robot::RobotError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Failure reported by a device backend
    #[error(transparent)]
    Robot(#[from] RobotError),

    /// No connected device or booted simulator carries this id
    #[error(
        "Device \"{device}\" not found. Use the mobile_list_available_devices tool to see available devices."
    )]
    DeviceNotFound { device: String },

    /// Argument value outside what the tool accepts
    #[error("{0}")]
    InvalidArgument(String),

    /// Writing a file on the server host failed
    #[error("Failed to write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn device_not_found(device: impl Into<String>) -> Self {
        Self::DeviceNotFound {
            device: device.into(),
        }
    }

    /// Whether the caller can fix this by changing its request or setup
    pub fn is_actionable(&self) -> bool {
        match self {
            ToolError::Robot(e) => e.is_actionable(),
            ToolError::DeviceNotFound { .. } | ToolError::InvalidArgument(_) => true,
            ToolError::FileWrite { .. } => false,
        }
    }
}

impl From<ParseError> for ToolError {
    fn from(err: ParseError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_message() {
        let err = ToolError::device_not_found("Pixel 9");
        assert_eq!(
            err.to_string(),
            "Device \"Pixel 9\" not found. Use the mobile_list_available_devices tool to see available devices."
        );
        assert!(err.is_actionable());
    }

    #[test]
    fn test_actionability_follows_robot_error() {
        let actionable = ToolError::from(RobotError::actionable("tunnel is down"));
        assert!(actionable.is_actionable());

        let unexpected = ToolError::from(RobotError::parse("garbled output"));
        assert!(!unexpected.is_actionable());
    }

    #[test]
    fn test_parse_error_is_invalid_argument() {
        let err = ToolError::from(ParseError::UnsupportedButton("POWER".into()));
        assert!(err.is_actionable());
        assert_eq!(err.to_string(), "Button \"POWER\" is not supported");
    }

    #[test]
    fn test_file_write_is_unexpected() {
        let err = ToolError::FileWrite {
            path: PathBuf::from("/nope/shot.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir"),
        };
        assert!(!err.is_actionable());
        let msg = err.to_string();
        assert!(msg.contains("/nope/shot.png"), "Error message should contain path");
        assert!(msg.contains("missing dir"), "Error message should contain cause");
    }
}
