//! MCP tool implementations
//!
//! This module contains the actual implementation logic for MCP tools.
//! The main.rs file contains thin wrappers that resolve the device and
//! delegate to these implementations through [`ToolContext::run`].

pub mod apps;
pub mod devices;
pub mod input;
pub mod screen;
pub mod screenshot;

use crate::constants::RETRY_SUFFIX;
use crate::errors::ToolError;
use crate::mobilecli::Mobilecli;
use crate::props;
use crate::telemetry::Telemetry;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use devices::DeviceRegistry;
use mobile_mcp_robot::{ImageTools, Robot};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use std::future::Future;

/// What a tool produced on success
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Image(screenshot::Screenshot),
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<screenshot::Screenshot> for ToolOutput {
    fn from(shot: screenshot::Screenshot) -> Self {
        ToolOutput::Image(shot)
    }
}

/// Shared state behind every tool call
pub struct ToolContext {
    pub devices: DeviceRegistry,
    pub images: ImageTools,
    pub telemetry: Telemetry,
    /// Present when the device listing cross-check is enabled
    pub crosscheck: Option<Mobilecli>,
}

impl ToolContext {
    /// Resolve a device id into a fresh robot
    pub async fn robot(&self, device: &str) -> Result<Box<dyn Robot>, ToolError> {
        self.devices.resolve(device).await
    }

    /// Trace, run and render one tool invocation
    pub async fn run<A, T, F>(&self, name: &str, args: &A, call: F) -> CallToolResult
    where
        A: Serialize,
        T: Into<ToolOutput>,
        F: Future<Output = Result<T, ToolError>>,
    {
        let args = serde_json::to_string(args).unwrap_or_default();
        tracing::info!("Invoking {} with args: {}", name, args);

        let result = call.await.map(Into::into);
        match &result {
            Ok(ToolOutput::Text(text)) => {
                tracing::debug!("=> {}", text);
                self.telemetry
                    .emit("tool_invoked", props! { "ToolName" => name });
            }
            Ok(ToolOutput::Image(shot)) => {
                tracing::debug!("=> {} image, {} bytes", shot.mime_type, shot.data.len());
                self.telemetry.emit(
                    "tool_invoked",
                    props! {
                        "ToolName" => name,
                        "ScreenshotFilesize" => BASE64.encode(&shot.data).len(),
                        "ScreenshotMimeType" => shot.mime_type,
                        "ScreenshotWidth" => shot.width,
                        "ScreenshotHeight" => shot.height,
                    },
                );
            }
            Err(_) => {
                self.telemetry
                    .emit("tool_failed", props! { "ToolName" => name });
            }
        }
        render(name, result)
    }
}

/// Full `source` chain of an error, outermost first
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

/// Turn a tool outcome into MCP content.
///
/// Actionable failures are guidance for the model and are not flagged as
/// errors; anything else is.
pub fn render(name: &str, result: Result<ToolOutput, ToolError>) -> CallToolResult {
    match result {
        Ok(ToolOutput::Text(text)) => CallToolResult::success(vec![Content::text(text)]),
        Ok(ToolOutput::Image(shot)) => CallToolResult::success(vec![Content::image(
            BASE64.encode(&shot.data),
            shot.mime_type,
        )]),
        Err(e) if e.is_actionable() => {
            CallToolResult::success(vec![Content::text(format!("{}{}", e, RETRY_SUFFIX))])
        }
        Err(e) => {
            tracing::error!("Tool '{}' failed: {}", name, error_chain(&e));
            CallToolResult::error(vec![Content::text(format!("Error: {}", e))])
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use mobile_mcp_robot::RobotError;
    use rmcp::model::RawContent;

    fn text_of(result: &CallToolResult) -> String {
        match &result.content[0].raw {
            RawContent::Text(t) => t.text.clone(),
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_success_is_plain_text() {
        let result = render("mobile_open_url", Ok(ToolOutput::Text("Opened URL: https://x".into())));
        assert_eq!(text_of(&result), "Opened URL: https://x");
        assert_ne!(result.is_error, Some(true));
    }

    #[test]
    fn test_actionable_gets_retry_suffix_and_no_error_flag() {
        let err = ToolError::from(RobotError::actionable("WebDriverAgent is not running on device"));
        let result = render("mobile_click_on_screen_at_coordinates", Err(err));
        assert_eq!(
            text_of(&result),
            "WebDriverAgent is not running on device. Please fix the issue and try again."
        );
        assert_ne!(result.is_error, Some(true), "actionable is guidance, not an error");
    }

    #[test]
    fn test_unexpected_is_flagged() {
        let err = ToolError::from(RobotError::parse("unexpected simctl output"));
        let result = render("mobile_list_apps", Err(err));
        assert_eq!(text_of(&result), "Error: unexpected simctl output");
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_image_content() {
        let shot = screenshot::Screenshot {
            data: vec![1, 2, 3],
            mime_type: "image/jpeg",
            width: 10,
            height: 20,
        };
        let result = render("mobile_take_screenshot", Ok(ToolOutput::Image(shot)));
        match &result.content[0].raw {
            RawContent::Image(image) => {
                assert_eq!(image.data, "AQID");
                assert_eq!(image.mime_type, "image/jpeg");
            }
            other => panic!("expected image content, got {:?}", other),
        }
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = ToolError::FileWrite {
            path: "/x".into(),
            source: std::io::Error::other("disk full"),
        };
        let chain = error_chain(&err);
        assert!(chain.starts_with("Failed to write /x"));
        assert!(chain.ends_with(": disk full"), "chain: {}", chain);
    }
}
