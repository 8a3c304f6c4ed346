//! Screenshot tools

use crate::errors::ToolError;
use mobile_mcp_protocol::png_dimensions;
use mobile_mcp_robot::constants::DEFAULT_JPEG_QUALITY;
use mobile_mcp_robot::{ImageTools, OutputFormat, Robot, RobotError};
use std::path::PathBuf;

/// An encoded screen capture ready to return to the client
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    /// Dimensions of the captured PNG, before any resize
    pub width: u32,
    pub height: u32,
}

/// Width in points: the PNG width divided by the screen scale, floored
pub fn target_width(png_width: u32, scale: f64) -> u32 {
    if scale <= 0.0 {
        return png_width;
    }
    (f64::from(png_width) / scale).floor() as u32
}

pub async fn take_screenshot(robot: &dyn Robot, images: &ImageTools) -> Result<Screenshot, ToolError> {
    let screen = robot.get_screen_size().await?;
    let png = robot.get_screenshot().await?;

    let dims = png_dimensions(&png).map_err(RobotError::from)?;
    if dims.width == 0 || dims.height == 0 {
        return Err(RobotError::actionable("Screenshot is invalid. Please try again.").into());
    }

    if !images.is_scaling_available().await {
        tracing::debug!("Screenshot taken: {} bytes", png.len());
        return Ok(Screenshot {
            data: png,
            mime_type: "image/png",
            width: dims.width,
            height: dims.height,
        });
    }

    tracing::debug!("Image scaling is available, resizing screenshot");
    let before = png.len();
    let jpeg = images
        .transcode(
            &png,
            target_width(dims.width, screen.scale),
            OutputFormat::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            },
        )
        .await?;
    tracing::debug!("Screenshot resized from {} bytes to {} bytes", before, jpeg.len());

    Ok(Screenshot {
        data: jpeg,
        mime_type: "image/jpeg",
        width: dims.width,
        height: dims.height,
    })
}

/// Write the raw PNG capture to `save_to`
pub async fn save_screenshot(robot: &dyn Robot, save_to: &str) -> Result<String, ToolError> {
    let png = robot.get_screenshot().await?;
    tokio::fs::write(save_to, &png)
        .await
        .map_err(|source| ToolError::FileWrite {
            path: PathBuf::from(save_to),
            source,
        })?;
    Ok(format!("Screenshot saved to: {}", save_to))
}
