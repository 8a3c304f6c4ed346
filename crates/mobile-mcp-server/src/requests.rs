//! MCP tool request types
//!
//! Field names match the tool arguments on the wire.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

/// Request for tools that only need a device
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DeviceRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
}

/// Request for mobile_launch_app
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LaunchAppRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[serde(rename = "packageName")]
    #[schemars(description = "The package name of the app to launch")]
    pub package_name: String,
}

/// Request for mobile_terminate_app
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TerminateAppRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[serde(rename = "packageName")]
    #[schemars(description = "The package name of the app to terminate")]
    pub package_name: String,
}

/// Request for mobile_install_app
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallAppRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(
        description = "The path to the app file to install. For iOS simulators, provide a .zip file or a .app directory. For Android provide an .apk file. For iOS real devices provide an .ipa file"
    )]
    pub path: String,
}

/// Request for mobile_uninstall_app
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UninstallAppRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(
        description = "Bundle identifier (iOS) or package name (Android) of the app to be uninstalled"
    )]
    pub bundle_id: String,
}

/// Request for tap, double tap and long press
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CoordinatesRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(description = "The x coordinate on the screen, in pixels")]
    pub x: f64,
    #[schemars(description = "The y coordinate on the screen, in pixels")]
    pub y: f64,
}

/// Request for mobile_press_button
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PressButtonRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(
        description = "The button to press. Supported buttons: BACK (android only), HOME, VOLUME_UP, VOLUME_DOWN, ENTER, DPAD_CENTER (android tv only), DPAD_UP (android tv only), DPAD_DOWN (android tv only), DPAD_LEFT (android tv only), DPAD_RIGHT (android tv only)"
    )]
    pub button: String,
}

/// Request for mobile_open_url
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OpenUrlRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(description = "The URL to open")]
    pub url: String,
}

/// Request for mobile_swipe_on_screen
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SwipeRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(description = "The direction to swipe: 'up', 'down', 'left' or 'right'")]
    pub direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "The x coordinate to start the swipe from, in pixels. If not provided, uses center of screen"
    )]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "The y coordinate to start the swipe from, in pixels. If not provided, uses center of screen"
    )]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "The distance to swipe in pixels. Defaults to 400 pixels for iOS or 30% of screen dimension for Android"
    )]
    pub distance: Option<f64>,
}

/// Request for mobile_type_keys
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TypeKeysRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(description = "The text to type")]
    pub text: String,
    #[schemars(
        description = "Whether to submit the text. If true, the text will be submitted as if the user pressed the enter key."
    )]
    pub submit: bool,
}

/// Request for mobile_save_screenshot
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SaveScreenshotRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[serde(rename = "saveTo")]
    #[schemars(description = "The path to save the screenshot to")]
    pub save_to: String,
}

/// Request for mobile_set_orientation
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SetOrientationRequest {
    #[schemars(description = "The device identifier to use. Use mobile_list_available_devices to find which devices are available to you.")]
    pub device: String,
    #[schemars(description = "The desired orientation: 'portrait' or 'landscape'")]
    pub orientation: String,
}

/// Round a wire coordinate to device units
pub fn to_device_units(value: f64) -> i32 {
    value.round() as i32
}
