//! Common types for mobile-mcp
//!
//! This crate defines the shared data model used by the device backends and
//! the MCP server: screen geometry, UI elements, input vocabulary and the
//! descriptors returned by device discovery.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod png;

pub use png::{PngDimensions, PngError, png_dimensions};

/// Screen size of a device in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
    /// Pixels per point. Always 1 on Android.
    pub scale: f64,
}

/// A rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ElementRect {
    /// Whether the rectangle covers a positive area
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// A UI element visible on screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenElement {
    /// Platform class or element type (e.g. "android.widget.Button", "StaticText")
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub rect: ElementRect,
    /// Only ever `Some(true)`; unfocused elements carry `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
}

impl ScreenElement {
    /// Create an element with only a type and bounds set
    pub fn new(element_type: impl Into<String>, rect: ElementRect) -> Self {
        Self {
            element_type: element_type.into(),
            text: None,
            label: None,
            name: None,
            value: None,
            identifier: None,
            rect,
            focused: None,
        }
    }
}

/// An application installed on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    /// Android package name or iOS bundle identifier
    pub package_name: String,
    pub app_name: String,
}

/// Error returned when a user-supplied name does not map to a known value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Button \"{0}\" is not supported")]
    UnsupportedButton(String),
    #[error("Swipe direction \"{0}\" is not supported")]
    UnsupportedDirection(String),
    #[error("Orientation \"{0}\" is not supported")]
    UnsupportedOrientation(String),
}

/// Screen orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(ParseError::UnsupportedOrientation(s.to_string())),
        }
    }
}

/// Direction of a swipe gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    pub const ALL: [SwipeDirection; 4] = [
        SwipeDirection::Up,
        SwipeDirection::Down,
        SwipeDirection::Left,
        SwipeDirection::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Up => "up",
            SwipeDirection::Down => "down",
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }

    /// Whether the gesture moves along the y axis
    pub fn is_vertical(&self) -> bool {
        matches!(self, SwipeDirection::Up | SwipeDirection::Down)
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwipeDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(SwipeDirection::Up),
            "down" => Ok(SwipeDirection::Down),
            "left" => Ok(SwipeDirection::Left),
            "right" => Ok(SwipeDirection::Right),
            _ => Err(ParseError::UnsupportedDirection(s.to_string())),
        }
    }
}

/// Hardware or navigation button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Button {
    Home,
    Back,
    VolumeUp,
    VolumeDown,
    Enter,
    DpadCenter,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

impl Button {
    pub const ALL: [Button; 10] = [
        Button::Home,
        Button::Back,
        Button::VolumeUp,
        Button::VolumeDown,
        Button::Enter,
        Button::DpadCenter,
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Home => "HOME",
            Button::Back => "BACK",
            Button::VolumeUp => "VOLUME_UP",
            Button::VolumeDown => "VOLUME_DOWN",
            Button::Enter => "ENTER",
            Button::DpadCenter => "DPAD_CENTER",
            Button::DpadUp => "DPAD_UP",
            Button::DpadDown => "DPAD_DOWN",
            Button::DpadLeft => "DPAD_LEFT",
            Button::DpadRight => "DPAD_RIGHT",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Button {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Button::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| ParseError::UnsupportedButton(s.to_string()))
    }
}

/// Kind of Android device, derived from its system features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AndroidDeviceType {
    Mobile,
    Tv,
}

/// An Android device connected through adb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidDevice {
    pub device_id: String,
    pub device_type: AndroidDeviceType,
}

/// A physical iOS device known to go-ios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosDevice {
    pub device_id: String,
    pub device_name: String,
}

/// An iOS simulator known to simctl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulator {
    pub name: String,
    pub uuid: String,
    pub state: String,
}

impl Simulator {
    pub fn is_booted(&self) -> bool {
        self.state == "Booted"
    }
}
