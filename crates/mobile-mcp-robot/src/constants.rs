//! Constants used throughout the device backends
//!
//! This module centralizes magic numbers for better maintainability.

use std::time::Duration;

/// Timeout for a single helper-tool invocation (adb, simctl, ...)
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum captured output of a helper-tool invocation
pub const MAX_OUTPUT_SIZE: usize = 4 * 1024 * 1024;

/// Host the automation daemon is reached on (forwarded or simulator-local)
pub const DAEMON_HOST: &str = "localhost";

/// WebDriverAgent port
pub const WDA_PORT: u16 = 8100;

/// Local port of the go-ios tunnel agent
pub const IOS_TUNNEL_PORT: u16 = 60105;

/// First iOS major version that needs the tunnel
pub const TUNNEL_REQUIRED_MAJOR: u32 = 17;

/// Timeout for raw TCP liveness probes
pub const PORT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout for a single HTTP request to the automation daemon
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Bundle id of the WebDriverAgent runner app
pub const WDA_RUNNER_BUNDLE_ID: &str = "com.facebook.WebDriverAgentRunner.xctrunner";

/// How long a simulator gets to bring WebDriverAgent up
pub const WDA_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval while waiting for WebDriverAgent
pub const WDA_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Attempts at dumping the Android UI hierarchy
pub const UI_DUMP_ATTEMPTS: usize = 10;

/// Android companion app used as a clipboard relay for non-ASCII text
pub const DEVICEKIT_PACKAGE: &str = "com.mobilenext.devicekit";

/// Default JPEG quality used when shrinking screenshots
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Swipe duration, milliseconds
pub const SWIPE_DURATION_MS: u32 = 1000;

/// Long press hold, milliseconds
pub const LONG_PRESS_DURATION_MS: u32 = 500;

/// Tap hold, milliseconds
pub const TAP_HOLD_MS: u32 = 100;

/// Double tap: hold for each tap, and gap between taps, milliseconds
pub const DOUBLE_TAP_HOLD_MS: u32 = 50;
pub const DOUBLE_TAP_GAP_MS: u32 = 100;

/// Default swipe distance on iOS, points
pub const IOS_DEFAULT_SWIPE_DISTANCE: i32 = 400;
