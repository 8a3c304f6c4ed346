//! Android backend over adb

mod display;
mod manager;
mod ui_dump;

pub use manager::AndroidDeviceManager;

use crate::constants::{DEVICEKIT_PACKAGE, LONG_PRESS_DURATION_MS, SWIPE_DURATION_MS, UI_DUMP_ATTEMPTS};
use crate::error::{Result, RobotError};
use crate::exec::{CommandRunner, ExecOptions};
use crate::gesture::{SwipePath, percent_of};
use crate::robot::Robot;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mobile_mcp_protocol::{
    Button, InstalledApp, Orientation, ScreenElement, ScreenSize, SwipeDirection,
};
use std::sync::Arc;
use std::time::Duration;

const DEVICEKIT_RECEIVER: &str = "com.mobilenext.devicekit/.ClipboardBroadcastReceiver";
const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";

/// Android key code for a button
fn keycode(button: Button) -> &'static str {
    match button {
        Button::Back => "KEYCODE_BACK",
        Button::Home => "KEYCODE_HOME",
        Button::VolumeUp => "KEYCODE_VOLUME_UP",
        Button::VolumeDown => "KEYCODE_VOLUME_DOWN",
        Button::Enter => "KEYCODE_ENTER",
        Button::DpadCenter => "KEYCODE_DPAD_CENTER",
        Button::DpadUp => "KEYCODE_DPAD_UP",
        Button::DpadDown => "KEYCODE_DPAD_DOWN",
        Button::DpadLeft => "KEYCODE_DPAD_LEFT",
        Button::DpadRight => "KEYCODE_DPAD_RIGHT",
    }
}

/// Center swipe: 80% to 20% of the travelling axis
pub(crate) fn swipe_path(size: ScreenSize, direction: SwipeDirection) -> SwipePath {
    let center_x = (size.width >> 1) as i32;
    let mid_y = percent_of(size.height, 50);
    let (near_y, far_y) = (percent_of(size.height, 20), percent_of(size.height, 80));
    let (near_x, far_x) = (percent_of(size.width, 20), percent_of(size.width, 80));
    match direction {
        SwipeDirection::Up => SwipePath { x0: center_x, y0: far_y, x1: center_x, y1: near_y },
        SwipeDirection::Down => SwipePath { x0: center_x, y0: near_y, x1: center_x, y1: far_y },
        SwipeDirection::Left => SwipePath { x0: far_x, y0: mid_y, x1: near_x, y1: mid_y },
        SwipeDirection::Right => SwipePath { x0: near_x, y0: mid_y, x1: far_x, y1: mid_y },
    }
}

/// Swipe from a point; distance defaults to 30% of the travelling axis and the
/// end point is clamped to the screen
pub(crate) fn swipe_from_coordinate_path(
    size: ScreenSize,
    x: i32,
    y: i32,
    direction: SwipeDirection,
    distance: Option<i32>,
) -> SwipePath {
    let distance = distance.filter(|d| *d > 0);
    let dy = distance.unwrap_or_else(|| percent_of(size.height, 30));
    let dx = distance.unwrap_or_else(|| percent_of(size.width, 30));
    let (width, height) = (size.width as i32, size.height as i32);
    match direction {
        SwipeDirection::Up => SwipePath { x0: x, y0: y, x1: x, y1: y.saturating_sub(dy).clamp(0, height) },
        SwipeDirection::Down => SwipePath { x0: x, y0: y, x1: x, y1: y.saturating_add(dy).clamp(0, height) },
        SwipeDirection::Left => SwipePath { x0: x, y0: y, x1: x.saturating_sub(dx).clamp(0, width), y1: y },
        SwipeDirection::Right => SwipePath { x0: x, y0: y, x1: x.saturating_add(dx).clamp(0, width), y1: y },
    }
}

/// Parse the last `WxH` token of `wm size` output
pub(crate) fn parse_wm_size(output: &str) -> Result<ScreenSize> {
    let token = output
        .split_whitespace()
        .last()
        .ok_or_else(|| RobotError::parse("Failed to get screen size"))?;
    let (w, h) = token
        .split_once('x')
        .ok_or_else(|| RobotError::parse(format!("Unexpected screen size: {}", token)))?;
    let parse = |v: &str| {
        v.parse::<u32>()
            .map_err(|_| RobotError::parse(format!("Unexpected screen size: {}", token)))
    };
    Ok(ScreenSize {
        width: parse(w)?,
        height: parse(h)?,
        scale: 1.0,
    })
}

/// Values following `prefix` on each line, in order
fn prefixed_values<'a>(output: &'a str, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    output
        .lines()
        .map(str::trim)
        .filter_map(move |line| line.strip_prefix(prefix))
}

/// Launcher packages from `cmd package query-activities`, deduplicated in order
pub(crate) fn parse_launcher_packages(output: &str) -> Vec<String> {
    let mut packages: Vec<String> = Vec::new();
    for package in prefixed_values(output, "packageName=") {
        if !packages.iter().any(|p| p == package) {
            packages.push(package.to_string());
        }
    }
    packages
}

/// Backslash-escape characters the device shell would interpret
pub(crate) fn escape_shell_text(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '\\', '\'', '"', '`', ' ', '\t', '\n', '\r', '|', '&', ';', '(', ')', '<', '>', '{', '}',
        '[', ']', '$', '*', '?',
    ];
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// An Android device addressed by its adb serial
pub struct AndroidRobot {
    device_id: String,
    adb_path: String,
    runner: Arc<dyn CommandRunner>,
}

impl AndroidRobot {
    pub fn new(
        device_id: impl Into<String>,
        adb_path: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            adb_path: adb_path.into(),
            runner,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    fn device_args(&self, args: &[&str]) -> Vec<String> {
        let mut full = vec!["-s".to_string(), self.device_id.clone()];
        full.extend(args.iter().map(|a| a.to_string()));
        full
    }

    /// Run `adb -s <serial> <args>` and return stdout
    pub async fn adb(&self, args: &[&str]) -> Result<Vec<u8>> {
        Ok(self
            .runner
            .run(&self.adb_path, &self.device_args(args), &ExecOptions::default())
            .await?)
    }

    async fn adb_text(&self, args: &[&str]) -> Result<String> {
        let out = self.adb(args).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn silent_adb(&self, args: &[&str]) -> Result<()> {
        self.runner
            .run(&self.adb_path, &self.device_args(args), &ExecOptions::silent())
            .await?;
        Ok(())
    }

    /// System features reported by `pm list features`
    pub async fn system_features(&self) -> Result<Vec<String>> {
        let out = self.adb_text(&["shell", "pm", "list", "features"]).await?;
        Ok(prefixed_values(&out, "feature:").map(str::to_string).collect())
    }

    async fn list_packages(&self) -> Result<Vec<String>> {
        let out = self.adb_text(&["shell", "pm", "list", "packages"]).await?;
        Ok(prefixed_values(&out, "package:").map(str::to_string).collect())
    }

    async fn is_devicekit_installed(&self) -> Result<bool> {
        Ok(self
            .list_packages()
            .await?
            .iter()
            .any(|p| p == DEVICEKIT_PACKAGE))
    }

    async fn input_swipe(&self, path: SwipePath, duration_ms: u32) -> Result<()> {
        let coords = [path.x0, path.y0, path.x1, path.y1].map(|v| v.to_string());
        let duration = duration_ms.to_string();
        self.adb(&[
            "shell", "input", "swipe", &coords[0], &coords[1], &coords[2], &coords[3], &duration,
        ])
        .await?;
        Ok(())
    }

    async fn display_count(&self) -> Result<usize> {
        let out = self
            .adb_text(&["shell", "dumpsys", "SurfaceFlinger", "--display-id"])
            .await?;
        Ok(display::count_displays(&out))
    }

    /// First powered-on display, trying `cmd display` then `dumpsys display`
    async fn first_display_id(&self) -> Option<String> {
        match self.adb_text(&["shell", "cmd", "display", "get-displays"]).await {
            Ok(out) => {
                if let Some(id) = display::first_display_from_get_displays(&out) {
                    return Some(id);
                }
            }
            Err(e) => tracing::debug!("cmd display get-displays unavailable: {}", e),
        }

        match self.adb_text(&["shell", "dumpsys", "display"]).await {
            Ok(out) => display::first_display_from_dumpsys(&out),
            Err(e) => {
                tracing::debug!("dumpsys display failed: {}", e);
                None
            }
        }
    }

    async fn ui_automator_dump(&self) -> Result<String> {
        for attempt in 1..=UI_DUMP_ATTEMPTS {
            let dump = self
                .adb_text(&["exec-out", "uiautomator", "dump", "/dev/tty"])
                .await?;
            if dump.contains(ui_dump::NULL_ROOT_MARKER) {
                tracing::debug!(
                    "UIAutomator returned a null root node (attempt {}/{})",
                    attempt,
                    UI_DUMP_ATTEMPTS
                );
                continue;
            }
            return Ok(dump);
        }
        Err(RobotError::actionable("Failed to get UIAutomator XML"))
    }
}

#[async_trait]
impl Robot for AndroidRobot {
    async fn get_screen_size(&self) -> Result<ScreenSize> {
        parse_wm_size(&self.adb_text(&["shell", "wm", "size"]).await?)
    }

    async fn swipe(&self, direction: SwipeDirection) -> Result<()> {
        let size = self.get_screen_size().await?;
        self.input_swipe(swipe_path(size, direction), SWIPE_DURATION_MS)
            .await
    }

    async fn swipe_from_coordinate(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: Option<i32>,
    ) -> Result<()> {
        let size = self.get_screen_size().await?;
        let path = swipe_from_coordinate_path(size, x, y, direction, distance);
        self.input_swipe(path, SWIPE_DURATION_MS).await
    }

    async fn get_screenshot(&self) -> Result<Vec<u8>> {
        if self.display_count().await? <= 1 {
            return self.adb(&["exec-out", "screencap", "-p"]).await;
        }

        match self.first_display_id().await {
            Some(display_id) => {
                self.adb(&["exec-out", "screencap", "-p", "-d", &display_id])
                    .await
            }
            None => {
                tracing::warn!(
                    "Device {} reports multiple displays but no active display id could be resolved, capturing the default display",
                    self.device_id
                );
                self.adb(&["exec-out", "screencap", "-p"]).await
            }
        }
    }

    async fn list_apps(&self) -> Result<Vec<InstalledApp>> {
        let out = self
            .adb_text(&[
                "shell",
                "cmd",
                "package",
                "query-activities",
                "-a",
                "android.intent.action.MAIN",
                "-c",
                LAUNCHER_CATEGORY,
            ])
            .await?;
        Ok(parse_launcher_packages(&out)
            .into_iter()
            .map(|package_name| InstalledApp {
                app_name: package_name.clone(),
                package_name,
            })
            .collect())
    }

    async fn launch_app(&self, package_name: &str) -> Result<()> {
        self.silent_adb(&[
            "shell",
            "monkey",
            "-p",
            package_name,
            "-c",
            LAUNCHER_CATEGORY,
            "1",
        ])
        .await
        .map_err(|_| {
            RobotError::actionable(format!(
                "Failed launching app with package name \"{}\", please make sure it exists",
                package_name
            ))
        })
    }

    async fn terminate_app(&self, package_name: &str) -> Result<()> {
        self.adb(&["shell", "am", "force-stop", package_name]).await?;
        Ok(())
    }

    async fn install_app(&self, path: &str) -> Result<()> {
        self.runner
            .run(
                &self.adb_path,
                &self.device_args(&["install", "-r", path]),
                &ExecOptions::default(),
            )
            .await
            .map_err(RobotError::from_tool_output)?;
        Ok(())
    }

    async fn uninstall_app(&self, bundle_id: &str) -> Result<()> {
        self.runner
            .run(
                &self.adb_path,
                &self.device_args(&["uninstall", bundle_id]),
                &ExecOptions::default(),
            )
            .await
            .map_err(RobotError::from_tool_output)?;
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        self.adb(&[
            "shell",
            "am",
            "start",
            "-a",
            "android.intent.action.VIEW",
            "-d",
            url,
        ])
        .await?;
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        if text.is_ascii() {
            let escaped = escape_shell_text(text);
            self.adb(&["shell", "input", "text", &escaped]).await?;
            return Ok(());
        }

        if !self.is_devicekit_installed().await? {
            return Err(RobotError::actionable(
                "Non-ASCII text is not supported on Android, please install mobilenext devicekit, see https://github.com/mobile-next/devicekit-android",
            ));
        }

        let encoded = BASE64.encode(text.as_bytes());
        self.adb(&[
            "shell",
            "am",
            "broadcast",
            "-a",
            "devicekit.clipboard.set",
            "-e",
            "encoding",
            "base64",
            "-e",
            "text",
            &encoded,
            "-n",
            DEVICEKIT_RECEIVER,
        ])
        .await?;
        self.adb(&["shell", "input", "keyevent", "KEYCODE_PASTE"])
            .await?;
        self.adb(&[
            "shell",
            "am",
            "broadcast",
            "-a",
            "devicekit.clipboard.clear",
            "-n",
            DEVICEKIT_RECEIVER,
        ])
        .await?;
        Ok(())
    }

    async fn press_button(&self, button: Button) -> Result<()> {
        self.adb(&["shell", "input", "keyevent", keycode(button)])
            .await?;
        Ok(())
    }

    async fn tap(&self, x: i32, y: i32) -> Result<()> {
        let (x, y) = (x.to_string(), y.to_string());
        self.adb(&["shell", "input", "tap", &x, &y]).await?;
        Ok(())
    }

    async fn double_tap(&self, x: i32, y: i32) -> Result<()> {
        self.tap(x, y).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.tap(x, y).await
    }

    async fn long_press(&self, x: i32, y: i32) -> Result<()> {
        // a long press is a swipe that does not move
        let path = SwipePath { x0: x, y0: y, x1: x, y1: y };
        self.input_swipe(path, LONG_PRESS_DURATION_MS).await
    }

    async fn get_elements_on_screen(&self) -> Result<Vec<ScreenElement>> {
        let dump = self.ui_automator_dump().await?;
        ui_dump::parse_elements(ui_dump::extract_xml(&dump)?)
    }

    async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        let value = match orientation {
            Orientation::Portrait => "value:i:0",
            Orientation::Landscape => "value:i:1",
        };
        self.adb(&[
            "shell",
            "settings",
            "put",
            "system",
            "accelerometer_rotation",
            "0",
        ])
        .await?;
        self.adb(&[
            "shell",
            "content",
            "insert",
            "--uri",
            "content://settings/system",
            "--bind",
            "name:s:user_rotation",
            "--bind",
            value,
        ])
        .await?;
        Ok(())
    }

    async fn get_orientation(&self) -> Result<Orientation> {
        let rotation = self
            .adb_text(&["shell", "settings", "get", "system", "user_rotation"])
            .await?;
        Ok(if rotation.trim() == "0" {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        })
    }
}
