//! iOS simulators through simctl and an on-demand WebDriverAgent

use crate::archive;
use crate::constants::{WDA_POLL_INTERVAL, WDA_RUNNER_BUNDLE_ID, WDA_STARTUP_TIMEOUT};
use crate::error::{Result, RobotError};
use crate::exec::{CommandRunner, ExecOptions};
use crate::robot::Robot;
use crate::wda::{DaemonConfig, WebDriverAgent};
use async_trait::async_trait;
use mobile_mcp_protocol::{
    Button, InstalledApp, Orientation, ScreenElement, ScreenSize, Simulator, SwipeDirection,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Deserialize)]
struct AppInfo {
    #[serde(rename = "CFBundleIdentifier")]
    bundle_identifier: String,
    #[serde(rename = "CFBundleDisplayName", default)]
    display_name: Option<String>,
    #[serde(rename = "CFBundleName", default)]
    bundle_name: Option<String>,
}

impl From<AppInfo> for InstalledApp {
    fn from(app: AppInfo) -> Self {
        let app_name = app
            .display_name
            .or(app.bundle_name)
            .unwrap_or_else(|| app.bundle_identifier.clone());
        InstalledApp {
            package_name: app.bundle_identifier,
            app_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListDevicesResponse {
    devices: BTreeMap<String, Vec<SimDevice>>,
}

#[derive(Debug, Deserialize)]
struct SimDevice {
    name: String,
    udid: String,
    state: String,
}

/// Apps from `listapps` after conversion to JSON by plutil
pub(crate) fn parse_app_list(json: &[u8]) -> Result<Vec<InstalledApp>> {
    let apps: BTreeMap<String, AppInfo> = serde_json::from_slice(json)?;
    Ok(apps.into_values().map(InstalledApp::from).collect())
}

/// Every simulator from `simctl list devices -j`, across runtimes
pub(crate) fn parse_simulators(json: &[u8]) -> Result<Vec<Simulator>> {
    let response: ListDevicesResponse = serde_json::from_slice(json)?;
    Ok(response
        .devices
        .into_values()
        .flatten()
        .map(|d| Simulator {
            name: d.name,
            uuid: d.udid,
            state: d.state,
        })
        .collect())
}

/// A booted simulator addressed by UUID
pub struct SimulatorRobot {
    uuid: String,
    runner: Arc<dyn CommandRunner>,
    daemon: DaemonConfig,
    startup_timeout: Duration,
}

impl SimulatorRobot {
    pub fn new(uuid: impl Into<String>, runner: Arc<dyn CommandRunner>, daemon: DaemonConfig) -> Self {
        Self {
            uuid: uuid.into(),
            runner,
            daemon,
            startup_timeout: WDA_STARTUP_TIMEOUT,
        }
    }

    /// Override how long bring-up waits for the daemon
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    async fn simctl(&self, args: &[&str]) -> std::result::Result<Vec<u8>, crate::exec::ExecError> {
        let mut full = vec!["simctl".to_string()];
        full.extend(args.iter().map(|a| a.to_string()));
        self.runner
            .run("xcrun", &full, &ExecOptions::default())
            .await
    }

    async fn is_wda_installed(&self) -> Result<bool> {
        Ok(self
            .list_apps()
            .await?
            .iter()
            .any(|app| app.package_name == WDA_RUNNER_BUNDLE_ID))
    }

    /// Launch the runner and wait for it to report ready. Returns `false`
    /// without doing anything when the runner is not installed.
    async fn start_wda(&self, wda: &WebDriverAgent) -> Result<bool> {
        if !self.is_wda_installed().await? {
            tracing::warn!(
                "WebDriverAgent is not installed on simulator {}, device actions will fail; please see https://github.com/mobile-next/mobile-mcp/wiki/",
                self.uuid
            );
            return Ok(false);
        }

        tracing::info!("Starting WebDriverAgent on simulator {}", self.uuid);
        self.simctl(&["launch", &self.uuid, WDA_RUNNER_BUNDLE_ID])
            .await?;

        let deadline = Instant::now() + self.startup_timeout;
        while Instant::now() < deadline {
            if wda.is_running().await {
                tracing::info!("WebDriverAgent is now running");
                return Ok(true);
            }
            tokio::time::sleep(WDA_POLL_INTERVAL).await;
        }

        tracing::warn!("Could not start WebDriverAgent in time, giving up");
        Ok(true)
    }

    async fn wda(&self) -> Result<WebDriverAgent> {
        let wda = WebDriverAgent::from_config(&self.daemon);
        if wda.is_running().await {
            return Ok(wda);
        }

        if !self.start_wda(&wda).await? {
            // Nothing to start; the first daemon call fails as a transport error.
            return Ok(wda);
        }
        if !wda.is_running().await {
            return Err(RobotError::actionable(
                "WebDriverAgent is not running on simulator, please see https://github.com/mobile-next/mobile-mcp/wiki/",
            ));
        }
        Ok(wda)
    }

    async fn install_bundle(&self, path: &str) -> Result<()> {
        self.simctl(&["install", &self.uuid, path])
            .await
            .map_err(RobotError::from_tool_output)?;
        Ok(())
    }
}

#[async_trait]
impl Robot for SimulatorRobot {
    async fn get_screen_size(&self) -> Result<ScreenSize> {
        self.wda().await?.get_screen_size().await
    }

    async fn swipe(&self, direction: SwipeDirection) -> Result<()> {
        self.wda().await?.swipe(direction).await
    }

    async fn swipe_from_coordinate(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: Option<i32>,
    ) -> Result<()> {
        self.wda()
            .await?
            .swipe_from_coordinate(x, y, direction, distance)
            .await
    }

    async fn get_screenshot(&self) -> Result<Vec<u8>> {
        self.wda().await?.get_screenshot().await
    }

    async fn list_apps(&self) -> Result<Vec<InstalledApp>> {
        let plist = self.simctl(&["listapps", &self.uuid]).await?;
        let json = self
            .runner
            .run(
                "plutil",
                &crate::exec::args(["-convert", "json", "-o", "-", "-r", "-"]),
                &ExecOptions::with_input(plist),
            )
            .await?;
        parse_app_list(&json)
    }

    async fn launch_app(&self, package_name: &str) -> Result<()> {
        self.simctl(&["launch", &self.uuid, package_name]).await?;
        Ok(())
    }

    async fn terminate_app(&self, package_name: &str) -> Result<()> {
        self.simctl(&["terminate", &self.uuid, package_name])
            .await?;
        Ok(())
    }

    async fn install_app(&self, path: &str) -> Result<()> {
        if !archive::is_zip(path) {
            return self.install_bundle(path).await;
        }

        tracing::debug!("Detected .zip file, validating contents");
        let zip_path = PathBuf::from(path);
        let extracted = tokio::task::spawn_blocking(move || archive::extract_app_bundle(&zip_path))
            .await
            .map_err(|e| RobotError::parse(format!("Zip extraction task failed: {}", e)))??;

        let app_path = extracted.app_path().to_string_lossy().into_owned();
        let result = self.install_bundle(&app_path).await;
        tracing::debug!("Cleaning up {}", extracted.dir().display());
        drop(extracted);
        result
    }

    async fn uninstall_app(&self, bundle_id: &str) -> Result<()> {
        self.simctl(&["uninstall", &self.uuid, bundle_id])
            .await
            .map_err(RobotError::from_tool_output)?;
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<()> {
        self.wda().await?.open_url(url).await
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.wda().await?.send_keys(text).await
    }

    async fn press_button(&self, button: Button) -> Result<()> {
        self.wda().await?.press_button(button).await
    }

    async fn tap(&self, x: i32, y: i32) -> Result<()> {
        self.wda().await?.tap(x, y).await
    }

    async fn double_tap(&self, x: i32, y: i32) -> Result<()> {
        self.wda().await?.double_tap(x, y).await
    }

    async fn long_press(&self, x: i32, y: i32) -> Result<()> {
        self.wda().await?.long_press(x, y).await
    }

    async fn get_elements_on_screen(&self) -> Result<Vec<ScreenElement>> {
        self.wda().await?.get_elements_on_screen().await
    }

    async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        self.wda().await?.set_orientation(orientation).await
    }

    async fn get_orientation(&self) -> Result<Orientation> {
        self.wda().await?.get_orientation().await
    }
}

/// Enumerates simulators; only meaningful on macOS
#[derive(Clone)]
pub struct SimctlManager {
    runner: Arc<dyn CommandRunner>,
    daemon: DaemonConfig,
}

impl SimctlManager {
    pub fn new(runner: Arc<dyn CommandRunner>, daemon: DaemonConfig) -> Self {
        Self { runner, daemon }
    }

    pub fn robot(&self, uuid: &str) -> SimulatorRobot {
        SimulatorRobot::new(uuid, self.runner.clone(), self.daemon.clone())
    }

    pub async fn list_simulators(&self) -> Vec<Simulator> {
        if !cfg!(target_os = "macos") {
            return Vec::new();
        }

        let args = crate::exec::args(["simctl", "list", "devices", "-j"]);
        let parsed = match self.runner.run("xcrun", &args, &ExecOptions::default()).await {
            Ok(out) => parse_simulators(&out),
            Err(e) => Err(e.into()),
        };
        match parsed {
            Ok(simulators) => simulators,
            Err(e) => {
                tracing::warn!("Error listing simulators: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn list_booted_simulators(&self) -> Vec<Simulator> {
        self.list_simulators()
            .await
            .into_iter()
            .filter(Simulator::is_booted)
            .collect()
    }
}
