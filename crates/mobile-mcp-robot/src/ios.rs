//! Physical iOS devices through go-ios and a forwarded WebDriverAgent

use crate::constants::{PORT_PROBE_TIMEOUT, TUNNEL_REQUIRED_MAJOR};
use crate::error::{Result, RobotError};
use crate::exec::{CommandRunner, ExecOptions};
use crate::robot::Robot;
use crate::wda::{DaemonConfig, WebDriverAgent};
use async_trait::async_trait;
use mobile_mcp_protocol::{
    Button, InstalledApp, IosDevice, Orientation, ScreenElement, ScreenSize, SwipeDirection,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::net::TcpStream;

const WIKI: &str = "please see https://github.com/mobile-next/mobile-mcp/wiki/";

#[derive(Debug, Deserialize)]
struct DeviceInfo {
    #[serde(rename = "DeviceName", default)]
    device_name: String,
    #[serde(rename = "ProductVersion", default)]
    product_version: String,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(rename = "deviceList", default)]
    device_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: Option<String>,
}

/// Parse go-ios JSON output; go-ios may print log lines before the document
fn parse_json_output<T: DeserializeOwned>(output: &[u8]) -> Result<T> {
    let text = String::from_utf8_lossy(output);
    match serde_json::from_str(text.trim()) {
        Ok(value) => Ok(value),
        Err(e) => text
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('{'))
            .and_then(|line| serde_json::from_str(line).ok())
            .ok_or(RobotError::Json(e)),
    }
}

/// Whether a given iOS version string needs the userspace tunnel
pub(crate) fn tunnel_required(product_version: &str) -> bool {
    product_version
        .split('.')
        .next()
        .and_then(|major| major.trim().parse::<u32>().ok())
        .is_some_and(|major| major >= TUNNEL_REQUIRED_MAJOR)
}

/// `<bundle id> <display name>` lines from `apps --all --list`
pub(crate) fn parse_app_list(output: &str) -> Vec<InstalledApp> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (package_name, app_name) = line.split_once(' ').unwrap_or((line, line));
            InstalledApp {
                package_name: package_name.to_string(),
                app_name: app_name.trim().to_string(),
            }
        })
        .collect()
}

/// Whether something accepts TCP connections on `host:port`
pub(crate) async fn is_listening(host: &str, port: u16) -> bool {
    matches!(
        tokio::time::timeout(PORT_PROBE_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// A physical iOS device addressed by UDID
pub struct IosRobot {
    device_id: String,
    go_ios_path: String,
    runner: Arc<dyn CommandRunner>,
    daemon: DaemonConfig,
}

impl IosRobot {
    pub fn new(
        device_id: impl Into<String>,
        go_ios_path: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        daemon: DaemonConfig,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            go_ios_path: go_ios_path.into(),
            runner,
            daemon,
        }
    }

    fn udid_args(&self, args: &[&str]) -> Vec<String> {
        let mut full = vec!["--udid".to_string(), self.device_id.clone()];
        full.extend(args.iter().map(|a| a.to_string()));
        full
    }

    async fn ios(&self, args: &[&str]) -> Result<Vec<u8>> {
        Ok(self
            .runner
            .run(&self.go_ios_path, &self.udid_args(args), &ExecOptions::default())
            .await?)
    }

    /// `ProductVersion` reported by the device
    pub async fn ios_version(&self) -> Result<String> {
        let info: DeviceInfo = parse_json_output(&self.ios(&["info"]).await?)?;
        Ok(info.product_version)
    }

    async fn assert_tunnel_running(&self) -> Result<()> {
        if tunnel_required(&self.ios_version().await?)
            && !is_listening(&self.daemon.host, self.daemon.tunnel_port).await
        {
            return Err(RobotError::actionable(format!(
                "iOS tunnel is not running, {}",
                WIKI
            )));
        }
        Ok(())
    }

    /// Walk the liveness chain and hand out a daemon client
    async fn wda(&self) -> Result<WebDriverAgent> {
        self.assert_tunnel_running().await?;

        if !is_listening(&self.daemon.host, self.daemon.wda_port).await {
            return Err(RobotError::actionable(format!(
                "Port forwarding to WebDriverAgent is not running (tunnel okay), {}",
                WIKI
            )));
        }

        let wda = WebDriverAgent::from_config(&self.daemon);
        if !wda.is_running().await {
            return Err(RobotError::actionable(format!(
                "WebDriverAgent is not running on device (tunnel okay, port forwarding okay), {}",
                WIKI
            )));
        }
        Ok(wda)
    }

    async fn ios_actionable(&self, args: &[&str]) -> Result<()> {
        self.runner
            .run(&self.go_ios_path, &self.udid_args(args), &ExecOptions::default())
            .await
            .map_err(RobotError::from_tool_output)?;
        Ok(())
    }
}

#[async_trait]
impl Robot for IosRobot {
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
        self.assert_tunnel_running().await?;
        let out = self.ios(&["apps", "--all", "--list"]).await?;
        Ok(parse_app_list(&String::from_utf8_lossy(&out)))
    }

    async fn launch_app(&self, package_name: &str) -> Result<()> {
        self.assert_tunnel_running().await?;
        self.ios(&["launch", package_name]).await?;
        Ok(())
    }

    async fn terminate_app(&self, package_name: &str) -> Result<()> {
        self.assert_tunnel_running().await?;
        self.ios(&["kill", package_name]).await?;
        Ok(())
    }

    async fn install_app(&self, path: &str) -> Result<()> {
        self.assert_tunnel_running().await?;
        self.ios_actionable(&["install", "--path", path]).await
    }

    async fn uninstall_app(&self, bundle_id: &str) -> Result<()> {
        self.assert_tunnel_running().await?;
        self.ios_actionable(&["uninstall", "--bundleid", bundle_id])
            .await
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

/// Enumerates physical iOS devices through go-ios
#[derive(Clone)]
pub struct IosManager {
    go_ios_path: String,
    runner: Arc<dyn CommandRunner>,
    daemon: DaemonConfig,
}

impl IosManager {
    pub fn new(
        go_ios_path: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        daemon: DaemonConfig,
    ) -> Self {
        Self {
            go_ios_path: go_ios_path.into(),
            runner,
            daemon,
        }
    }

    pub fn robot(&self, device_id: &str) -> IosRobot {
        IosRobot::new(
            device_id,
            self.go_ios_path.clone(),
            self.runner.clone(),
            self.daemon.clone(),
        )
    }

    async fn go_ios(&self, args: &[&str]) -> Result<Vec<u8>> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        Ok(self
            .runner
            .run(&self.go_ios_path, &args, &ExecOptions::default())
            .await?)
    }

    /// go-ios answers `version` with a release tag or `local-build`
    pub async fn is_go_ios_installed(&self) -> bool {
        let Ok(out) = self.go_ios(&["version"]).await else {
            return false;
        };
        match parse_json_output::<VersionInfo>(&out) {
            Ok(VersionInfo {
                version: Some(version),
            }) => version.starts_with('v') || version == "local-build",
            _ => false,
        }
    }

    async fn device_name(&self, device_id: &str) -> Result<String> {
        let out = self.go_ios(&["info", "--udid", device_id]).await?;
        let info: DeviceInfo = parse_json_output(&out)?;
        Ok(info.device_name)
    }

    /// Connected devices; missing go-ios yields an empty list
    pub async fn list_devices(&self) -> Vec<IosDevice> {
        if !self.is_go_ios_installed().await {
            tracing::warn!("go-ios is not installed, no physical iOS devices can be detected");
            return Vec::new();
        }

        let list: DeviceList = match self.go_ios(&["list"]).await.and_then(|out| parse_json_output(&out)) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Failed to list iOS devices: {}", e);
                return Vec::new();
            }
        };

        let mut devices = Vec::new();
        for device_id in list.device_list {
            let device_name = match self.device_name(&device_id).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!("Failed to read name of iOS device {}: {}", device_id, e);
                    device_id.clone()
                }
            };
            devices.push(IosDevice {
                device_id,
                device_name,
            });
        }
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;
    use crate::wda::testing::FakeDaemon;
    use tokio::net::TcpListener;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn robot(runner: ScriptedRunner, wda_port: u16, tunnel_port: u16) -> IosRobot {
        IosRobot::new(
            "00008110-0011",
            "ios",
            Arc::new(runner),
            DaemonConfig {
                host: "127.0.0.1".to_string(),
                wda_port,
                tunnel_port,
            },
        )
    }

    fn info(version: &str) -> String {
        format!(
            r#"{{"DeviceName":"Test iPhone","ProductVersion":"{}","DeviceClass":"iPhone"}}"#,
            version
        )
    }

    #[test]
    fn test_tunnel_required_from_major_version() {
        assert!(tunnel_required("17.0"));
        assert!(tunnel_required("18.2.1"));
        assert!(!tunnel_required("16.7.10"));
        assert!(!tunnel_required(""));
    }

    #[test]
    fn test_parse_app_list_keeps_full_name() {
        let apps = parse_app_list("com.apple.Preferences Settings\ncom.example.app My Great App\n\n");
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].package_name, "com.example.app");
        assert_eq!(apps[1].app_name, "My Great App");
    }

    #[test]
    fn test_parse_json_output_skips_log_lines() {
        let out = b"time=\"2024\" level=info msg=\"starting\"\n{\"deviceList\":[\"abc\"]}\n";
        let list: DeviceList = parse_json_output(out).unwrap();
        assert_eq!(list.device_list, vec!["abc"]);
    }

    #[tokio::test]
    async fn test_missing_tunnel_on_ios_17() {
        let robot = robot(
            ScriptedRunner::new().on("info", info("17.4")),
            closed_port().await,
            closed_port().await,
        );
        let err = robot.tap(1, 1).await.unwrap_err();
        assert!(err.is_actionable());
        assert!(err.to_string().starts_with("iOS tunnel is not running"), "got: {}", err);
    }

    #[tokio::test]
    async fn test_missing_port_forward() {
        let tunnel = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tunnel_port = tunnel.local_addr().unwrap().port();
        let robot = robot(
            ScriptedRunner::new().on("info", info("17.4")),
            closed_port().await,
            tunnel_port,
        );
        let err = robot.get_screen_size().await.unwrap_err();
        assert!(
            err.to_string().starts_with("Port forwarding to WebDriverAgent is not running (tunnel okay)"),
            "got: {}",
            err
        );
    }

    #[tokio::test]
    async fn test_daemon_not_ready() {
        let daemon = FakeDaemon::start(|_, _, _| (200, r#"{"value":{"ready":false}}"#.into())).await;
        // iOS 16 skips the tunnel check entirely
        let robot = robot(
            ScriptedRunner::new().on("info", info("16.7")),
            daemon.port,
            closed_port().await,
        );
        let err = robot.get_screenshot().await.unwrap_err();
        assert!(
            err.to_string().starts_with("WebDriverAgent is not running on device (tunnel okay, port forwarding okay)"),
            "got: {}",
            err
        );
    }

    #[tokio::test]
    async fn test_healthy_chain_reaches_daemon() {
        let daemon = FakeDaemon::healthy().await;
        let robot = robot(
            ScriptedRunner::new().on("info", info("16.7")),
            daemon.port,
            closed_port().await,
        );
        robot.tap(5, 6).await.unwrap();
        assert!(daemon.lines().iter().any(|l| l.ends_with("/actions")));
    }

    #[tokio::test]
    async fn test_install_failure_carries_go_ios_output() {
        let robot = robot(
            ScriptedRunner::new()
                .on("info", info("16.7"))
                .fail("install", "failed installing: ApplicationVerificationFailed"),
            closed_port().await,
            closed_port().await,
        );
        let err = robot.install_app("/tmp/app.ipa").await.unwrap_err();
        assert!(err.is_actionable());
        assert!(err.to_string().contains("ApplicationVerificationFailed"));
    }

    #[tokio::test]
    async fn test_manager_lists_devices_with_names() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("ios version", r#"{"version":"v1.0.182"}"#)
                .on("ios list", r#"{"deviceList":["00008110-0011"]}"#)
                .on("info --udid 00008110-0011", info("17.4")),
        );
        let manager = IosManager::new("ios", runner, DaemonConfig::default());
        assert_eq!(
            manager.list_devices().await,
            vec![IosDevice {
                device_id: "00008110-0011".to_string(),
                device_name: "Test iPhone".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_manager_without_go_ios() {
        let runner = Arc::new(ScriptedRunner::new().fail("version", "command not found"));
        let manager = IosManager::new("ios", runner.clone(), DaemonConfig::default());
        assert!(manager.list_devices().await.is_empty());
        assert_eq!(runner.calls().len(), 1, "nothing else runs without go-ios");

        let dev_build = Arc::new(ScriptedRunner::new().on("version", r#"{"version":"local-build"}"#));
        assert!(IosManager::new("ios", dev_build, DaemonConfig::default())
            .is_go_ios_installed()
            .await);
    }
}
