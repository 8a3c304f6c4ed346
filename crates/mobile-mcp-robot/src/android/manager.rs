//! Android device discovery

use super::AndroidRobot;
use crate::exec::{CommandRunner, ExecOptions};
use mobile_mcp_protocol::{AndroidDevice, AndroidDeviceType};
use std::sync::Arc;

const TV_FEATURES: [&str; 2] = ["android.software.leanback", "android.hardware.type.television"];

/// Serials listed by `adb devices`; daemon chatter without a state column is skipped
pub(crate) fn parse_adb_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices attached"))
        .filter_map(|line| line.split_once('\t'))
        .map(|(serial, _state)| serial.to_string())
        .collect()
}

/// Enumerates devices visible to adb
#[derive(Clone)]
pub struct AndroidDeviceManager {
    adb_path: String,
    runner: Arc<dyn CommandRunner>,
}

impl AndroidDeviceManager {
    pub fn new(adb_path: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            adb_path: adb_path.into(),
            runner,
        }
    }

    /// Build a robot for one serial, sharing this manager's runner
    pub fn robot(&self, device_id: &str) -> AndroidRobot {
        AndroidRobot::new(device_id, self.adb_path.clone(), self.runner.clone())
    }

    async fn device_type(&self, device_id: &str) -> AndroidDeviceType {
        match self.robot(device_id).system_features().await {
            Ok(features) if features.iter().any(|f| TV_FEATURES.contains(&f.as_str())) => {
                AndroidDeviceType::Tv
            }
            Ok(_) => AndroidDeviceType::Mobile,
            Err(e) => {
                tracing::debug!("Failed to read features of {}: {}", device_id, e);
                AndroidDeviceType::Mobile
            }
        }
    }

    /// Connected devices; an unusable adb yields an empty list
    pub async fn connected_devices(&self) -> Vec<AndroidDevice> {
        let output = match self
            .runner
            .run(&self.adb_path, &["devices".to_string()], &ExecOptions::default())
            .await
        {
            Ok(out) => String::from_utf8_lossy(&out).into_owned(),
            Err(e) => {
                tracing::warn!(
                    "Could not execute adb command, maybe ANDROID_HOME is not set? ({})",
                    e
                );
                return Vec::new();
            }
        };

        let mut devices = Vec::new();
        for device_id in parse_adb_devices(&output) {
            let device_type = self.device_type(&device_id).await;
            devices.push(AndroidDevice {
                device_id,
                device_type,
            });
        }
        devices
    }
}
