//! mobilecli probes
//!
//! mobilecli is an independent device discovery tool. It is only asked for
//! its version and device count; nothing it reports changes tool behavior.

use crate::constants::MOBILECLI_VERSION_PREFIX;
use mobile_mcp_robot::exec::args;
use mobile_mcp_robot::{CommandRunner, ExecOptions};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    status: String,
    data: Option<DevicesData>,
}

#[derive(Debug, Deserialize)]
struct DevicesData {
    #[serde(default)]
    devices: Vec<serde_json::Value>,
}

/// Device count from `mobilecli devices` output; anything unexpected is 0
pub fn parse_device_count(output: &[u8]) -> usize {
    match serde_json::from_slice::<DevicesResponse>(output) {
        Ok(DevicesResponse {
            status,
            data: Some(data),
        }) if status == "ok" => data.devices.len(),
        _ => 0,
    }
}

/// Version from `mobilecli --version`, or a `failed` marker
pub fn parse_version(output: &str) -> String {
    output
        .trim()
        .strip_prefix(MOBILECLI_VERSION_PREFIX)
        .map(str::to_string)
        .unwrap_or_else(|| "failed".to_string())
}

#[derive(Clone)]
pub struct Mobilecli {
    path: String,
    runner: Arc<dyn CommandRunner>,
}

impl Mobilecli {
    pub fn new(path: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            path: path.into(),
            runner,
        }
    }

    pub async fn version(&self) -> String {
        match self
            .runner
            .run(&self.path, &args(["--version"]), &ExecOptions::default())
            .await
        {
            Ok(out) => parse_version(&String::from_utf8_lossy(&out)),
            Err(e) => format!("failed {}", e),
        }
    }

    pub async fn device_count(&self) -> usize {
        match self
            .runner
            .run(&self.path, &args(["devices"]), &ExecOptions::default())
            .await
        {
            Ok(out) => parse_device_count(&out),
            Err(e) => {
                tracing::debug!("mobilecli devices failed: {}", e);
                0
            }
        }
    }
}
