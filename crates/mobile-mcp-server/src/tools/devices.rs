//! Device discovery and resolution

use super::ToolContext;
use crate::errors::ToolError;
use crate::props;
use crate::telemetry::Properties;
use mobile_mcp_protocol::{AndroidDevice, AndroidDeviceType, IosDevice, Simulator};
use mobile_mcp_robot::{AndroidDeviceManager, IosManager, Robot, SimctlManager};

/// Everything reachable right now, gathered fresh for each call
#[derive(Debug, Clone, Default)]
pub struct DeviceInventory {
    /// Booted simulators only
    pub simulators: Vec<Simulator>,
    pub android: Vec<AndroidDevice>,
    pub ios: Vec<IosDevice>,
}

impl DeviceInventory {
    pub fn len(&self) -> usize {
        self.simulators.len() + self.android.len() + self.ios.len()
    }
}

/// Which backend a device id maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    Simulator { uuid: String },
    Android { serial: String },
    Ios { udid: String },
}

/// Map a device id onto the inventory.
///
/// Simulators win over Android devices, which win over physical iOS devices.
pub fn resolve_device(inventory: &DeviceInventory, device: &str) -> Result<DeviceTarget, ToolError> {
    if let Some(sim) = inventory
        .simulators
        .iter()
        .find(|s| s.name == device || s.uuid == device)
    {
        return Ok(DeviceTarget::Simulator {
            uuid: sim.uuid.clone(),
        });
    }

    if inventory.android.iter().any(|d| d.device_id == device) {
        return Ok(DeviceTarget::Android {
            serial: device.to_string(),
        });
    }

    if inventory.ios.iter().any(|d| d.device_id == device) {
        return Ok(DeviceTarget::Ios {
            udid: device.to_string(),
        });
    }

    Err(ToolError::device_not_found(device))
}

/// Text answer of `mobile_list_available_devices`
pub fn format_device_list(inventory: &DeviceInventory) -> String {
    let join = |ids: Vec<&str>| ids.join(",");
    let android_of = |kind: AndroidDeviceType| {
        inventory
            .android
            .iter()
            .filter(|d| d.device_type == kind)
            .map(|d| d.device_id.as_str())
            .collect::<Vec<_>>()
    };

    let mut lines = vec!["Found these devices:".to_string()];
    if !inventory.simulators.is_empty() {
        let names = inventory.simulators.iter().map(|s| s.name.as_str()).collect();
        lines.push(format!("iOS simulators: [{}]", join(names)));
    }
    if !inventory.ios.is_empty() {
        let ids = inventory.ios.iter().map(|d| d.device_id.as_str()).collect();
        lines.push(format!("iOS devices: [{}]", join(ids)));
    }
    let mobile = android_of(AndroidDeviceType::Mobile);
    if !mobile.is_empty() {
        lines.push(format!("Android devices: [{}]", join(mobile)));
    }
    let tv = android_of(AndroidDeviceType::Tv);
    if !tv.is_empty() {
        lines.push(format!("Android TV devices: [{}]", join(tv)));
    }
    lines.join("\n")
}

/// The three device managers, constructed once and shared by every tool
pub struct DeviceRegistry {
    android: AndroidDeviceManager,
    ios: IosManager,
    simulators: SimctlManager,
}

impl DeviceRegistry {
    pub fn new(android: AndroidDeviceManager, ios: IosManager, simulators: SimctlManager) -> Self {
        Self {
            android,
            ios,
            simulators,
        }
    }

    pub async fn inventory(&self) -> DeviceInventory {
        let (simulators, android, ios) = tokio::join!(
            self.simulators.list_booted_simulators(),
            self.android.connected_devices(),
            self.ios.list_devices(),
        );
        DeviceInventory {
            simulators,
            android,
            ios,
        }
    }

    pub fn robot(&self, target: &DeviceTarget) -> Box<dyn Robot> {
        match target {
            DeviceTarget::Simulator { uuid } => Box::new(self.simulators.robot(uuid)),
            DeviceTarget::Android { serial } => Box::new(self.android.robot(serial)),
            DeviceTarget::Ios { udid } => Box::new(self.ios.robot(udid)),
        }
    }

    pub async fn resolve(&self, device: &str) -> Result<Box<dyn Robot>, ToolError> {
        let inventory = self.inventory().await;
        let target = resolve_device(&inventory, device)?;
        tracing::debug!("Resolved device {} to {:?}", device, target);
        Ok(self.robot(&target))
    }
}

const SAME_DEVICE_COUNT: &str = "debug_mobilecli_same_number_of_devices";
const DIFFERENT_DEVICE_COUNT: &str = "debug_mobilecli_different_number_of_devices";

/// Compare our device count against mobilecli; informational only.
///
/// Returns the emitted event, or `None` when the cross-check is disabled.
async fn crosscheck_device_count(ctx: &ToolContext, device_count: usize) -> Option<&'static str> {
    let mobilecli = ctx.crosscheck.as_ref()?;
    let mobilecli_count = mobilecli.device_count().await;
    let (event, mut properties) = if device_count == mobilecli_count {
        (SAME_DEVICE_COUNT, Properties::new())
    } else {
        (
            DIFFERENT_DEVICE_COUNT,
            props! { "DeviceCountDifference" => device_count as i64 - mobilecli_count as i64 },
        )
    };
    properties.extend(props! {
        "DeviceCount" => device_count,
        "MobilecliDeviceCount" => mobilecli_count,
    });
    ctx.telemetry.emit(event, properties);
    Some(event)
}

pub async fn list_available_devices(ctx: &ToolContext) -> Result<String, ToolError> {
    let inventory = ctx.devices.inventory().await;
    crosscheck_device_count(ctx, inventory.len()).await;
    Ok(format_device_list(&inventory))
}
