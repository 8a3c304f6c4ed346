//! The device capability interface

use crate::error::Result;
use async_trait::async_trait;
use mobile_mcp_protocol::{
    Button, InstalledApp, Orientation, ScreenElement, ScreenSize, SwipeDirection,
};

/// Everything the tool server can ask of a device.
///
/// Coordinates are in the device's native units: pixels on Android, points on
/// iOS. User-fixable failures come back as [`crate::RobotError::Actionable`].
#[async_trait]
pub trait Robot: Send + Sync {
    async fn get_screen_size(&self) -> Result<ScreenSize>;

    /// Swipe across the middle of the screen
    async fn swipe(&self, direction: SwipeDirection) -> Result<()>;

    /// Swipe starting at a point; `distance` falls back to a platform default
    async fn swipe_from_coordinate(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: Option<i32>,
    ) -> Result<()>;

    /// Raw PNG bytes of the current screen
    async fn get_screenshot(&self) -> Result<Vec<u8>>;

    async fn list_apps(&self) -> Result<Vec<InstalledApp>>;

    async fn launch_app(&self, package_name: &str) -> Result<()>;

    async fn terminate_app(&self, package_name: &str) -> Result<()>;

    async fn install_app(&self, path: &str) -> Result<()>;

    async fn uninstall_app(&self, bundle_id: &str) -> Result<()>;

    async fn open_url(&self, url: &str) -> Result<()>;

    async fn send_keys(&self, text: &str) -> Result<()>;

    async fn press_button(&self, button: Button) -> Result<()>;

    async fn tap(&self, x: i32, y: i32) -> Result<()>;

    async fn double_tap(&self, x: i32, y: i32) -> Result<()>;

    async fn long_press(&self, x: i32, y: i32) -> Result<()>;

    async fn get_elements_on_screen(&self) -> Result<Vec<ScreenElement>>;

    async fn set_orientation(&self, orientation: Orientation) -> Result<()>;

    async fn get_orientation(&self) -> Result<Orientation>;
}
