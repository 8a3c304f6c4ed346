//! Device automation backends for mobile-mcp
//!
//! One capability interface, [`Robot`], implemented three ways:
//! - [`AndroidRobot`] drives adb shell commands
//! - [`IosRobot`] checks the tunnel / port-forward chain, then talks to
//!   WebDriverAgent on a physical device
//! - [`SimulatorRobot`] brings WebDriverAgent up on demand inside an iOS
//!   simulator and drives app lifecycle through simctl
//!
//! Robots are cheap, stateless values. Build a new one for every operation.

pub mod android;
mod archive;
pub mod constants;
pub mod error;
pub mod exec;
pub mod gesture;
pub mod image;
pub mod ios;
pub mod paths;
pub mod robot;
pub mod simulator;
pub mod wda;

pub use android::{AndroidDeviceManager, AndroidRobot};
pub use error::{Result, RobotError};
pub use exec::{CommandRunner, ExecError, ExecOptions, SystemRunner};
pub use self::image::{ImageTools, OutputFormat};
pub use ios::{IosManager, IosRobot};
pub use robot::Robot;
pub use simulator::{SimctlManager, SimulatorRobot};
pub use wda::{DaemonConfig, WdaSession, WebDriverAgent};

pub use mobile_mcp_protocol as protocol;
