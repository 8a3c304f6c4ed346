//! Command-line configuration
//!
//! Every option can also be set through an environment variable so MCP client
//! configs can pass settings either way.

use clap::{Args, Parser, Subcommand};
use mobile_mcp_robot::constants::{IOS_TUNNEL_PORT, WDA_PORT};
use mobile_mcp_robot::{DaemonConfig, paths};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "mobile-mcp",
    version,
    about = "MCP server for Android and iOS device automation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: ServerConfig,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Print the setup guide
    Guide,
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Path to adb [default: $ANDROID_HOME/platform-tools/adb, then the SDK default, then adb]
    #[arg(long, env = "ADB_PATH")]
    pub adb_path: Option<String>,

    /// Path to the go-ios binary
    #[arg(long, env = "GO_IOS_PATH")]
    pub go_ios_path: Option<String>,

    /// Path to mobilecli, used only for the device listing cross-check
    #[arg(long, env = "MOBILECLI_PATH")]
    pub mobilecli_path: Option<String>,

    /// Port WebDriverAgent listens on
    #[arg(long, default_value_t = WDA_PORT)]
    pub wda_port: u16,

    /// Port of the go-ios tunnel agent
    #[arg(long, default_value_t = IOS_TUNNEL_PORT)]
    pub tunnel_port: u16,

    /// Also append logs to this file
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Skip comparing the device count against mobilecli
    #[arg(long)]
    pub no_device_crosscheck: bool,

    /// Endpoint that receives usage events; unset keeps events in the log
    #[arg(long, env = "MOBILE_MCP_TELEMETRY_URL")]
    pub telemetry_url: Option<String>,

    /// Disable the in-process image encoder fallback
    #[arg(long)]
    pub no_builtin_image: bool,
}

impl ServerConfig {
    pub fn adb_path(&self) -> String {
        self.adb_path.clone().unwrap_or_else(paths::adb_path)
    }

    pub fn go_ios_path(&self) -> String {
        self.go_ios_path.clone().unwrap_or_else(paths::go_ios_path)
    }

    pub fn mobilecli_path(&self) -> String {
        self.mobilecli_path
            .clone()
            .unwrap_or_else(paths::mobilecli_path)
    }

    pub fn daemon(&self) -> DaemonConfig {
        DaemonConfig {
            wda_port: self.wda_port,
            tunnel_port: self.tunnel_port,
            ..DaemonConfig::default()
        }
    }
}
