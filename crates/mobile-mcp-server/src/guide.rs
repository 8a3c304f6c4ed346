//! Setup guide for mobile-mcp
//!
//! This module contains the guide text displayed by `mobile-mcp guide`.

/// Print the setup guide to stdout
pub fn print_guide() {
    let version = env!("CARGO_PKG_VERSION");
    print!(
        r#"
================================================================================
                          mobile-mcp Setup Guide
                              Version {version}
================================================================================

mobile-mcp lets MCP clients drive Android devices, physical iOS devices and
iOS simulators through a single set of tools.

--------------------------------------------------------------------------------
STEP 1: Install the platform tools
--------------------------------------------------------------------------------

Android (emulators and devices):
    Install the Android SDK platform-tools so that `adb` is available.
    mobile-mcp looks in $ANDROID_HOME/platform-tools, then the default SDK
    location, then $PATH. Use --adb-path to override.

iOS simulators (macOS only):
    Install Xcode and boot a simulator. Install WebDriverAgent on the
    simulator; mobile-mcp launches it on demand.

Physical iOS devices:
    Install go-ios (`ios` on $PATH, or --go-ios-path) and WebDriverAgent.
    Keep these running while you work:

        ios tunnel start --userspace      # iOS 17 and newer
        ios forward 8100 8100
        ios runwda

Screenshots are shrunk with sips (macOS) or ImageMagick when present, and
with the built-in encoder otherwise (disable with --no-builtin-image).

--------------------------------------------------------------------------------
STEP 2: Configure your MCP client
--------------------------------------------------------------------------------

Create or edit `.mcp.json` in your project root:

    {{
      "mcpServers": {{
        "mobile-mcp": {{
          "command": "mobile-mcp",
          "args": [],
          "env": {{
            "LOG_FILE": "/tmp/mobile-mcp.log"
          }}
        }}
      }}
    }}

For cargo-based development, use:

    {{
      "mcpServers": {{
        "mobile-mcp": {{
          "command": "cargo",
          "args": ["run", "-p", "mobile-mcp-server", "--"]
        }}
      }}
    }}

--------------------------------------------------------------------------------
STEP 3: Drive a device
--------------------------------------------------------------------------------

1. Connect a device or boot a simulator
2. Ask the agent to call mobile_list_available_devices
3. Use natural language to interact with the device:
   - "Open Settings and turn on dark mode"
   - "Take a screenshot"
   - "List the elements on screen and tap Sign in"

--------------------------------------------------------------------------------
Options
--------------------------------------------------------------------------------

    --adb-path <PATH>         ADB_PATH
    --go-ios-path <PATH>      GO_IOS_PATH
    --mobilecli-path <PATH>   MOBILECLI_PATH
    --wda-port <PORT>         default 8100
    --tunnel-port <PORT>      default 60105
    --log-file <PATH>         LOG_FILE
    --telemetry-url <URL>     MOBILE_MCP_TELEMETRY_URL
    --no-device-crosscheck
    --no-builtin-image

For more information, visit: https://github.com/mobile-next/mobile-mcp/wiki
"#
    );
}
