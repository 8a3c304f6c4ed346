//! Helper-tool path resolution.
//!
//! Priority for adb:
//! 1. `ANDROID_HOME/platform-tools/adb`
//! 2. `%LOCALAPPDATA%\Android\Sdk\platform-tools\adb.exe` (Windows, if present)
//! 3. `~/Library/Android/sdk/platform-tools/adb` (macOS, if present)
//! 4. `adb` on `PATH`
//!
//! go-ios and mobilecli take `GO_IOS_PATH` / `MOBILECLI_PATH` or fall back to
//! their bare names on `PATH`.

use std::env;
use std::path::PathBuf;

fn adb_exe_name() -> &'static str {
    if cfg!(windows) { "adb.exe" } else { "adb" }
}

/// Non-empty value of an environment variable
fn env_path(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Locate the adb binary
pub fn adb_path() -> String {
    if let Some(home) = env_path("ANDROID_HOME") {
        return PathBuf::from(home)
            .join("platform-tools")
            .join(adb_exe_name())
            .to_string_lossy()
            .into_owned();
    }

    if cfg!(windows) {
        if let Some(local) = env_path("LOCALAPPDATA") {
            let candidate = PathBuf::from(local)
                .join("Android")
                .join("Sdk")
                .join("platform-tools")
                .join("adb.exe");
            if candidate.exists() {
                return candidate.to_string_lossy().into_owned();
            }
        }
    }

    if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            let candidate = home
                .join("Library")
                .join("Android")
                .join("sdk")
                .join("platform-tools")
                .join("adb");
            if candidate.exists() {
                return candidate.to_string_lossy().into_owned();
            }
        }
    }

    adb_exe_name().to_string()
}

/// Locate the go-ios binary
pub fn go_ios_path() -> String {
    env_path("GO_IOS_PATH").unwrap_or_else(|| "ios".to_string())
}

/// Locate the mobilecli binary
pub fn mobilecli_path() -> String {
    env_path("MOBILECLI_PATH").unwrap_or_else(|| {
        if cfg!(windows) {
            "mobilecli.exe".to_string()
        } else {
            "mobilecli".to_string()
        }
    })
}
