//! App lifecycle tools

use crate::errors::ToolError;
use mobile_mcp_protocol::InstalledApp;
use mobile_mcp_robot::Robot;

pub fn format_app_list(apps: &[InstalledApp]) -> String {
    let apps = apps
        .iter()
        .map(|app| format!("{} ({})", app.app_name, app.package_name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Found these apps on device: {}", apps)
}

pub async fn list_apps(robot: &dyn Robot) -> Result<String, ToolError> {
    let apps = robot.list_apps().await?;
    Ok(format_app_list(&apps))
}

pub async fn launch_app(robot: &dyn Robot, package_name: &str) -> Result<String, ToolError> {
    robot.launch_app(package_name).await?;
    Ok(format!("Launched app {}", package_name))
}

pub async fn terminate_app(robot: &dyn Robot, package_name: &str) -> Result<String, ToolError> {
    robot.terminate_app(package_name).await?;
    Ok(format!("Terminated app {}", package_name))
}

pub async fn install_app(robot: &dyn Robot, path: &str) -> Result<String, ToolError> {
    robot.install_app(path).await?;
    Ok(format!("Installed app from {}", path))
}

pub async fn uninstall_app(robot: &dyn Robot, bundle_id: &str) -> Result<String, ToolError> {
    robot.uninstall_app(bundle_id).await?;
    Ok(format!("Uninstalled app {}", bundle_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::FakeRobot;

    #[tokio::test]
    async fn test_list_apps() {
        let robot = FakeRobot::default();
        assert_eq!(
            list_apps(&robot).await.unwrap(),
            "Found these apps on device: Settings (com.android.settings), Chrome (com.android.chrome)"
        );
    }

    #[tokio::test]
    async fn test_lifecycle_messages() {
        let robot = FakeRobot::default();
        assert_eq!(
            launch_app(&robot, "com.example").await.unwrap(),
            "Launched app com.example"
        );
        assert_eq!(
            terminate_app(&robot, "com.example").await.unwrap(),
            "Terminated app com.example"
        );
        assert_eq!(
            install_app(&robot, "/tmp/app.apk").await.unwrap(),
            "Installed app from /tmp/app.apk"
        );
        assert_eq!(
            uninstall_app(&robot, "com.example").await.unwrap(),
            "Uninstalled app com.example"
        );
        assert_eq!(
            robot.calls(),
            vec![
                "launch_app com.example",
                "terminate_app com.example",
                "install_app /tmp/app.apk",
                "uninstall_app com.example",
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let robot = FakeRobot {
            actionable_failure: Some("Failed to uninstall app".into()),
            ..FakeRobot::default()
        };
        let err = uninstall_app(&robot, "com.example").await.unwrap_err();
        assert!(err.is_actionable());
        assert_eq!(err.to_string(), "Failed to uninstall app");
    }
}
