//! MCP server for mobile device automation
//!
//! This server exposes Android devices, physical iOS devices and booted iOS
//! simulators as MCP tools over stdio.

mod config;
mod constants;
mod errors;
mod guide;
mod mobilecli;
mod requests;
mod telemetry;
mod tools;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Command, ServerConfig};
use mobile_mcp_robot::{
    AndroidDeviceManager, CommandRunner, ImageTools, IosManager, SimctlManager, SystemRunner,
};
use requests::{
    CoordinatesRequest, DeviceRequest, InstallAppRequest, LaunchAppRequest, OpenUrlRequest,
    PressButtonRequest, SaveScreenshotRequest, SetOrientationRequest, SwipeRequest,
    TerminateAppRequest, TypeKeysRequest, UninstallAppRequest,
};
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use telemetry::Telemetry;
use tools::devices::DeviceRegistry;
use tools::{ToolContext, apps, devices, input, screen, screenshot};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// mobile-mcp server handler
#[derive(Clone)]
struct MobileMcpServer {
    ctx: Arc<ToolContext>,
    tool_router: ToolRouter<Self>,
}

impl MobileMcpServer {
    fn new(ctx: ToolContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MobileMcpServer {
    #[tool(
        description = "List all available devices. This includes both physical devices and simulators. If there is more than one device returned, you need to let the user select one of them."
    )]
    async fn mobile_list_available_devices(&self) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run(
                "mobile_list_available_devices",
                &serde_json::json!({}),
                devices::list_available_devices(ctx),
            )
            .await)
    }

    #[tool(description = "List all the installed apps on the device")]
    async fn mobile_list_apps(
        &self,
        Parameters(req): Parameters<DeviceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_list_apps", &req, async {
                let robot = ctx.robot(&req.device).await?;
                apps::list_apps(robot.as_ref()).await
            })
            .await)
    }

    #[tool(
        description = "Launch an app on mobile device. Use this to open a specific app. You can find the package name of the app by calling list_apps_on_device."
    )]
    async fn mobile_launch_app(
        &self,
        Parameters(req): Parameters<LaunchAppRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_launch_app", &req, async {
                let robot = ctx.robot(&req.device).await?;
                apps::launch_app(robot.as_ref(), &req.package_name).await
            })
            .await)
    }

    #[tool(description = "Stop and terminate an app on mobile device")]
    async fn mobile_terminate_app(
        &self,
        Parameters(req): Parameters<TerminateAppRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_terminate_app", &req, async {
                let robot = ctx.robot(&req.device).await?;
                apps::terminate_app(robot.as_ref(), &req.package_name).await
            })
            .await)
    }

    #[tool(description = "Install an app on mobile device")]
    async fn mobile_install_app(
        &self,
        Parameters(req): Parameters<InstallAppRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_install_app", &req, async {
                let robot = ctx.robot(&req.device).await?;
                apps::install_app(robot.as_ref(), &req.path).await
            })
            .await)
    }

    #[tool(description = "Uninstall an app from mobile device")]
    async fn mobile_uninstall_app(
        &self,
        Parameters(req): Parameters<UninstallAppRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_uninstall_app", &req, async {
                let robot = ctx.robot(&req.device).await?;
                apps::uninstall_app(robot.as_ref(), &req.bundle_id).await
            })
            .await)
    }

    #[tool(description = "Get the screen size of the mobile device in pixels")]
    async fn mobile_get_screen_size(
        &self,
        Parameters(req): Parameters<DeviceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_get_screen_size", &req, async {
                let robot = ctx.robot(&req.device).await?;
                screen::screen_size(robot.as_ref()).await
            })
            .await)
    }

    #[tool(
        description = "Click on the screen at given x,y coordinates. If clicking on an element, use the list_elements_on_screen tool to find the coordinates."
    )]
    async fn mobile_click_on_screen_at_coordinates(
        &self,
        Parameters(req): Parameters<CoordinatesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_click_on_screen_at_coordinates", &req, async {
                let robot = ctx.robot(&req.device).await?;
                input::tap(robot.as_ref(), req.x, req.y).await
            })
            .await)
    }

    #[tool(description = "Double-tap on the screen at given x,y coordinates.")]
    async fn mobile_double_tap_on_screen(
        &self,
        Parameters(req): Parameters<CoordinatesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_double_tap_on_screen", &req, async {
                let robot = ctx.robot(&req.device).await?;
                input::double_tap(robot.as_ref(), req.x, req.y).await
            })
            .await)
    }

    #[tool(
        description = "Long press on the screen at given x,y coordinates. If long pressing on an element, use the list_elements_on_screen tool to find the coordinates."
    )]
    async fn mobile_long_press_on_screen_at_coordinates(
        &self,
        Parameters(req): Parameters<CoordinatesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_long_press_on_screen_at_coordinates", &req, async {
                let robot = ctx.robot(&req.device).await?;
                input::long_press(robot.as_ref(), req.x, req.y).await
            })
            .await)
    }

    #[tool(
        description = "List elements on screen and their coordinates, with display text or accessibility label. Do not cache this result."
    )]
    async fn mobile_list_elements_on_screen(
        &self,
        Parameters(req): Parameters<DeviceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_list_elements_on_screen", &req, async {
                let robot = ctx.robot(&req.device).await?;
                screen::list_elements(robot.as_ref()).await
            })
            .await)
    }

    #[tool(description = "Press a button on device")]
    async fn mobile_press_button(
        &self,
        Parameters(req): Parameters<PressButtonRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_press_button", &req, async {
                let robot = ctx.robot(&req.device).await?;
                input::press_button(robot.as_ref(), &req.button).await
            })
            .await)
    }

    #[tool(description = "Open a URL in browser on device")]
    async fn mobile_open_url(
        &self,
        Parameters(req): Parameters<OpenUrlRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_open_url", &req, async {
                let robot = ctx.robot(&req.device).await?;
                input::open_url(robot.as_ref(), &req.url).await
            })
            .await)
    }

    #[tool(description = "Swipe on the screen")]
    async fn mobile_swipe_on_screen(
        &self,
        Parameters(req): Parameters<SwipeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_swipe_on_screen", &req, async {
                let robot = ctx.robot(&req.device).await?;
                input::swipe(robot.as_ref(), &req.direction, req.x, req.y, req.distance).await
            })
            .await)
    }

    #[tool(description = "Type text into the focused element")]
    async fn mobile_type_keys(
        &self,
        Parameters(req): Parameters<TypeKeysRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_type_keys", &req, async {
                let robot = ctx.robot(&req.device).await?;
                input::type_keys(robot.as_ref(), &req.text, req.submit).await
            })
            .await)
    }

    #[tool(description = "Save a screenshot of the mobile device to a file")]
    async fn mobile_save_screenshot(
        &self,
        Parameters(req): Parameters<SaveScreenshotRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_save_screenshot", &req, async {
                let robot = ctx.robot(&req.device).await?;
                screenshot::save_screenshot(robot.as_ref(), &req.save_to).await
            })
            .await)
    }

    #[tool(
        description = "Take a screenshot of the mobile device. Use this to understand what's on screen, if you need to press an element that is available through view hierarchy then you must list elements on screen instead. Do not cache this result."
    )]
    async fn mobile_take_screenshot(
        &self,
        Parameters(req): Parameters<DeviceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_take_screenshot", &req, async {
                let robot = ctx.robot(&req.device).await?;
                screenshot::take_screenshot(robot.as_ref(), &ctx.images).await
            })
            .await)
    }

    #[tool(description = "Change the screen orientation of the device")]
    async fn mobile_set_orientation(
        &self,
        Parameters(req): Parameters<SetOrientationRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_set_orientation", &req, async {
                let robot = ctx.robot(&req.device).await?;
                screen::set_orientation(robot.as_ref(), &req.orientation).await
            })
            .await)
    }

    #[tool(description = "Get the current screen orientation of the device")]
    async fn mobile_get_orientation(
        &self,
        Parameters(req): Parameters<DeviceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = &self.ctx;
        Ok(ctx
            .run("mobile_get_orientation", &req, async {
                let robot = ctx.robot(&req.device).await?;
                screen::get_orientation(robot.as_ref()).await
            })
            .await)
    }
}

#[tool_handler]
impl ServerHandler for MobileMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "mobile-mcp automates Android devices, iOS devices and iOS simulators. \
                 Start with 'mobile_list_available_devices', then pass the chosen device id \
                 to the other tools. Prefer 'mobile_list_elements_on_screen' over screenshots \
                 when you need coordinates."
                    .into(),
            ),
        }
    }
}

/// Logs go to stderr (stdout is the MCP channel) and optionally to a file
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
    Ok(())
}

fn build_context(config: &ServerConfig, runner: Arc<dyn CommandRunner>) -> ToolContext {
    let daemon = config.daemon();
    let devices = DeviceRegistry::new(
        AndroidDeviceManager::new(config.adb_path(), runner.clone()),
        IosManager::new(config.go_ios_path(), runner.clone(), daemon.clone()),
        SimctlManager::new(runner.clone(), daemon),
    );
    let crosscheck = (!config.no_device_crosscheck)
        .then(|| mobilecli::Mobilecli::new(config.mobilecli_path(), runner.clone()));

    ToolContext {
        devices,
        images: ImageTools::new(runner, !config.no_builtin_image),
        telemetry: Telemetry::new(config.telemetry_url.clone()),
        crosscheck,
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    tracing::info!("Starting mobile-mcp server...");

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let ctx = build_context(&config, runner.clone());

    let mobilecli_version = mobilecli::Mobilecli::new(config.mobilecli_path(), runner)
        .version()
        .await;
    ctx.telemetry.emit(
        "launch",
        props! { "MobilecliVersion" => mobilecli_version },
    );

    let server = MobileMcpServer::new(ctx);
    let service = server.serve(stdio()).await?;

    tracing::info!("Server started, waiting for connections...");
    service.waiting().await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Guide) => {
            guide::print_guide();
            Ok(())
        }
        Some(Command::Serve) | None => {
            init_logging(cli.config.log_file.as_deref())?;
            serve(cli.config).await
        }
    }
}
