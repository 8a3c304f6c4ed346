//! Constants used throughout the MCP server
//!
//! This module centralizes magic numbers and fixed strings.

/// Appended to actionable failures so the model knows to retry
pub const RETRY_SUFFIX: &str = ". Please fix the issue and try again.";

/// Product name reported in telemetry
pub const PRODUCT_NAME: &str = "mobile-mcp";

/// tracing target for usage events
pub const TELEMETRY_TARGET: &str = "telemetry";

/// Timeout for a telemetry POST
pub const TELEMETRY_TIMEOUT_SECS: u64 = 5;

/// Prefix of `mobilecli --version` output
pub const MOBILECLI_VERSION_PREFIX: &str = "mobilecli version ";
