//! Usage events
//!
//! Every event is logged on the `telemetry` target. When an endpoint is
//! configured the event is also POSTed there in the background; delivery
//! failures are ignored.

use crate::constants::{PRODUCT_NAME, TELEMETRY_TARGET, TELEMETRY_TIMEOUT_SECS};
use serde_json::{Map, Value, json};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

pub type Properties = Map<String, Value>;

/// Build an event property map from key/value pairs
#[macro_export]
macro_rules! props {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut map = $crate::telemetry::Properties::new();
        $(map.insert($key.to_string(), serde_json::json!($value));)*
        map
    }};
}

#[derive(Clone)]
pub struct Telemetry {
    endpoint: Option<(reqwest::Client, String)>,
    distinct_id: String,
}

impl Telemetry {
    pub fn new(url: Option<String>) -> Self {
        let endpoint = url.map(|url| {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(TELEMETRY_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new());
            (client, url)
        });
        Self {
            endpoint,
            distinct_id: installation_id(),
        }
    }

    pub fn payload(&self, event: &str, properties: Properties) -> Value {
        let mut all = system_properties();
        all.extend(properties);
        json!({
            "event": event,
            "properties": all,
            "distinct_id": self.distinct_id,
        })
    }

    pub fn emit(&self, event: &str, properties: Properties) {
        let payload = self.payload(event, properties);
        tracing::debug!(target: TELEMETRY_TARGET, event, payload = %payload);

        let Some((client, url)) = self.endpoint.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = client.post(&url).json(&payload).send().await {
                tracing::trace!(target: TELEMETRY_TARGET, "delivery failed: {}", e);
            }
        });
    }
}

fn system_properties() -> Properties {
    crate::props! {
        "Platform" => std::env::consts::OS,
        "Product" => PRODUCT_NAME,
        "Version" => env!("CARGO_PKG_VERSION"),
    }
}

/// Stable anonymous id for this installation, derived from the binary path
fn installation_id() -> String {
    let mut hasher = DefaultHasher::new();
    std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
        .hash(&mut hasher);
    std::env::consts::OS.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_merges_system_properties() {
        let telemetry = Telemetry::new(None);
        let payload = telemetry.payload("tool_invoked", crate::props! { "ToolName" => "mobile_open_url" });

        assert_eq!(payload["event"], "tool_invoked");
        assert_eq!(payload["properties"]["ToolName"], "mobile_open_url");
        assert_eq!(payload["properties"]["Product"], "mobile-mcp");
        assert_eq!(payload["properties"]["Platform"], std::env::consts::OS);
        assert_eq!(
            payload["distinct_id"].as_str().map(str::len),
            Some(16),
            "distinct id is a 64-bit hex hash"
        );
    }

    #[test]
    fn test_event_properties_override_system_ones() {
        let telemetry = Telemetry::new(None);
        let payload = telemetry.payload("launch", crate::props! { "Version" => "custom" });
        assert_eq!(payload["properties"]["Version"], "custom");
    }

    #[test]
    fn test_installation_id_is_stable() {
        assert_eq!(installation_id(), installation_id());
    }

    #[tokio::test]
    async fn test_disabled_emit_does_not_spawn() {
        Telemetry::new(None).emit("tool_failed", Properties::new());
    }
}
