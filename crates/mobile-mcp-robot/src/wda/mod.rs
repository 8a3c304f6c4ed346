//! WebDriverAgent HTTP client
//!
//! Every high-level operation runs inside [`WebDriverAgent::within_session`]:
//! a session is created, the operation runs against it, and the session is
//! deleted again whatever the outcome. Page source and screenshots are
//! session-less endpoints.

mod actions;
mod source;
#[cfg(test)]
pub(crate) mod testing;

use crate::constants::{DAEMON_HOST, HTTP_TIMEOUT, IOS_DEFAULT_SWIPE_DISTANCE, IOS_TUNNEL_PORT, WDA_PORT};
use crate::error::{Result, RobotError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mobile_mcp_protocol::{Button, Orientation, ScreenElement, ScreenSize, SwipeDirection};
use serde_json::{Value, json};
use std::future::Future;

/// Where the automation daemon and the iOS tunnel listen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub host: String,
    pub wda_port: u16,
    pub tunnel_port: u16,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: DAEMON_HOST.to_string(),
            wda_port: WDA_PORT,
            tunnel_port: IOS_TUNNEL_PORT,
        }
    }
}

async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RobotError::actionable(format!(
        "{}: {} {}",
        what,
        status.as_u16(),
        body
    )))
}

/// Client for one WebDriverAgent instance
#[derive(Debug, Clone)]
pub struct WebDriverAgent {
    base_url: String,
    http: reqwest::Client,
}

impl WebDriverAgent {
    pub fn new(host: &str, port: u16) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: format!("http://{}:{}", host, port),
            http,
        }
    }

    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(&config.host, config.wda_port)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the daemon answers `/status` with `ready: true`; never errors
    pub async fn is_running(&self) -> bool {
        let url = format!("{}/status", self.base_url);
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("WebDriverAgent status check failed: {}", e);
                return false;
            }
        };
        if response.status() != reqwest::StatusCode::OK {
            return false;
        }
        match response.json::<Value>().await {
            Ok(json) => json["value"]["ready"] == Value::Bool(true),
            Err(_) => false,
        }
    }

    async fn create_session(&self) -> Result<String> {
        let url = format!("{}/session", self.base_url);
        let body = json!({ "capabilities": { "alwaysMatch": { "platformName": "iOS" } } });
        let response = self.http.post(&url).json(&body).send().await?;
        let response = ensure_success(response, "Failed to create WebDriver session").await?;
        let json: Value = response.json().await?;
        json["value"]["sessionId"]
            .as_str()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| RobotError::actionable(format!("Invalid session response: {}", json)))
    }

    /// Run `f` against a fresh session, then delete the session.
    ///
    /// Deletion happens on success, on error, and (through a drop guard) when
    /// the returned future is cancelled or `f` panics. A failed delete is
    /// logged and never replaces the result of `f`.
    pub async fn within_session<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(WdaSession) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session_id = self.create_session().await?;
        let session = WdaSession {
            url: format!("{}/session/{}", self.base_url, session_id),
            http: self.http.clone(),
        };
        let guard = SessionGuard::new(self.http.clone(), session.url.clone());

        let result = f(session).await;
        guard.release().await;
        result
    }

    pub async fn get_screen_size(&self) -> Result<ScreenSize> {
        self.within_session(|s| async move { s.screen_size().await })
            .await
    }

    pub async fn send_keys(&self, text: &str) -> Result<()> {
        self.within_session(|s| async move { s.send_keys(text).await })
            .await
    }

    pub async fn press_button(&self, button: Button) -> Result<()> {
        let name = match button {
            Button::Enter => return self.send_keys("\n").await,
            Button::Home => "home",
            Button::VolumeUp => "volumeup",
            Button::VolumeDown => "volumedown",
            other => {
                return Err(RobotError::actionable(format!(
                    "Button \"{}\" is not supported",
                    other
                )));
            }
        };
        self.within_session(|s| async move { s.press_button(name).await })
            .await
    }

    pub async fn tap(&self, x: i32, y: i32) -> Result<()> {
        self.within_session(|s| async move { s.perform_actions(actions::tap(x, y)).await })
            .await
    }

    pub async fn double_tap(&self, x: i32, y: i32) -> Result<()> {
        self.within_session(|s| async move { s.perform_actions(actions::double_tap(x, y)).await })
            .await
    }

    pub async fn long_press(&self, x: i32, y: i32) -> Result<()> {
        self.within_session(|s| async move { s.perform_actions(actions::long_press(x, y)).await })
            .await
    }

    pub async fn swipe(&self, direction: SwipeDirection) -> Result<()> {
        self.within_session(|s| async move {
            let size = s.screen_size().await?;
            let path = actions::swipe_path(size, direction);
            s.perform_actions(actions::drag(path)).await
        })
        .await
    }

    pub async fn swipe_from_coordinate(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: Option<i32>,
    ) -> Result<()> {
        let distance = distance
            .filter(|d| *d > 0)
            .unwrap_or(IOS_DEFAULT_SWIPE_DISTANCE);
        let path = actions::swipe_from_coordinate_path(x, y, direction, distance);
        self.within_session(|s| async move { s.perform_actions(actions::drag(path)).await })
            .await
    }

    pub async fn open_url(&self, url: &str) -> Result<()> {
        self.within_session(|s| async move { s.open_url(url).await })
            .await
    }

    pub async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        self.within_session(|s| async move { s.set_orientation(orientation).await })
            .await
    }

    pub async fn get_orientation(&self) -> Result<Orientation> {
        self.within_session(|s| async move { s.orientation().await })
            .await
    }

    pub async fn get_elements_on_screen(&self) -> Result<Vec<ScreenElement>> {
        let url = format!("{}/source?format=json", self.base_url);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let tree: source::SourceTree = response.json().await?;
        Ok(source::filter_elements(&tree.value))
    }

    pub async fn get_screenshot(&self) -> Result<Vec<u8>> {
        let url = format!("{}/screenshot", self.base_url);
        let json: Value = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let encoded: String = json["value"]
            .as_str()
            .ok_or_else(|| RobotError::parse("Screenshot response carries no image data"))?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(BASE64.decode(encoded)?)
    }
}

/// Deletes a session unless released explicitly
struct SessionGuard {
    http: reqwest::Client,
    url: String,
    armed: bool,
}

impl SessionGuard {
    fn new(http: reqwest::Client, url: String) -> Self {
        Self {
            http,
            url,
            armed: true,
        }
    }

    async fn release(mut self) {
        self.armed = false;
        delete_session(&self.http, &self.url).await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let http = self.http.clone();
        let url = self.url.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { delete_session(&http, &url).await });
            }
            Err(_) => tracing::warn!("No runtime to delete WebDriver session {}", url),
        }
    }
}

async fn delete_session(http: &reqwest::Client, url: &str) {
    match http.delete(url).send().await {
        Ok(response) if response.status().is_success() => {}
        Ok(response) => tracing::warn!(
            "Deleting WebDriver session {} returned {}",
            url,
            response.status()
        ),
        Err(e) => tracing::warn!("Failed to delete WebDriver session {}: {}", url, e),
    }
}

/// Handle on an open session, valid only inside `within_session`
#[derive(Debug, Clone)]
pub struct WdaSession {
    http: reqwest::Client,
    url: String,
}

impl WdaSession {
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}{}", self.url, path))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        Ok(self
            .http
            .get(format!("{}{}", self.url, path))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn screen_size(&self) -> Result<ScreenSize> {
        let json = self.get("/wda/screen").await?;
        let value = &json["value"];
        let dimension = |key: &str| {
            value["screenSize"][key]
                .as_f64()
                .map(|v| v.round() as u32)
                .ok_or_else(|| RobotError::parse(format!("Screen size response lacks {}", key)))
        };
        let scale = value["scale"].as_f64().filter(|s| *s > 0.0).unwrap_or(1.0);
        Ok(ScreenSize {
            width: dimension("width")?,
            height: dimension("height")?,
            scale,
        })
    }

    /// Submit a pointer script, then release all input sources
    pub async fn perform_actions(&self, script: Value) -> Result<()> {
        let url = format!("{}/actions", self.url);
        let response = self.http.post(&url).json(&script).send().await?;
        ensure_success(response, "WebDriver actions request failed").await?;
        if let Err(e) = self.http.delete(&url).send().await {
            tracing::debug!("Failed to clear WebDriver actions: {}", e);
        }
        Ok(())
    }

    pub async fn send_keys(&self, text: &str) -> Result<()> {
        self.post("/wda/keys", &json!({ "value": [text] })).await?;
        Ok(())
    }

    pub async fn press_button(&self, name: &str) -> Result<()> {
        self.post("/wda/pressButton", &json!({ "name": name })).await?;
        Ok(())
    }

    pub async fn open_url(&self, url: &str) -> Result<()> {
        self.post("/url", &json!({ "url": url })).await?;
        Ok(())
    }

    pub async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        let value = orientation.as_str().to_ascii_uppercase();
        self.post("/orientation", &json!({ "orientation": value }))
            .await?;
        Ok(())
    }

    pub async fn orientation(&self) -> Result<Orientation> {
        let json = self.get("/orientation").await?;
        let raw = json["value"]
            .as_str()
            .ok_or_else(|| RobotError::parse("Orientation response carries no value"))?;
        match raw.parse::<Orientation>() {
            Ok(o) => Ok(o),
            Err(_) if raw.to_ascii_uppercase().contains("LANDSCAPE") => Ok(Orientation::Landscape),
            Err(_) => Err(RobotError::parse(format!("Unexpected orientation: {}", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeDaemon, SESSION_ID, default_routes};
    use super::*;

    fn client(daemon: &FakeDaemon) -> WebDriverAgent {
        WebDriverAgent::new("127.0.0.1", daemon.port)
    }

    #[tokio::test]
    async fn test_is_running_requires_ready() {
        let ready = FakeDaemon::healthy().await;
        assert!(client(&ready).is_running().await);

        let booting = FakeDaemon::start(|_, _, _| (200, r#"{"value":{"ready":false}}"#.into())).await;
        assert!(!client(&booting).is_running().await);

        let broken = FakeDaemon::start(|_, _, _| (503, "{}".into())).await;
        assert!(!client(&broken).is_running().await);

        let garbage = FakeDaemon::start(|_, _, _| (200, "not json".into())).await;
        assert!(!client(&garbage).is_running().await);
    }

    #[tokio::test]
    async fn test_nothing_listening_is_not_running() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!WebDriverAgent::new("127.0.0.1", port).is_running().await);
    }

    #[tokio::test]
    async fn test_session_is_deleted_after_success() {
        let daemon = FakeDaemon::healthy().await;
        let size = client(&daemon).get_screen_size().await.unwrap();
        assert_eq!((size.width, size.height, size.scale), (390, 844, 3.0));

        let expected_delete = format!("DELETE /session/{}", SESSION_ID);
        assert_eq!(
            daemon.lines(),
            vec![
                "POST /session".to_string(),
                format!("GET /session/{}/wda/screen", SESSION_ID),
                expected_delete,
            ]
        );
        let create = &daemon.requests()[0];
        assert_eq!(create.json()["capabilities"]["alwaysMatch"]["platformName"], "iOS");
    }

    #[tokio::test]
    async fn test_session_is_deleted_after_callback_error() {
        let daemon = FakeDaemon::healthy().await;
        let result: Result<()> = client(&daemon)
            .within_session(|_| async { Err(RobotError::actionable("callback failed")) })
            .await;
        assert_eq!(result.unwrap_err().to_string(), "callback failed");
        let deletes = daemon
            .lines()
            .iter()
            .filter(|l| l.starts_with("DELETE /session/"))
            .count();
        assert_eq!(deletes, 1, "session must be deleted exactly once");
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_mask_result() {
        let daemon = FakeDaemon::start(|method, path, body| {
            if method == "DELETE" {
                (500, "{}".into())
            } else {
                default_routes(method, path, body)
            }
        })
        .await;
        let value = client(&daemon)
            .within_session(|_| async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_create_session_failure_is_actionable() {
        let daemon = FakeDaemon::start(|_, _, _| (500, "boom".into())).await;
        let err = client(&daemon).tap(1, 2).await.unwrap_err();
        assert!(err.is_actionable());
        assert!(err.to_string().contains("500 boom"), "got: {}", err);
        assert!(
            !daemon.lines().iter().any(|l| l.contains("/actions")),
            "no gesture without a session"
        );
    }

    #[tokio::test]
    async fn test_tap_posts_then_clears_actions() {
        let daemon = FakeDaemon::healthy().await;
        client(&daemon).tap(10, 20).await.unwrap();
        let lines = daemon.lines();
        let actions = format!("/session/{}/actions", SESSION_ID);
        assert_eq!(lines[1], format!("POST {}", actions));
        assert_eq!(lines[2], format!("DELETE {}", actions));
        assert_eq!(lines[3], format!("DELETE /session/{}", SESSION_ID));
        let script = daemon.requests()[1].json();
        assert_eq!(script["actions"][0]["actions"][0]["x"], 10);
    }

    #[tokio::test]
    async fn test_rejected_actions_are_actionable() {
        let daemon = FakeDaemon::start(|method, path, body| {
            if method == "POST" && path.ends_with("/actions") {
                (400, "invalid argument".into())
            } else {
                default_routes(method, path, body)
            }
        })
        .await;
        let err = client(&daemon).swipe(SwipeDirection::Up).await.unwrap_err();
        assert!(err.is_actionable());
        assert!(err.to_string().starts_with("WebDriver actions request failed: 400"));
        assert!(daemon.lines().last().unwrap().starts_with("DELETE /session/"));
    }

    #[tokio::test]
    async fn test_press_button_mapping() {
        let daemon = FakeDaemon::healthy().await;
        let wda = client(&daemon);
        wda.press_button(Button::VolumeUp).await.unwrap();
        let press = daemon
            .requests()
            .into_iter()
            .find(|r| r.path.ends_with("/wda/pressButton"))
            .unwrap();
        assert_eq!(press.json()["name"], "volumeup");

        wda.press_button(Button::Enter).await.unwrap();
        let keys = daemon
            .requests()
            .into_iter()
            .find(|r| r.path.ends_with("/wda/keys"))
            .unwrap();
        assert_eq!(keys.json()["value"][0], "\n");

        let before = daemon.requests().len();
        let err = wda.press_button(Button::Back).await.unwrap_err();
        assert!(err.is_actionable());
        assert_eq!(daemon.requests().len(), before, "unsupported button opens no session");
    }

    #[tokio::test]
    async fn test_orientation() {
        let daemon = FakeDaemon::healthy().await;
        let wda = client(&daemon);
        assert_eq!(wda.get_orientation().await.unwrap(), Orientation::Landscape);
        wda.set_orientation(Orientation::Portrait).await.unwrap();
        let set = daemon
            .requests()
            .into_iter()
            .find(|r| r.method == "POST" && r.path.ends_with("/orientation"))
            .unwrap();
        assert_eq!(set.json()["orientation"], "PORTRAIT");
    }

    #[tokio::test]
    async fn test_screenshot_is_base64_decoded() {
        let daemon = FakeDaemon::healthy().await;
        let png = client(&daemon).get_screenshot().await.unwrap();
        assert_eq!(png, vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
        assert_eq!(daemon.lines(), vec!["GET /screenshot"], "screenshot needs no session");
    }

    #[tokio::test]
    async fn test_elements_from_source() {
        let daemon = FakeDaemon::start(|_, path, _| {
            assert!(path.starts_with("/source"));
            (
                200,
                r#"{"value":{"type":"Application","rect":{"x":0,"y":0,"width":390,"height":844},"children":[{"type":"Button","label":"OK","isVisible":"1","rect":{"x":10,"y":10,"width":80,"height":44}}]}}"#.into(),
            )
        })
        .await;
        let elements = client(&daemon).get_elements_on_screen().await.unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].label.as_deref(), Some("OK"));
    }

    #[tokio::test]
    async fn test_swipe_from_coordinate_default_distance() {
        let daemon = FakeDaemon::healthy().await;
        client(&daemon)
            .swipe_from_coordinate(100, 600, SwipeDirection::Up, None)
            .await
            .unwrap();
        let script = daemon.requests()[1].json();
        let end = &script["actions"][0]["actions"][2];
        assert_eq!((end["x"].as_i64(), end["y"].as_i64()), (Some(100), Some(200)));
    }
}
