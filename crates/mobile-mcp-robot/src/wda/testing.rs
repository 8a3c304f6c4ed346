//! Local fake automation daemon for tests
//!
//! A minimal HTTP/1.1 responder on `127.0.0.1:0`. Every request is recorded and
//! answered by a closure; connections are closed after each response so the
//! client never reuses a socket.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

type Handler = dyn Fn(&str, &str, &str) -> (u16, String) + Send + Sync;

pub(crate) struct FakeDaemon {
    pub port: u16,
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: JoinHandle<()>,
}

impl FakeDaemon {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &str, &str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    let _ = serve_one(stream, recorded, handler).await;
                });
            }
        });

        Self {
            port,
            requests,
            task,
        }
    }

    /// A daemon implementing the endpoints the client needs, all succeeding
    pub async fn healthy() -> Self {
        Self::start(default_routes).await
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.requests().iter().map(Recorded::line).collect()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) const SESSION_ID: &str = "sess-1";

/// Canned answers for a ready daemon with one session
pub(crate) fn default_routes(method: &str, path: &str, _body: &str) -> (u16, String) {
    let ok = |v: &str| (200, format!(r#"{{"value":{}}}"#, v));
    match (method, path) {
        ("GET", "/status") => ok(r#"{"ready":true}"#),
        ("POST", "/session") => ok(&format!(r#"{{"sessionId":"{}"}}"#, SESSION_ID)),
        ("DELETE", p) if p == format!("/session/{}", SESSION_ID) => ok("null"),
        ("GET", p) if p.ends_with("/wda/screen") => {
            ok(r#"{"screenSize":{"width":390,"height":844},"scale":3}"#)
        }
        ("GET", p) if p.ends_with("/orientation") => ok(r#""LANDSCAPE""#),
        ("GET", "/screenshot") => ok(r#""iVBORw0KGgo=""#),
        _ => ok("null"),
    }
}

async fn serve_one(
    mut stream: TcpStream,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    handler: Arc<Handler>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).into_owned();

    let (status, response) = handler(&method, &path, &body);
    recorded.lock().unwrap().push(Recorded { method, path, body });

    let reply = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        response.len(),
        response
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}
