//! Recording stand-ins for the remote protocols, plus a one-shot loopback
//! HTTP server for exercising the real adapters.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::error::{Result, SyncError};
use crate::integrations::{LegacyResponse, RestTransport, SyncPayload, SyncProtocol};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

type Responder = Box<dyn Fn(&str, &str, Option<&Value>) -> Result<Value> + Send + Sync>;

pub struct MockRest {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Responder,
}

impl MockRest {
    pub fn new(
        responder: impl Fn(&str, &str, Option<&Value>) -> Result<Value> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Every request fails at the transport level.
    pub fn offline() -> Arc<Self> {
        Self::new(|_, path, _| Err(SyncError::Transport(format!("{} unreachable", path))))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, method: &str, path_prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path.starts_with(path_prefix))
            .count()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<&Value>) -> Result<Value> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        (self.responder)(method, path, body)
    }
}

#[async_trait]
impl RestTransport for MockRest {
    async fn get(&self, path: &str) -> Result<Value> {
        self.record("GET", path, None)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.record("POST", path, Some(body))
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.record("DELETE", path, None)
    }
}

type LegacyResponder = Box<dyn Fn(&SyncPayload) -> Result<LegacyResponse> + Send + Sync>;

pub struct MockLegacy {
    sent: Mutex<Vec<(SyncPayload, String)>>,
    responder: LegacyResponder,
}

impl MockLegacy {
    pub fn new(
        responder: impl Fn(&SyncPayload) -> Result<LegacyResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(|_| {
            Ok(LegacyResponse {
                result_code: Some(Value::from(1)),
                result_message: Some("Contact added".to_string()),
            })
        })
    }

    pub fn sent(&self) -> Vec<(SyncPayload, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl SyncProtocol for MockLegacy {
    async fn send(&self, payload: &SyncPayload, action: &str) -> Result<LegacyResponse> {
        self.sent.lock().push((payload.clone(), action.to_string()));
        (self.responder)(payload)
    }

    fn name(&self) -> &'static str {
        "mock-legacy"
    }
}

/// Raw request as it arrived on the socket. Header names are lowercased.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Accept one connection on 127.0.0.1, answer it with `status` and `body`,
/// and hand back the request that was read. Returns the base URL to point
/// credentials at.
pub async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let reply = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(request);
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers were complete");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let body_start = head_end + 4;
    while buf.len() < body_start + length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        request_line,
        headers,
        body: String::from_utf8_lossy(&buf[body_start..]).into_owned(),
    }
}

/// Client that never routes loopback traffic through an environment proxy.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
