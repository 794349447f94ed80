//! Shared fixtures: an in-memory insights source and a raw-TCP fake backend.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use campaignpulse::api::InsightsSnapshot;
use campaignpulse::error::{ApiError, StreamError};
use campaignpulse::insights::{ChannelGuard, ErrorFn, InsightsSource, SubscriptionHandle, UpdateFn};

pub fn snapshot(entity_id: &str, impressions: u64, clicks: u64) -> InsightsSnapshot {
    InsightsSnapshot {
        entity_id: entity_id.to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap(),
        impressions,
        clicks,
        conversions: clicks / 2,
        spend: clicks as f64 * 1.5,
        ctr: if impressions > 0 { clicks as f64 * 100.0 / impressions as f64 } else { 0.0 },
        cpc: 1.5,
        conversion_rate: 50.0,
    }
}

pub fn snapshot_json(entity_id: &str, impressions: u64, clicks: u64) -> String {
    serde_json::json!({
        "campaign_id": entity_id,
        "timestamp": "2025-01-15T10:30:00.000Z",
        "impressions": impressions,
        "clicks": clicks,
        "conversions": clicks / 2,
        "spend": clicks as f64 * 1.5,
        "ctr": 2.0,
        "cpc": 1.5,
        "conversion_rate": 50.0
    })
    .to_string()
}

// =============================================================================
// In-memory insights source
// =============================================================================

type FetchResult = Result<InsightsSnapshot, ApiError>;

/// One pending fetch. Whichever side shows up first creates the slot.
struct FetchSlot {
    tx: Option<oneshot::Sender<FetchResult>>,
    rx: Option<oneshot::Receiver<FetchResult>>,
}

impl FetchSlot {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self { tx: Some(tx), rx: Some(rx) }
    }
}

struct FakeSub {
    entity_id: String,
    guard: ChannelGuard,
    on_update: UpdateFn,
    on_error: Option<ErrorFn>,
}

#[derive(Default)]
pub struct FakeSource {
    fetches: Mutex<HashMap<String, FetchSlot>>,
    subs: Mutex<Vec<FakeSub>>,
    opened: AtomicU32,
    released: Arc<AtomicU32>,
    max_active: AtomicU32,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_slot<R>(&self, entity_id: &str, f: impl FnOnce(&mut FetchSlot) -> R) -> R {
        let mut fetches = self.fetches.lock().unwrap();
        let slot = fetches.entry(entity_id.to_string()).or_insert_with(FetchSlot::new);
        let out = f(slot);
        if slot.tx.is_none() && slot.rx.is_none() {
            fetches.remove(entity_id);
        }
        out
    }

    pub fn resolve_fetch(&self, entity_id: &str, result: FetchResult) {
        if let Some(tx) = self.with_slot(entity_id, |slot| slot.tx.take()) {
            let _ = tx.send(result);
        }
    }

    /// Delivers a snapshot on the newest open subscription for `entity_id`.
    pub fn push(&self, entity_id: &str, snap: InsightsSnapshot) -> bool {
        let mut subs = self.subs.lock().unwrap();
        match subs.iter_mut().rev().find(|s| s.entity_id == entity_id) {
            Some(sub) if sub.guard.is_open() => {
                (sub.on_update)(snap);
                true
            }
            _ => false,
        }
    }

    /// Delivers a raw message body, dropping it the way the HTTP client does when it does not parse.
    pub fn push_raw(&self, entity_id: &str, body: &str) -> bool {
        match serde_json::from_str::<InsightsSnapshot>(body) {
            Ok(snap) => self.push(entity_id, snap),
            Err(_) => false,
        }
    }

    /// Simulates a transport failure on the newest subscription for `entity_id`.
    pub fn fail(&self, entity_id: &str, reason: &str) -> bool {
        let mut subs = self.subs.lock().unwrap();
        let Some(sub) = subs.iter_mut().rev().find(|s| s.entity_id == entity_id) else {
            return false;
        };
        if !sub.guard.close() {
            return false;
        }
        match sub.on_error.take() {
            Some(on_error) => {
                on_error(StreamError::new(entity_id, reason));
                true
            }
            None => false,
        }
    }

    pub fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u32 {
        self.released.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> u32 {
        self.subs.lock().unwrap().iter().filter(|s| s.guard.is_open()).count() as u32
    }

    /// Highest number of simultaneously open subscriptions ever observed at subscribe time.
    pub fn max_active(&self) -> u32 {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightsSource for FakeSource {
    async fn fetch_snapshot(&self, entity_id: &str) -> FetchResult {
        let rx = self.with_slot(entity_id, |slot| slot.rx.take());
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::network(entity_id, "fetch abandoned"))),
            None => Err(ApiError::network(entity_id, "duplicate fetch")),
        }
    }

    fn subscribe(&self, entity_id: &str, on_update: UpdateFn, on_error: ErrorFn) -> SubscriptionHandle {
        let guard = ChannelGuard::new();
        let mut subs = self.subs.lock().unwrap();
        subs.push(FakeSub {
            entity_id: entity_id.to_string(),
            guard: guard.clone(),
            on_update,
            on_error: Some(on_error),
        });
        self.opened.fetch_add(1, Ordering::SeqCst);
        let active = subs.iter().filter(|s| s.guard.is_open()).count() as u32;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let released = Arc::clone(&self.released);
        SubscriptionHandle::new(entity_id, guard).on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

// =============================================================================
// Fake HTTP backend
// =============================================================================

pub enum StreamStep {
    Chunk(Vec<u8>),
    Close,
}

pub enum Reply {
    Json(u16, String),
    /// Headers go out immediately; body chunks follow as the test sends them.
    Stream(mpsc::UnboundedReceiver<StreamStep>),
    /// Non-2xx on the stream endpoint.
    Status(u16),
}

#[derive(Clone)]
pub struct FakeServer {
    pub base: String,
    routes: Arc<Mutex<HashMap<String, Reply>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Self {
            base: format!("http://{}", addr),
            routes: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(Mutex::new(Vec::new())),
        };
        let routes = Arc::clone(&server.routes);
        let hits = Arc::clone(&server.hits);
        tokio::spawn(async move {
            loop {
                let (sock, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let routes = Arc::clone(&routes);
                let hits = Arc::clone(&hits);
                tokio::spawn(async move {
                    let _ = serve(sock, routes, hits).await;
                });
            }
        });
        server
    }

    pub fn json(&self, path: &str, status: u16, body: impl Into<String>) {
        self.routes.lock().unwrap().insert(path.to_string(), Reply::Json(status, body.into()));
    }

    pub fn status(&self, path: &str, status: u16) {
        self.routes.lock().unwrap().insert(path.to_string(), Reply::Status(status));
    }

    /// Registers a one-shot stream on `path` and returns the sender that feeds it.
    pub fn stream(&self, path: &str) -> mpsc::UnboundedSender<StreamStep> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.lock().unwrap().insert(path.to_string(), Reply::Stream(rx));
        tx
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

async fn read_request_path(sock: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next().unwrap_or("");
    Ok(request_line.split_whitespace().nth(1).unwrap_or("/").to_string())
}

async fn serve(
    mut sock: TcpStream,
    routes: Arc<Mutex<HashMap<String, Reply>>>,
    hits: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let path = read_request_path(&mut sock).await?;
    hits.lock().unwrap().push(path.clone());

    let reply = {
        let mut routes = routes.lock().unwrap();
        if matches!(routes.get(&path), Some(Reply::Stream(_))) {
            routes.remove(&path)
        } else {
            match routes.get(&path) {
                Some(Reply::Json(status, body)) => Some(Reply::Json(*status, body.clone())),
                Some(Reply::Status(status)) => Some(Reply::Status(*status)),
                _ => None,
            }
        }
    };

    match reply {
        None => write_simple(&mut sock, 404, "text/plain", "Not Found").await,
        Some(Reply::Json(status, body)) => write_simple(&mut sock, status, "application/json", &body).await,
        Some(Reply::Status(status)) => write_simple(&mut sock, status, "text/plain", "unavailable").await,
        Some(Reply::Stream(mut rx)) => {
            sock.write_all(
                b"HTTP/1.1 200 OK\r\n\
                  Content-Type: text/event-stream\r\n\
                  Cache-Control: no-cache\r\n\
                  Connection: close\r\n\r\n",
            )
            .await?;
            sock.flush().await?;
            while let Some(step) = rx.recv().await {
                match step {
                    StreamStep::Chunk(bytes) => {
                        sock.write_all(&bytes).await?;
                        sock.flush().await?;
                    }
                    StreamStep::Close => break,
                }
            }
            sock.shutdown().await
        }
    }
}

async fn write_simple(sock: &mut TcpStream, status: u16, content_type: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        status,
        reason(status),
        content_type,
        body.len(),
        body
    );
    sock.write_all(response.as_bytes()).await?;
    sock.shutdown().await
}
