//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use resource_lister::config::{ListerConfig, ServiceConfig};
use resource_lister::{HttpServer, Shutdown};

pub const TOKEN: &str = "test-service-account-token";
pub const ROUTE: &str = "/api/things";

/// What the mock upstream answers with.
#[derive(Clone)]
pub struct MockReply {
    pub status: u16,
    pub reason: Option<&'static str>,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl MockReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: None,
            content_type: None,
            body: body.into(),
        }
    }

    /// Send this reason phrase instead of the canonical one.
    #[allow(dead_code)]
    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            reason: None,
            content_type: Some("application/json"),
            body: body.as_bytes().to_vec(),
        }
    }
}

/// Handle to a running mock upstream.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    heads: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request heads received so far, lowercased.
    pub fn heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }
}

/// Start a programmable mock upstream on an ephemeral port.
pub async fn start_upstream<F>(reply: F) -> MockUpstream
where
    F: Fn() -> MockReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let heads = Arc::new(Mutex::new(Vec::new()));
    let reply = Arc::new(reply);

    let (h, r) = (hits.clone(), heads.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let (hits, heads, reply) = (h.clone(), r.clone(), reply.clone());
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                hits.fetch_add(1, Ordering::SeqCst);
                heads
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).to_lowercase());

                let MockReply { status, reason, content_type, body } = reply();
                let reason = reason
                    .or_else(|| StatusCode::from_u16(status).ok()?.canonical_reason())
                    .unwrap_or("Unknown");
                let mut response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n",
                    body.len()
                );
                if let Some(ct) = content_type {
                    response.push_str(&format!("Content-Type: {ct}\r\n"));
                }
                response.push_str("\r\n");

                let _ = socket.write_all(response.as_bytes()).await;
                for piece in body.chunks(64 * 1024) {
                    if socket.write_all(piece).await.is_err() {
                        return;
                    }
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, hits, heads }
}

/// Start an upstream that accepts connections and reads requests but never answers.
#[allow(dead_code)]
pub async fn start_stalled_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut sink = [0u8; 1024];
                while let Ok(n) = socket.read(&mut sink).await {
                    if n == 0 {
                        return;
                    }
                }
            });
        }
    });

    addr
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start the lister service relaying `ROUTE` to `upstream_url`.
pub async fn start_lister(upstream_url: String) -> (SocketAddr, Shutdown) {
    start_lister_with(upstream_url, |_| {}).await
}

/// Like `start_lister`, letting the caller adjust the config first.
pub async fn start_lister_with<F>(upstream_url: String, configure: F) -> (SocketAddr, Shutdown)
where
    F: FnOnce(&mut ServiceConfig),
{
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.bearer_token = Some(TOKEN.into());
    config.timeouts.upstream_secs = 5;
    config.listers.push(ListerConfig {
        name: "things".into(),
        route: ROUTE.into(),
        url: upstream_url,
    });
    configure(&mut config);

    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
