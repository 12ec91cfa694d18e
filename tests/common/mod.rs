//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header, StatusCode},
    response::IntoResponse,
    Router,
};
use discovery_sidecar::config::SidecarConfig;
use discovery_sidecar::directory::DirectoryClient;
use discovery_sidecar::health::LivenessProbe;
use discovery_sidecar::ProxyServer;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Start a backend that echoes what it received as `name|host|path|xff|connection`.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(move |request: Request| async move {
        let header_str = |name: header::HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        let body = format!(
            "{}|{}|{}|{}|{}",
            name,
            header_str(header::HOST),
            request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/"),
            header_str(header::HeaderName::from_static("x-forwarded-for")),
            header_str(header::CONNECTION),
        );
        (StatusCode::OK, [("x-backend", name)], body).into_response()
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start a raw HTTP/1.1 backend that keeps every connection open and counts
/// how many connections it has accepted.
pub async fn start_keep_alive_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepts);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_keep_alive(socket));
        }
    });
    (addr, accepts)
}

/// Answer bodiless requests on one connection until the peer closes it.
async fn serve_keep_alive(socket: TcpStream) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    let mut line = String::new();

    loop {
        // Consume one request head.
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return,
                Ok(_) if line == "\r\n" => break,
                Ok(_) => {}
            }
        }
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: keep-alive\r\n\r\nok";
        if write.write_all(response).await.is_err() {
            return;
        }
    }
}

/// A loopback port with nothing listening on it.
pub fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start the proxy in front of `directory` on an ephemeral port.
pub async fn start_proxy(directory: Arc<dyn DirectoryClient>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ProxyServer::new(&SidecarConfig::default(), directory);

    tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });
    addr
}

/// HTTP client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Liveness probe driven by the test.
#[derive(Default)]
pub struct ScriptedProbe {
    alive: AtomicBool,
    samples: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(alive: bool) -> Arc<Self> {
        let probe = Self::default();
        probe.alive.store(alive, Ordering::SeqCst);
        Arc::new(probe)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LivenessProbe for ScriptedProbe {
    async fn is_alive(&self) -> bool {
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.alive.load(Ordering::SeqCst)
    }
}
