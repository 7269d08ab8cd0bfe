#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Local, TimeDelta};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use zhima_proxy_pool::{Proxy, ProviderError, ProxyProvider};

/// Serve `status` + `body` to every connection. Returns the address and the
/// request lines received so far.
pub async fn spawn_http_server(status: &'static str, body: String) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let log = Arc::clone(&log);
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                if let Some(line) = request.lines().next() {
                    log.lock().push(line.to_string());
                }
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (addr, seen)
}

/// An address nobody listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn local_proxy(addr: SocketAddr) -> Proxy {
    Proxy::new(addr.ip().to_string(), addr.port(), Local::now() + TimeDelta::minutes(30))
}

/// Provider replaying scripted batches, then repeating `fallback`.
pub struct FixedProvider {
    script: Mutex<VecDeque<Vec<Proxy>>>,
    fallback: Vec<Proxy>,
}

impl FixedProvider {
    pub fn new(script: Vec<Vec<Proxy>>, fallback: Vec<Proxy>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
        }
    }
}

#[async_trait]
impl ProxyProvider for FixedProvider {
    async fn fetch(&self, _api: &Url) -> Result<Vec<Proxy>, ProviderError> {
        let scripted = self.script.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.fallback.clone()))
    }
}
