#![cfg(test)]
#![allow(dead_code)]

use base64::Engine;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub fn vmess_link(json: &str) -> String {
    format!("vmess://{}", base64::prelude::BASE64_STANDARD.encode(json))
}

pub fn subscription_blob(lines: &[String]) -> String {
    base64::prelude::BASE64_STANDARD.encode(lines.join("\n"))
}

/// Minimal HTTP/1.1 server answering every request with a fixed status and body.
pub struct SubscriptionServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    _handle: JoinHandle<()>,
}

impl SubscriptionServer {
    pub async fn start(status: u16, body: String) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let body = Arc::new(body);
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(Self::handle_connection(socket, status, body.clone()));
            }
        });

        Ok(Self {
            addr,
            hits,
            _handle: handle,
        })
    }

    async fn handle_connection(mut socket: TcpStream, status: u16, body: Arc<String>) {
        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        loop {
            match socket.read(&mut buffer).await {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    request.extend_from_slice(&buffer[..n]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
            }
        }

        let reason = if status == 200 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    }

    pub fn url(&self) -> String {
        format!("http://{}/v2ray.txt", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
