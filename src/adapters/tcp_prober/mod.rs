use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::ports::ReachabilityPort;

/// Transport-level liveness check: a node is up if it accepts a TCP connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReachabilityPort for TcpProber {
    async fn probe(&self, host: &str, port: u16, deadline: Duration) -> bool {
        match timeout(deadline, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                log::debug!("Connected to {}:{}", host, port);
                true
            }
            Ok(Err(e)) => {
                log::debug!("Failed to connect to {}:{}: {}", host, port, e);
                false
            }
            Err(_) => {
                log::debug!("Timeout connecting to {}:{}", host, port);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(TcpProber::new().probe("127.0.0.1", port, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(!TcpProber::new().probe("127.0.0.1", port, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_connect_past_deadline_is_unreachable() {
        // Non-routable address: the SYN is never answered.
        let started = std::time::Instant::now();
        let reachable = TcpProber::new()
            .probe("10.255.255.1", 443, Duration::from_millis(50))
            .await;

        assert!(!reachable);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_unreachable() {
        assert!(
            !TcpProber::new()
                .probe("node.does-not-exist.invalid", 443, Duration::from_secs(2))
                .await
        );
    }
}
