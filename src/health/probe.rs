//! Local application liveness probe.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;

/// Answers whether the local application is currently accepting connections.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_alive(&self) -> bool;
}

/// Probes a loopback TCP port with a bounded connect timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            timeout,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl LivenessProbe for TcpProbe {
    async fn is_alive(&self) -> bool {
        match time::timeout(self.timeout, TcpStream::connect(self.addr)).await {
            // Dropping the stream closes the connection immediately.
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::trace!(addr = %self.addr, error = %e, "Liveness probe refused");
                false
            }
            Err(_) => {
                tracing::trace!(addr = %self.addr, "Liveness probe timed out");
                false
            }
        }
    }
}
