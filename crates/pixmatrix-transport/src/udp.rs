use std::net::SocketAddr;

use async_trait::async_trait;
use pixmatrix_types::{config::TransportConfig, wire::WireFrame, Result};
use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::{transport_error, MetricsCell, Transport, TransportMetrics};

/// Sends each wire frame as one UDP datagram to a fixed receiver.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    metrics: MetricsCell,
}

impl UdpTransport {
    pub async fn bind(bind_addr: &str, target: &str) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|err| transport_error(format!("failed to bind {bind_addr}: {err}")))?;
        let target = tokio::net::lookup_host(target)
            .await
            .map_err(|err| transport_error(format!("failed to resolve {target}: {err}")))?
            .next()
            .ok_or_else(|| transport_error(format!("no address found for {target}")))?;
        info!(
            "UDP transport bound to {:?}, sending to {}",
            socket.local_addr().ok(),
            target
        );
        Ok(Self {
            socket,
            target,
            metrics: MetricsCell::default(),
        })
    }

    pub async fn from_config(config: &TransportConfig) -> Result<Self> {
        let target = config
            .target_addr
            .as_deref()
            .ok_or_else(|| transport_error("transport.target_addr is not set"))?;
        Self::bind(&config.bind_addr, target).await
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, frame: WireFrame) -> Result<()> {
        match self.socket.send_to(frame.as_bytes(), self.target).await {
            Ok(sent) => {
                self.metrics.record_success(sent);
                Ok(())
            }
            Err(err) => {
                self.metrics.record_failure();
                warn!("UDP send to {} failed: {err}", self.target);
                Err(transport_error(format!(
                    "failed to send {} bytes to {}: {err}",
                    frame.len(),
                    self.target
                )))
            }
        }
    }

    fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn datagram_carries_wire_frame() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.expect("bind receiver");
        let target = receiver.local_addr().expect("receiver addr").to_string();

        let transport = UdpTransport::bind("127.0.0.1:0", &target)
            .await
            .expect("bind transport");
        transport
            .send(WireFrame::from_bytes(vec![255, 0, 0, 0, 255, 0]))
            .await
            .expect("send");

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).await.expect("recv");
        assert_eq!(&buf[..len], &[255, 0, 0, 0, 255, 0]);
        assert_eq!(transport.metrics().frames_sent, 1);
        assert_eq!(transport.metrics().bytes_sent, 6);
    }

    #[tokio::test]
    async fn config_without_target_is_rejected() {
        let config = TransportConfig::default();
        assert!(UdpTransport::from_config(&config).await.is_err());
    }
}
