//! Transport facade for pushing wire frames to LED receivers.

mod udp;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use pixmatrix_types::{wire::WireFrame, PixmatrixError, Result};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

pub use udp::UdpTransport;

/// Aggregated transport counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportMetrics {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub failures: u64,
}

/// Fire-and-forget sink for wire frames. Connection management, retries and
/// delivery confirmation are the implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, frame: WireFrame) -> Result<()>;
    fn metrics(&self) -> TransportMetrics;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, frame: WireFrame) -> Result<()> {
        (**self).send(frame).await
    }

    fn metrics(&self) -> TransportMetrics {
        (**self).metrics()
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, frame: WireFrame) -> Result<()> {
        (**self).send(frame).await
    }

    fn metrics(&self) -> TransportMetrics {
        (**self).metrics()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MetricsCell(Arc<Mutex<TransportMetrics>>);

impl MetricsCell {
    pub(crate) fn record_success(&self, bytes: usize) {
        if let Ok(mut guard) = self.0.lock() {
            guard.frames_sent += 1;
            guard.bytes_sent += bytes as u64;
        }
    }

    pub(crate) fn record_failure(&self) {
        if let Ok(mut guard) = self.0.lock() {
            guard.failures += 1;
        }
    }

    pub(crate) fn snapshot(&self) -> TransportMetrics {
        self.0.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// In-process transport backed by a broadcast channel.
#[derive(Clone)]
pub struct LocalTransport {
    tx: broadcast::Sender<WireFrame>,
    metrics: MetricsCell,
}

impl LocalTransport {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        info!("Local transport ready (capacity {})", capacity.max(1));
        Self {
            tx,
            metrics: MetricsCell::default(),
        }
    }

    /// Stream of every frame sent after the call. Lagging subscribers skip
    /// the frames they missed.
    pub fn subscribe(&self) -> BoxStream<'static, WireFrame> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|frame| async move { frame.ok() })
            .boxed()
    }

    pub fn receiver(&self) -> broadcast::Receiver<WireFrame> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, frame: WireFrame) -> Result<()> {
        let bytes = frame.len();
        // No subscribers is not an error for a fire-and-forget sink.
        let receivers = self.tx.send(frame).unwrap_or(0);
        self.metrics.record_success(bytes);
        debug!(bytes, receivers, "local transport fan-out");
        Ok(())
    }

    fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }
}

/// Generate an error aligned with transport semantics.
pub fn transport_error(message: impl Into<String>) -> PixmatrixError {
    PixmatrixError::Transport(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fan_out_reaches_subscribers() {
        let transport = LocalTransport::new(8);
        let mut first = transport.subscribe();
        let mut second = transport.receiver();

        transport
            .send(WireFrame::from_bytes(vec![1, 2, 3]))
            .await
            .expect("send");

        assert_eq!(
            first.next().await.map(WireFrame::into_bytes),
            Some(vec![1, 2, 3])
        );
        assert_eq!(second.recv().await.expect("recv").as_bytes(), &[1, 2, 3]);

        let metrics = transport.metrics();
        assert_eq!(metrics.frames_sent, 1);
        assert_eq!(metrics.bytes_sent, 3);
    }

    #[tokio::test]
    async fn send_without_subscribers_succeeds() {
        let transport = LocalTransport::new(1);
        transport
            .send(WireFrame::from_bytes(vec![0; 768]))
            .await
            .expect("send");
        assert_eq!(transport.metrics().bytes_sent, 768);
    }

    #[tokio::test]
    async fn shared_handles_delegate() {
        let transport = Arc::new(LocalTransport::new(4));
        let boxed: Box<dyn Transport> = Box::new(Arc::clone(&transport));
        boxed
            .send(WireFrame::from_bytes(vec![9, 9, 9]))
            .await
            .expect("send");
        assert_eq!(transport.metrics().frames_sent, 1);
        assert_eq!(boxed.metrics().frames_sent, 1);
    }
}
