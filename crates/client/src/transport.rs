//! Message transport abstraction
//!
//! A [`Transport`] carries whole text frames in order, in both directions, over
//! one logical connection. A [`Connector`] opens transports from an address.
//!
//! Two implementations ship with the crate:
//!
//! - [`crate::ws::WsConnector`] / [`crate::ws::WsTransport`]: WebSocket over TCP
//! - [`MemoryConnector`] / [`MemoryTransport`]: an in-process pair whose far end
//!   ([`CoordinatorEnd`]) is scripted by tests

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{ConnectError, TransportError};
use crate::protocol::{ClientEnvelope, ServerEnvelope};

/// Ordered, message-framed, bidirectional channel.
///
/// `recv` must be cancel-safe: the dispatch loop races it against outbound
/// commands and shutdown.
pub trait Transport: Send + 'static {
    /// Transmit one text frame.
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait for the next text frame.
    ///
    /// Connection loss is reported as an error, never as silent end of stream.
    fn recv(&mut self) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Best-effort graceful shutdown. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens a [`Transport`] to a coordinator address.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    fn open(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Transport, ConnectError>> + Send;
}

/// Frame pushed by the scripted coordinator side of a memory pair.
#[derive(Debug, Clone)]
enum PeerFrame {
    Text(String),
    Close { code: Option<u16>, reason: String },
}

/// Client half of an in-process connection.
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<PeerFrame>,
    closed: bool,
    close_calls: Arc<AtomicUsize>,
}

/// Coordinator half of an in-process connection.
pub struct CoordinatorEnd {
    tx: Option<mpsc::UnboundedSender<PeerFrame>>,
    rx: mpsc::UnboundedReceiver<String>,
    close_calls: Arc<AtomicUsize>,
}

/// Create a connected in-process pair.
pub fn memory_pair() -> (MemoryTransport, CoordinatorEnd) {
    let (client_tx, coordinator_rx) = mpsc::unbounded_channel();
    let (coordinator_tx, client_rx) = mpsc::unbounded_channel();
    let close_calls = Arc::new(AtomicUsize::new(0));

    let transport = MemoryTransport {
        tx: client_tx,
        rx: client_rx,
        closed: false,
        close_calls: Arc::clone(&close_calls),
    };
    let coordinator = CoordinatorEnd {
        tx: Some(coordinator_tx),
        rx: coordinator_rx,
        close_calls,
    };
    (transport, coordinator)
}

impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ClosedLocally);
        }
        self.tx.send(text).map_err(|_| TransportError::Write {
            detail: "coordinator end dropped".to_string(),
        })
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        if self.closed {
            return Err(TransportError::ClosedLocally);
        }
        match self.rx.recv().await {
            Some(PeerFrame::Text(text)) => Ok(text),
            Some(PeerFrame::Close { code, reason }) => {
                Err(TransportError::ClosedCleanly { code, reason })
            }
            None => Err(TransportError::ClosedAbnormally {
                detail: "coordinator end dropped without closing".to_string(),
            }),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rx.close();
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl CoordinatorEnd {
    /// Push a typed envelope to the client.
    pub fn send(&self, envelope: &ServerEnvelope) {
        if let Ok(text) = serde_json::to_string(envelope) {
            self.send_raw(text);
        }
    }

    /// Push an arbitrary text frame to the client.
    pub fn send_raw(&self, text: impl Into<String>) {
        if let Some(tx) = self.tx.as_ref() {
            let _ = tx.send(PeerFrame::Text(text.into()));
        }
    }

    /// Complete a close handshake from the coordinator side.
    pub fn close_cleanly(&mut self, code: u16, reason: &str) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(PeerFrame::Close {
                code: Some(code),
                reason: reason.to_string(),
            });
        }
    }

    /// Drop the link without a close handshake.
    pub fn drop_link(&mut self) {
        self.tx = None;
    }

    /// Next envelope the client sent, or `None` once the client side is gone.
    pub async fn recv(&mut self) -> Option<ClientEnvelope> {
        loop {
            let text = self.rx.recv().await?;
            match serde_json::from_str(&text) {
                Ok(envelope) => return Some(envelope),
                Err(_) => continue,
            }
        }
    }

    /// Envelope already sent by the client, without waiting.
    pub fn try_recv(&mut self) -> Option<ClientEnvelope> {
        let text = self.rx.try_recv().ok()?;
        serde_json::from_str(&text).ok()
    }

    /// How many times the client half actually shut down.
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

/// Hands out one pre-built [`MemoryTransport`]; later opens are refused.
pub struct MemoryConnector {
    slot: Mutex<Option<MemoryTransport>>,
}

impl MemoryConnector {
    pub fn new(transport: MemoryTransport) -> Self {
        Self {
            slot: Mutex::new(Some(transport)),
        }
    }

    /// A connector whose every open is refused.
    pub fn refusing() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn open(&self, address: &str) -> Result<MemoryTransport, ConnectError> {
        let taken = self.slot.lock().ok().and_then(|mut slot| slot.take());
        taken.ok_or_else(|| ConnectError::Refused {
            address: address.to_string(),
            detail: "no in-memory coordinator available".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{create_ready, StartSignal};

    #[tokio::test]
    async fn memory_pair_carries_frames_in_order() {
        let (mut transport, mut coordinator) = memory_pair();

        coordinator.send(&ServerEnvelope::Start(StartSignal::default()));
        coordinator.send_raw("second");
        assert!(transport.recv().await.unwrap().contains("\"start\""));
        assert_eq!(transport.recv().await.unwrap(), "second");

        let text = serde_json::to_string(&create_ready()).unwrap();
        transport.send(text).await.unwrap();
        assert_eq!(coordinator.recv().await, Some(create_ready()));
    }

    #[tokio::test]
    async fn memory_pair_reports_clean_and_abnormal_close() {
        let (mut transport, mut coordinator) = memory_pair();
        coordinator.close_cleanly(1000, "bye");
        assert_eq!(
            transport.recv().await,
            Err(TransportError::ClosedCleanly {
                code: Some(1000),
                reason: "bye".to_string()
            })
        );

        let (mut transport, mut coordinator) = memory_pair();
        coordinator.drop_link();
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::ClosedAbnormally { .. })
        ));
    }

    #[tokio::test]
    async fn memory_close_is_idempotent() {
        let (mut transport, coordinator) = memory_pair();
        transport.close().await;
        transport.close().await;
        assert_eq!(coordinator.close_count(), 1);
        assert_eq!(
            transport.send("x".to_string()).await,
            Err(TransportError::ClosedLocally)
        );
    }

    #[tokio::test]
    async fn memory_connector_hands_out_once() {
        let (transport, _coordinator) = memory_pair();
        let connector = MemoryConnector::new(transport);
        assert!(connector.open("mem://a").await.is_ok());
        assert!(matches!(
            connector.open("mem://a").await,
            Err(ConnectError::Refused { .. })
        ));
    }
}
