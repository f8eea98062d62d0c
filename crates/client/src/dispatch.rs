//! Dispatch loop
//!
//! A background task owns the [`Transport`]. It multiplexes outbound frames
//! (each write acknowledged back to the caller) with inbound frames, decodes
//! inbound envelopes, skips protocol violations, and forwards everything else
//! in arrival order. A terminal transport failure is forwarded once and ends
//! the loop.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::TransportError;
use crate::protocol::{parse_envelope, ParseError, ServerEnvelope};
use crate::transport::Transport;

/// How long a graceful shutdown may take before the loop is aborted.
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) type Delivery = Result<ServerEnvelope, TransportError>;

struct SendCommand {
    text: String,
    done: oneshot::Sender<Result<(), TransportError>>,
}

pub(crate) struct Dispatcher {
    cmd_tx: mpsc::UnboundedSender<SendCommand>,
    inbound_rx: mpsc::UnboundedReceiver<Delivery>,
    shutdown: CancellationToken,
    closed_reason: Arc<OnceLock<TransportError>>,
    task: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub(crate) fn spawn<T: Transport>(transport: T) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let closed_reason = Arc::new(OnceLock::new());

        let task = tokio::spawn(dispatch_loop(
            transport,
            cmd_rx,
            inbound_tx,
            shutdown.clone(),
            Arc::clone(&closed_reason),
        ));

        Self {
            cmd_tx,
            inbound_rx,
            shutdown,
            closed_reason,
            task: Some(task),
        }
    }

    fn closed_error(&self) -> TransportError {
        self.closed_reason
            .get()
            .cloned()
            .unwrap_or(TransportError::ClosedLocally)
    }

    /// Write one frame and wait for the write to finish.
    pub(crate) async fn send(&self, text: String) -> Result<(), TransportError> {
        let (done, result) = oneshot::channel();
        if self.cmd_tx.send(SendCommand { text, done }).is_err() {
            return Err(self.closed_error());
        }
        match result.await {
            Ok(r) => r,
            Err(_) => Err(self.closed_error()),
        }
    }

    /// Next delivery; `None` once the loop has exited and everything was read.
    pub(crate) async fn recv(&mut self) -> Option<Delivery> {
        self.inbound_rx.recv().await
    }

    /// Next delivery if one is already waiting.
    pub(crate) fn try_recv(&mut self) -> Result<Delivery, mpsc::error::TryRecvError> {
        self.inbound_rx.try_recv()
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Close the transport and wait for the loop to exit.
    pub(crate) async fn shutdown(&mut self) {
        self.shutdown.cancel();
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => warn!("dispatch loop ended with join error: {join_err}"),
                Err(_) => {
                    warn!("dispatch loop did not exit within timeout; aborting");
                    task.abort();
                }
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // No executor to drive a graceful close from here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn dispatch_loop<T: Transport>(
    mut transport: T,
    mut cmd_rx: mpsc::UnboundedReceiver<SendCommand>,
    inbound_tx: mpsc::UnboundedSender<Delivery>,
    shutdown: CancellationToken,
    closed_reason: Arc<OnceLock<TransportError>>,
) {
    debug!("dispatch loop started");

    let finish = |reason: TransportError| {
        let _ = closed_reason.set(reason.clone());
        let _ = inbound_tx.send(Err(reason));
    };

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("dispatch loop: shutdown requested");
                transport.close().await;
                finish(TransportError::ClosedLocally);
                break;
            }

            cmd = cmd_rx.recv() => {
                let Some(SendCommand { text, done }) = cmd else {
                    debug!("dispatch loop: client handle dropped");
                    transport.close().await;
                    finish(TransportError::ClosedLocally);
                    break;
                };
                match transport.send(text).await {
                    Ok(()) => {
                        let _ = done.send(Ok(()));
                    }
                    Err(e) => {
                        error!("transport send error: {e}");
                        let _ = done.send(Err(e.clone()));
                        if e.is_terminal() {
                            finish(e);
                            break;
                        }
                    }
                }
            }

            frame = transport.recv() => {
                match frame {
                    Ok(text) => match parse_envelope(&text) {
                        Ok(envelope) => {
                            debug!(kind = %envelope.kind(), "envelope received");
                            if inbound_tx.send(Ok(envelope)).is_err() {
                                transport.close().await;
                                break;
                            }
                        }
                        Err(ParseError::Violation(violation)) => {
                            warn!("skipping envelope: {violation}");
                        }
                        Err(ParseError::Malformed(e)) => {
                            warn!("undecodable frame: {e}");
                            let _ = inbound_tx.send(Err(TransportError::Decode {
                                detail: e.to_string(),
                            }));
                        }
                    },
                    Err(e) if !e.is_terminal() => {
                        warn!("undecodable frame: {e}");
                        let _ = inbound_tx.send(Err(e));
                    }
                    Err(e) => {
                        if e.is_clean_close() {
                            debug!("transport closed: {e}");
                        } else {
                            error!("transport receive error: {e}");
                        }
                        finish(e);
                        break;
                    }
                }
            }
        }
    }

    debug!("dispatch loop exited");
}
