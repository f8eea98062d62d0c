//! WebSocket transport
//!
//! One text frame per envelope. The message and frame size limits of the
//! underlying library are lifted: a `full_state` roster can be arbitrarily
//! large.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{ConnectError, TransportError};
use crate::transport::{Connector, Transport};

/// Opens [`WsTransport`]s with `ws://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

fn unlimited_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = None;
    config.max_frame_size = None;
    config
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn open(&self, address: &str) -> Result<WsTransport, ConnectError> {
        let result =
            tokio_tungstenite::connect_async_with_config(address, Some(unlimited_config()), true)
                .await;
        match result {
            Ok((stream, response)) => {
                debug!(address, status = %response.status(), "websocket handshake complete");
                Ok(WsTransport {
                    stream,
                    closed: false,
                })
            }
            Err(e) => Err(map_connect_error(address, e)),
        }
    }
}

fn map_connect_error(address: &str, e: tungstenite::Error) -> ConnectError {
    let address = address.to_string();
    match e {
        tungstenite::Error::Url(detail) => ConnectError::InvalidAddress {
            address,
            detail: detail.to_string(),
        },
        tungstenite::Error::Io(detail) => ConnectError::Unreachable {
            address,
            detail: detail.to_string(),
        },
        other => ConnectError::Refused {
            address,
            detail: other.to_string(),
        },
    }
}

fn map_stream_error(e: tungstenite::Error) -> TransportError {
    match e {
        tungstenite::Error::ConnectionClosed => TransportError::ClosedCleanly {
            code: None,
            reason: String::new(),
        },
        tungstenite::Error::AlreadyClosed => TransportError::ClosedLocally,
        tungstenite::Error::Utf8 => TransportError::Decode {
            detail: "text frame is not valid utf-8".to_string(),
        },
        other => TransportError::ClosedAbnormally {
            detail: other.to_string(),
        },
    }
}

impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ClosedLocally);
        }
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| match map_stream_error(e) {
                TransportError::ClosedAbnormally { detail } => TransportError::Write { detail },
                other => other,
            })
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        if self.closed {
            return Err(TransportError::ClosedLocally);
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes).map_err(|_| TransportError::Decode {
                        detail: "binary frame is not valid utf-8".to_string(),
                    });
                }
                // Pongs are queued by the library and flushed on the next write.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    return Err(TransportError::ClosedCleanly { code, reason });
                }
                Some(Err(e)) => return Err(map_stream_error(e)),
                None => {
                    return Err(TransportError::ClosedAbnormally {
                        detail: "stream ended without close frame".to_string(),
                    })
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            debug!("websocket close: {e}");
        }
    }
}
