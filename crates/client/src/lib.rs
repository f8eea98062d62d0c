//! Session client - join a coordinator's lobby and play one match
//!
//! A [`SessionClient`] drives one player through the coordinator's lifecycle
//! over a persistent, ordered, message-framed connection:
//!
//! 1. **Connect**: open the transport, send `join`, wait for `full_state`
//! 2. **Lobby**: `ready`, then watch `players_update` until the host starts
//! 3. **Match**: `start` arrives; report `score_update` deltas
//! 4. **Finish**: send `finish` with the final score, then close
//!
//! # Architecture
//!
//! - [`transport`]: the [`Transport`]/[`Connector`] seam plus an in-memory pair
//! - [`ws`]: WebSocket transport (tokio-tungstenite)
//! - `dispatch`: background task that owns the transport, acknowledges every
//!   write and forwards decoded envelopes in arrival order
//! - `inbox`: per-topic queues so a wait for one kind of envelope never drops
//!   another
//! - [`state`]: the client's cached copy of the coordinator's session view
//! - [`session`]: the state machine itself
//!
//! The coordinator is authoritative. The client never sums scores or flips
//! readiness locally; [`SessionState`] only changes when an envelope arrives.
//!
//! # Environment Variables
//!
//! - `LOBBY_SERVER_URL`: coordinator address (default: "ws://127.0.0.1:3000")
//! - `LOBBY_SESSION_ID`: session to join (default: "main")
//! - `LOBBY_TEAM`: "attack" or "defense" (default: "attack")
//! - `LOBBY_PLAYER_ID`: earlier identity to resume
//!
//! # Example
//!
//! ```no_run
//! use lobby_session_client::{ClientConfig, SessionClient};
//!
//! # async fn run() -> lobby_session_client::Result<()> {
//! let config = ClientConfig::from_env();
//! let mut client = SessionClient::new(config.identity("Neo"));
//! client.connect().await?;
//! client.mark_ready().await?;
//! client.await_match_start().await?;
//! client.report_score_delta(7).await?;
//! client.finish(7).await?;
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod dispatch;
pub mod error;
mod inbox;
pub mod notify;
pub mod session;
pub mod state;
pub mod transport;
pub mod ws;

pub use lobby_session_protocol as protocol;
pub use lobby_session_types as types;

pub use config::ClientConfig;
pub use error::{ConnectError, Result, SessionError, TransportError};
pub use inbox::Topic;
pub use notify::{BellNotifier, Notifier, SilentNotifier};
pub use session::{CloseHandle, SessionClient, SessionPhase};
pub use state::SessionState;
pub use transport::{memory_pair, Connector, CoordinatorEnd, MemoryConnector, MemoryTransport, Transport};
pub use ws::{WsConnector, WsTransport};
