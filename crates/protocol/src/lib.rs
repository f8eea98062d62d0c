//! Wire protocol for the lobby session
//!
//! A player and the session coordinator exchange text frames over one
//! persistent connection. Each frame holds exactly one envelope:
//!
//! ```text
//! { "type": "<tag>", "payload": { ...tag-specific fields... } }
//! ```
//!
//! # Envelopes
//!
//! ## Player → Coordinator
//!
//! - **join**: `name`, `team`, `gameId`, optional `playerId` (resume), optional `role`
//! - **ready**: `ready: true`
//! - **score_update**: `scoreDelta`
//! - **finish**: `finalScore`
//! - **leave**, **claim_host**, **start_request**, **end_session**: empty payload
//! - **host_transfer**: `targetPlayerId`
//!
//! ## Coordinator → Player
//!
//! - **joined** / **resumed**: `playerId`, `gameId`
//! - **full_state**: `gameId`, `players`, `teamScores`, `started`, `hostId`
//! - **players_update**: `players`
//! - **start**: no required fields
//! - **score_broadcast**: `players`, `teamScores`
//! - **player_finished**: `playerId`, `players`, `teamScores`
//! - **host_update**: `hostId`
//! - **end_session** / **error** / **info**: `message`
//!
//! # Example Protocol Flow
//!
//! ```text
//! Player -> Coordinator: {"type":"join","payload":{"name":"Neo","team":"defense","gameId":"main"}}
//! Coordinator -> Player: {"type":"joined","payload":{"playerId":"p1","gameId":"main"}}
//! Coordinator -> Player: {"type":"full_state","payload":{"gameId":"main","players":{...},"started":false}}
//! Player -> Coordinator: {"type":"ready","payload":{"ready":true}}
//! Coordinator -> Player: {"type":"players_update","payload":{"players":{...}}}
//! Coordinator -> Player: {"type":"start","payload":{"message":"game started"}}
//! Player -> Coordinator: {"type":"score_update","payload":{"scoreDelta":7}}
//! Player -> Coordinator: {"type":"finish","payload":{"finalScore":31}}
//! ```
//!
//! # Parsing
//!
//! [`parse_envelope`] separates frames that are not envelopes at all
//! ([`ParseError::Malformed`]) from envelopes the client does not understand
//! ([`ParseError::Violation`]). Only the former is a transport-level failure.

pub mod error;
pub mod protocol;

pub use lobby_session_types as types;

pub use error::{ParseError, ProtocolViolation};
pub use protocol::*;
