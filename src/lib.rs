//! Lobby session (workspace facade crate).
//!
//! Re-exports the member crates under `crates/` as `lobby_session::{types, protocol, client}`
//! and holds the pieces shared by the `lobby-player` and `lobby-swarm` binaries.

pub use lobby_session_client as client;
pub use lobby_session_protocol as protocol;
pub use lobby_session_types as types;

pub mod args;
pub mod play;
pub mod sim;
pub mod swarm;
pub mod trace;
