//! Local cache of the coordinator's session view.

use crate::protocol::ServerEnvelope;
use crate::types::{PlayerId, PlayerRecord, Roster, TeamScores, MIN_READY_PLAYERS};

/// The client's copy of what the coordinator last broadcast.
///
/// Only inbound envelopes change it; nothing the client sends is reflected
/// until the coordinator echoes it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub assigned_player_id: Option<PlayerId>,
    pub game_id: Option<String>,
    pub players: Roster,
    pub team_scores: TeamScores,
    pub host_id: Option<PlayerId>,
    pub started: bool,
    has_full_state: bool,
}

impl SessionState {
    /// Fold one inbound envelope into the cache.
    pub fn apply(&mut self, envelope: &ServerEnvelope) {
        match envelope {
            ServerEnvelope::Joined(a) | ServerEnvelope::Resumed(a) => {
                self.assigned_player_id = Some(a.player_id.clone());
                if a.game_id.is_some() {
                    self.game_id = a.game_id.clone();
                }
            }
            ServerEnvelope::FullState(s) => {
                if s.game_id.is_some() {
                    self.game_id = s.game_id.clone();
                }
                self.players = s.players.clone();
                self.team_scores = s.team_scores.unwrap_or_else(|| s.players.team_scores());
                self.started = s.started;
                self.host_id = s.host_id.clone();
                self.has_full_state = true;
            }
            ServerEnvelope::PlayersUpdate(u) => {
                self.players = u.players.clone();
            }
            ServerEnvelope::ScoreBroadcast(b) => {
                self.players = b.players.clone();
                self.team_scores = b.team_scores.unwrap_or_else(|| b.players.team_scores());
            }
            ServerEnvelope::PlayerFinished(f) => {
                if !f.players.is_empty() {
                    self.players = f.players.clone();
                }
                self.team_scores = f.team_scores.unwrap_or_else(|| self.players.team_scores());
            }
            ServerEnvelope::HostUpdate(h) => {
                self.host_id = h.host_id.clone();
            }
            ServerEnvelope::Start(_) => {
                self.started = true;
            }
            ServerEnvelope::EndSession(_) => {
                self.started = false;
            }
            ServerEnvelope::Error(_) | ServerEnvelope::Info(_) => {}
        }
    }

    /// True once an authoritative `full_state` has been applied.
    pub fn has_full_state(&self) -> bool {
        self.has_full_state
    }

    /// This client's own roster entry.
    pub fn me(&self) -> Option<&PlayerRecord> {
        self.assigned_player_id
            .as_ref()
            .and_then(|id| self.players.get(id))
    }

    /// This client's score as last reported by the coordinator.
    pub fn my_score(&self) -> Option<i64> {
        self.me().and_then(|p| p.score)
    }

    pub fn is_host(&self) -> bool {
        self.assigned_player_id.is_some() && self.assigned_player_id == self.host_id
    }

    /// Ready players, not counting the host.
    pub fn ready_players(&self) -> usize {
        self.players
            .iter()
            .filter(|(id, p)| p.ready && self.host_id.as_ref() != Some(*id))
            .count()
    }

    /// Whether enough players are ready for the coordinator to honour `start_request`.
    pub fn can_start(&self) -> bool {
        self.ready_players() >= MIN_READY_PLAYERS
    }
}
