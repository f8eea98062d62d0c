//! Environment configuration for session clients.

use crate::types::{PlayerId, SessionIdentity, Team, DEFAULT_SERVER_URL, DEFAULT_SESSION_ID};

/// Where to connect and which session to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub session_id: String,
    pub team: Team,
    /// Identity to resume, if the coordinator issued one earlier.
    pub player_id: Option<PlayerId>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            team: Team::Attack,
            player_id: None,
        }
    }
}

impl ClientConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let server_url =
            non_empty("LOBBY_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let session_id =
            non_empty("LOBBY_SESSION_ID").unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
        let team = non_empty("LOBBY_TEAM")
            .map(|s| Team::from_str_lenient(&s))
            .unwrap_or_default();
        let player_id = non_empty("LOBBY_PLAYER_ID").map(PlayerId::new);

        Self {
            server_url,
            session_id,
            team,
            player_id,
        }
    }

    /// Identity for a player called `display_name` under this configuration.
    pub fn identity(&self, display_name: impl Into<String>) -> SessionIdentity {
        SessionIdentity::new(self.server_url.clone(), display_name, self.team)
            .with_session_id(self.session_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.session_id, "main");
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("LOBBY_SERVER_URL", "ws://10.0.0.2:4000"),
            ("LOBBY_SESSION_ID", "finals"),
            ("LOBBY_TEAM", "DEFENSE"),
            ("LOBBY_PLAYER_ID", " p42 "),
        ]));
        assert_eq!(config.server_url, "ws://10.0.0.2:4000");
        assert_eq!(config.session_id, "finals");
        assert_eq!(config.team, Team::Defense);
        assert_eq!(config.player_id, Some(PlayerId::from("p42")));
    }

    #[test]
    fn unknown_team_and_blank_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("LOBBY_TEAM", "midfield"),
            ("LOBBY_SESSION_ID", "   "),
            ("LOBBY_PLAYER_ID", ""),
        ]));
        assert_eq!(config.team, Team::Attack);
        assert_eq!(config.session_id, "main");
        assert_eq!(config.player_id, None);
    }

    #[test]
    fn identity_carries_session() {
        let config = ClientConfig {
            session_id: "finals".into(),
            ..ClientConfig::default()
        };
        let identity = config.identity("Trinity");
        assert_eq!(identity.display_name, "Trinity");
        assert_eq!(identity.session_id, "finals");
        assert_eq!(identity.server_address, DEFAULT_SERVER_URL);
    }
}
