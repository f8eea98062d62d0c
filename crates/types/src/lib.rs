//! Core types module - identity, roster, and protocol constants
//!
//! This module defines the plain data shared by the wire protocol and the
//! session client. Types here carry no I/O and no async machinery; they only
//! know how to (de)serialize themselves in the coordinator's JSON shape.
//!
//! # Teams
//!
//! Every player belongs to exactly one of two teams:
//!
//! - **attack** (the coordinator's default)
//! - **defense**
//!
//! # Roster Records
//!
//! The coordinator keys its roster by player id. A record carries at least
//! `name`, `team` and `ready`; running `score`, `connected` and `lastSeen` are
//! present once the coordinator has something to say about them. Roster
//! updates may be partial, so every field has a default.
//!
//! # Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `DEFAULT_SESSION_ID` | `"main"` | Session grouping used when none is given |
//! | `DEFAULT_SERVER_URL` | `"ws://127.0.0.1:3000"` | Coordinator address |
//! | `MIN_READY_PLAYERS` | 4 | Ready non-host players required before a host may start |
//!
//! # Examples
//!
//! ```
//! use lobby_session_types::{SessionIdentity, Team, DEFAULT_SESSION_ID};
//!
//! let team = Team::from_str("DEFENSE").unwrap();
//! assert_eq!(team, Team::Defense);
//!
//! let identity = SessionIdentity::new("ws://127.0.0.1:3000", "Neo", team);
//! assert_eq!(identity.session_id, DEFAULT_SESSION_ID);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Session grouping used when the caller does not name one.
pub const DEFAULT_SESSION_ID: &str = "main";

/// Coordinator address used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000";

/// Ready non-host players the coordinator requires before honouring `start_request`.
pub const MIN_READY_PLAYERS: usize = 4;

/// Team a player competes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Team {
    #[default]
    Attack,
    Defense,
}

impl Team {
    /// Parse team from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use lobby_session_types::Team;
    ///
    /// assert_eq!(Team::from_str("attack"), Some(Team::Attack));
    /// assert_eq!(Team::from_str("Defense"), Some(Team::Defense));
    /// assert_eq!(Team::from_str("midfield"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("attack") {
            Some(Team::Attack)
        } else if s.eq_ignore_ascii_case("defense") {
            Some(Team::Defense)
        } else {
            None
        }
    }

    /// Map any string onto a team the way the coordinator does:
    /// only `defense` selects defense, everything else is attack.
    pub fn from_str_lenient(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Attack => "attack",
            Team::Defense => "defense",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Team {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Team::from_str(&s).ok_or_else(|| serde::de::Error::custom("invalid team"))
    }
}

impl Serialize for Team {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Opaque player identifier assigned by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Who a client is, fixed for the life of one session client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub server_address: String,
    pub display_name: String,
    pub team: Team,
    pub session_id: String,
}

impl SessionIdentity {
    pub fn new(server_address: impl Into<String>, display_name: impl Into<String>, team: Team) -> Self {
        Self {
            server_address: server_address.into(),
            display_name: display_name.into(),
            team,
            session_id: DEFAULT_SESSION_ID.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

/// One roster entry as broadcast by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerRecord {
    pub name: String,
    pub team: Team,
    pub ready: bool,
    #[serde(
        deserialize_with = "score::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(rename = "lastSeen", skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<u64>,
}

/// Player records keyed by player id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(pub BTreeMap<PlayerId, PlayerRecord>);

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerRecord> {
        self.0.get(id)
    }

    pub fn insert(&mut self, id: PlayerId, record: PlayerRecord) {
        self.0.insert(id, record);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &PlayerRecord)> {
        self.0.iter()
    }

    /// Players currently flagged ready.
    pub fn ready_count(&self) -> usize {
        self.0.values().filter(|p| p.ready).count()
    }

    /// Sum of running scores per team, as the coordinator computes it.
    pub fn team_scores(&self) -> TeamScores {
        let mut scores = TeamScores::default();
        for record in self.0.values() {
            let value = record.score.unwrap_or(0);
            match record.team {
                Team::Attack => scores.attack = scores.attack.saturating_add(value),
                Team::Defense => scores.defense = scores.defense.saturating_add(value),
            }
        }
        scores
    }
}

/// Aggregate score per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamScores {
    #[serde(deserialize_with = "score::deserialize")]
    pub attack: i64,
    #[serde(deserialize_with = "score::deserialize")]
    pub defense: i64,
}

impl TeamScores {
    pub fn for_team(&self, team: Team) -> i64 {
        match team {
            Team::Attack => self.attack,
            Team::Defense => self.defense,
        }
    }
}

/// Score fields accept any JSON number. Fractions round to the nearest
/// integer and out-of-range values clamp to the `i64` bounds.
mod score {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer};

    struct WholeScore(i64);

    impl<'de> Deserialize<'de> for WholeScore {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(WholeScoreVisitor).map(WholeScore)
        }
    }

    struct WholeScoreVisitor;

    impl<'de> Visitor<'de> for WholeScoreVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a numeric score")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            Ok(i64::try_from(v).unwrap_or(i64::MAX))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.is_nan() {
                return Err(E::invalid_value(de::Unexpected::Float(v), &self));
            }
            // `as` saturates at the i64 bounds.
            Ok(v.round() as i64)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        WholeScore::deserialize(deserializer).map(|s| s.0)
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<WholeScore>::deserialize(deserializer)?.map(|s| s.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_parsing_is_case_insensitive_and_lenient_maps_to_attack() {
        assert_eq!(Team::from_str("ATTACK"), Some(Team::Attack));
        assert_eq!(Team::from_str("defense"), Some(Team::Defense));
        assert_eq!(Team::from_str(""), None);
        assert_eq!(Team::from_str_lenient("goalie"), Team::Attack);
        assert_eq!(Team::from_str_lenient("Defense"), Team::Defense);
    }

    #[test]
    fn partial_record_fills_defaults() {
        let rec: PlayerRecord = serde_json::from_str(r#"{"ready":true}"#).unwrap();
        assert!(rec.ready);
        assert_eq!(rec.name, "");
        assert_eq!(rec.team, Team::Attack);
        assert_eq!(rec.score, None);
    }

    #[test]
    fn record_reads_coordinator_field_names() {
        let rec: PlayerRecord = serde_json::from_str(
            r#"{"name":"Neo","team":"defense","ready":false,"score":12,"connected":true,"lastSeen":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(rec.team, Team::Defense);
        assert_eq!(rec.score, Some(12));
        assert_eq!(rec.connected, Some(true));
        assert_eq!(rec.last_seen, Some(1_700_000_000_000));
    }

    #[test]
    fn unknown_team_is_rejected() {
        let err = serde_json::from_str::<PlayerRecord>(r#"{"team":"spectator"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn roster_counts_ready_and_sums_team_scores() {
        let mut roster = Roster::new();
        roster.insert(
            PlayerId::from("a"),
            PlayerRecord {
                name: "A".into(),
                team: Team::Attack,
                ready: true,
                score: Some(7),
                ..PlayerRecord::default()
            },
        );
        roster.insert(
            PlayerId::from("b"),
            PlayerRecord {
                name: "B".into(),
                team: Team::Defense,
                ready: false,
                score: Some(3),
                ..PlayerRecord::default()
            },
        );
        roster.insert(
            PlayerId::from("c"),
            PlayerRecord {
                name: "C".into(),
                team: Team::Defense,
                ready: true,
                ..PlayerRecord::default()
            },
        );

        assert_eq!(roster.ready_count(), 2);
        let scores = roster.team_scores();
        assert_eq!(scores.attack, 7);
        assert_eq!(scores.defense, 3);
        assert_eq!(scores.for_team(Team::Defense), 3);
    }

    #[test]
    fn fractional_and_oversized_scores_are_rounded_and_clamped() {
        let rec: PlayerRecord =
            serde_json::from_str(r#"{"name":"Neo","team":"attack","score":12.5}"#).unwrap();
        assert_eq!(rec.score, Some(13));

        let rec: PlayerRecord = serde_json::from_str(r#"{"score":-2.4}"#).unwrap();
        assert_eq!(rec.score, Some(-2));

        let rec: PlayerRecord = serde_json::from_str(r#"{"score":null}"#).unwrap();
        assert_eq!(rec.score, None);

        let rec: PlayerRecord = serde_json::from_str(r#"{"score":1e300}"#).unwrap();
        assert_eq!(rec.score, Some(i64::MAX));

        let rec: PlayerRecord = serde_json::from_str(r#"{"score":18446744073709551615}"#).unwrap();
        assert_eq!(rec.score, Some(i64::MAX));

        let scores: TeamScores = serde_json::from_str(r#"{"attack":12.5,"defense":3}"#).unwrap();
        assert_eq!(scores, TeamScores { attack: 13, defense: 3 });

        assert!(serde_json::from_str::<PlayerRecord>(r#"{"score":"ten"}"#).is_err());
    }

    #[test]
    fn team_totals_saturate_instead_of_overflowing() {
        let mut roster = Roster::new();
        for id in ["a", "b", "c"] {
            roster.insert(
                PlayerId::from(id),
                PlayerRecord {
                    team: Team::Attack,
                    score: Some(i64::MAX - 1),
                    ..PlayerRecord::default()
                },
            );
        }
        roster.insert(
            PlayerId::from("d"),
            PlayerRecord {
                team: Team::Defense,
                score: Some(i64::MIN),
                ..PlayerRecord::default()
            },
        );
        roster.insert(
            PlayerId::from("e"),
            PlayerRecord {
                team: Team::Defense,
                score: Some(-5),
                ..PlayerRecord::default()
            },
        );

        let scores = roster.team_scores();
        assert_eq!(scores.attack, i64::MAX);
        assert_eq!(scores.defense, i64::MIN);
    }

    #[test]
    fn identity_defaults_to_main_session() {
        let id = SessionIdentity::new("ws://h:1", "Trinity", Team::Attack);
        assert_eq!(id.session_id, "main");
        let id = id.with_session_id("arena-2");
        assert_eq!(id.session_id, "arena-2");
    }
}
