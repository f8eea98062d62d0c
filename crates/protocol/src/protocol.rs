//! Protocol module - JSON envelope types for the lobby session
//!
//! Every message on the wire is one text frame holding one envelope:
//! `{"type": "<tag>", "payload": {...}}`. Each tag maps to exactly one typed
//! payload; anything else is a [`ProtocolViolation`].

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ProtocolViolation};
use crate::types::{PlayerId, PlayerRecord, Roster, SessionIdentity, Team, TeamScores};

// ============== Client -> Coordinator Envelopes ==============

/// Envelope sent by a player to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEnvelope {
    #[serde(rename = "join")]
    Join(JoinPayload),
    #[serde(rename = "ready")]
    Ready(ReadyPayload),
    #[serde(rename = "score_update")]
    ScoreUpdate(ScoreUpdatePayload),
    #[serde(rename = "finish")]
    Finish(FinishPayload),
    #[serde(rename = "leave")]
    Leave(EmptyPayload),
    #[serde(rename = "claim_host")]
    ClaimHost(EmptyPayload),
    #[serde(rename = "start_request")]
    StartRequest(EmptyPayload),
    #[serde(rename = "end_session")]
    EndSession(EmptyPayload),
    #[serde(rename = "host_transfer")]
    HostTransfer(HostTransferPayload),
}

impl ClientEnvelope {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEnvelope::Join(_) => "join",
            ClientEnvelope::Ready(_) => "ready",
            ClientEnvelope::ScoreUpdate(_) => "score_update",
            ClientEnvelope::Finish(_) => "finish",
            ClientEnvelope::Leave(_) => "leave",
            ClientEnvelope::ClaimHost(_) => "claim_host",
            ClientEnvelope::StartRequest(_) => "start_request",
            ClientEnvelope::EndSession(_) => "end_session",
            ClientEnvelope::HostTransfer(_) => "host_transfer",
        }
    }
}

/// Role requested on join. The coordinator only honours `host` when no host exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "player")]
    Player,
    #[serde(rename = "host")]
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub name: String,
    pub team: Team,
    #[serde(rename = "gameId")]
    pub game_id: String,
    /// Present when resuming an identity the coordinator handed out earlier.
    #[serde(rename = "playerId", default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdatePayload {
    #[serde(rename = "scoreDelta")]
    pub score_delta: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishPayload {
    #[serde(rename = "finalScore")]
    pub final_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTransferPayload {
    #[serde(rename = "targetPlayerId")]
    pub target_player_id: PlayerId,
}

/// Payload for envelopes whose tag is the whole message. Serializes as `{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmptyPayload {}

// ============== Coordinator -> Client Envelopes ==============

/// Envelope received from the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEnvelope {
    #[serde(rename = "joined")]
    Joined(SessionAssigned),
    #[serde(rename = "resumed")]
    Resumed(SessionAssigned),
    #[serde(rename = "full_state")]
    FullState(FullState),
    #[serde(rename = "players_update")]
    PlayersUpdate(RosterUpdate),
    #[serde(rename = "start")]
    Start(StartSignal),
    #[serde(rename = "score_broadcast")]
    ScoreBroadcast(ScoreBroadcast),
    #[serde(rename = "player_finished")]
    PlayerFinished(PlayerFinished),
    #[serde(rename = "host_update")]
    HostUpdate(HostUpdate),
    #[serde(rename = "end_session")]
    EndSession(Notice),
    #[serde(rename = "error")]
    Error(Notice),
    #[serde(rename = "info")]
    Info(Notice),
}

/// Discriminator of an inbound envelope, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Joined,
    Resumed,
    FullState,
    PlayersUpdate,
    Start,
    ScoreBroadcast,
    PlayerFinished,
    HostUpdate,
    EndSession,
    Error,
    Info,
}

impl EnvelopeKind {
    /// Parse an inbound wire tag. Tags are matched exactly.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(tag: &str) -> Option<Self> {
        Some(match tag {
            "joined" => Self::Joined,
            "resumed" => Self::Resumed,
            "full_state" => Self::FullState,
            "players_update" => Self::PlayersUpdate,
            "start" => Self::Start,
            "score_broadcast" => Self::ScoreBroadcast,
            "player_finished" => Self::PlayerFinished,
            "host_update" => Self::HostUpdate,
            "end_session" => Self::EndSession,
            "error" => Self::Error,
            "info" => Self::Info,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::Resumed => "resumed",
            Self::FullState => "full_state",
            Self::PlayersUpdate => "players_update",
            Self::Start => "start",
            Self::ScoreBroadcast => "score_broadcast",
            Self::PlayerFinished => "player_finished",
            Self::HostUpdate => "host_update",
            Self::EndSession => "end_session",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServerEnvelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            ServerEnvelope::Joined(_) => EnvelopeKind::Joined,
            ServerEnvelope::Resumed(_) => EnvelopeKind::Resumed,
            ServerEnvelope::FullState(_) => EnvelopeKind::FullState,
            ServerEnvelope::PlayersUpdate(_) => EnvelopeKind::PlayersUpdate,
            ServerEnvelope::Start(_) => EnvelopeKind::Start,
            ServerEnvelope::ScoreBroadcast(_) => EnvelopeKind::ScoreBroadcast,
            ServerEnvelope::PlayerFinished(_) => EnvelopeKind::PlayerFinished,
            ServerEnvelope::HostUpdate(_) => EnvelopeKind::HostUpdate,
            ServerEnvelope::EndSession(_) => EnvelopeKind::EndSession,
            ServerEnvelope::Error(_) => EnvelopeKind::Error,
            ServerEnvelope::Info(_) => EnvelopeKind::Info,
        }
    }

    /// Roster carried by this envelope, if any.
    pub fn players(&self) -> Option<&Roster> {
        match self {
            ServerEnvelope::FullState(s) => Some(&s.players),
            ServerEnvelope::PlayersUpdate(u) => Some(&u.players),
            ServerEnvelope::ScoreBroadcast(b) => Some(&b.players),
            ServerEnvelope::PlayerFinished(f) => Some(&f.players),
            _ => None,
        }
    }

    /// True for the envelopes that answer a readiness change:
    /// `players_update`, `score_broadcast` and `player_finished`.
    pub fn is_roster_update(&self) -> bool {
        matches!(
            self,
            ServerEnvelope::PlayersUpdate(_)
                | ServerEnvelope::ScoreBroadcast(_)
                | ServerEnvelope::PlayerFinished(_)
        )
    }
}

/// `joined` / `resumed`: the coordinator's assignment of a player id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAssigned {
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    #[serde(rename = "gameId", default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
}

/// `full_state`: authoritative snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullState {
    #[serde(rename = "gameId", default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    pub players: Roster,
    #[serde(rename = "teamScores", default, skip_serializing_if = "Option::is_none")]
    pub team_scores: Option<TeamScores>,
    #[serde(default)]
    pub started: bool,
    #[serde(rename = "hostId", default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<PlayerId>,
}

/// `players_update`: roster change (readiness, joins, disconnects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterUpdate {
    pub players: Roster,
}

/// `start`: its arrival is the signal; the message is informational.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `score_broadcast`: roster with running scores after any score change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBroadcast {
    pub players: Roster,
    #[serde(rename = "teamScores", default, skip_serializing_if = "Option::is_none")]
    pub team_scores: Option<TeamScores>,
}

/// `player_finished`: one player submitted a final score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerFinished {
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    #[serde(default)]
    pub players: Roster,
    #[serde(rename = "teamScores", default, skip_serializing_if = "Option::is_none")]
    pub team_scores: Option<TeamScores>,
}

impl PlayerFinished {
    /// The finishing player's record as the coordinator reports it.
    pub fn finisher(&self) -> Option<&PlayerRecord> {
        self.players.get(&self.player_id)
    }

    pub fn final_score(&self) -> Option<i64> {
        self.finisher().and_then(|p| p.score)
    }
}

/// `host_update`: new host, or `null` when nobody connected remains.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostUpdate {
    #[serde(rename = "hostId", default)]
    pub host_id: Option<PlayerId>,
}

/// `end_session` / `error` / `info`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub message: String,
}

// ============== Encoding / Parsing ==============

/// Serialize an outbound envelope to its wire text.
pub fn encode(envelope: &ClientEnvelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

/// Parse one inbound wire frame.
///
/// Text that is not a JSON object with a string `type` is [`ParseError::Malformed`].
/// A well-formed envelope with an unknown tag, or with a payload that does not
/// match its tag, is [`ParseError::Violation`].
pub fn parse_envelope(text: &str) -> Result<ServerEnvelope, ParseError> {
    #[derive(Debug, Deserialize)]
    struct Raw<'a> {
        #[serde(rename = "type", borrow)]
        msg_type: std::borrow::Cow<'a, str>,
        #[serde(default)]
        payload: Option<serde_json::Value>,
    }

    let raw: Raw<'_> = serde_json::from_str(text).map_err(ParseError::Malformed)?;
    let Some(kind) = EnvelopeKind::from_str(&raw.msg_type) else {
        return Err(ParseError::Violation(ProtocolViolation::UnknownType {
            kind: raw.msg_type.into_owned(),
        }));
    };

    // A missing or null payload is read as an empty object so that
    // payload-free signals such as `start` still parse.
    let payload = match raw.payload {
        None | Some(serde_json::Value::Null) => serde_json::Value::Object(Default::default()),
        Some(v) => v,
    };

    fn typed<T: serde::de::DeserializeOwned>(
        kind: EnvelopeKind,
        payload: serde_json::Value,
    ) -> Result<T, ParseError> {
        serde_json::from_value(payload).map_err(|source| {
            ParseError::Violation(ProtocolViolation::InvalidPayload {
                kind: kind.as_str().to_string(),
                source,
            })
        })
    }

    Ok(match kind {
        EnvelopeKind::Joined => ServerEnvelope::Joined(typed(kind, payload)?),
        EnvelopeKind::Resumed => ServerEnvelope::Resumed(typed(kind, payload)?),
        EnvelopeKind::FullState => ServerEnvelope::FullState(typed(kind, payload)?),
        EnvelopeKind::PlayersUpdate => ServerEnvelope::PlayersUpdate(typed(kind, payload)?),
        EnvelopeKind::Start => ServerEnvelope::Start(typed(kind, payload)?),
        EnvelopeKind::ScoreBroadcast => ServerEnvelope::ScoreBroadcast(typed(kind, payload)?),
        EnvelopeKind::PlayerFinished => ServerEnvelope::PlayerFinished(typed(kind, payload)?),
        EnvelopeKind::HostUpdate => ServerEnvelope::HostUpdate(typed(kind, payload)?),
        EnvelopeKind::EndSession => ServerEnvelope::EndSession(typed(kind, payload)?),
        EnvelopeKind::Error => ServerEnvelope::Error(typed(kind, payload)?),
        EnvelopeKind::Info => ServerEnvelope::Info(typed(kind, payload)?),
    })
}

// ============== Utility Functions ==============

/// Create a join envelope for `identity`, optionally resuming `player_id`
/// and requesting `role`. With no role the coordinator treats the client as a player.
pub fn create_join(
    identity: &SessionIdentity,
    player_id: Option<PlayerId>,
    role: Option<Role>,
) -> ClientEnvelope {
    ClientEnvelope::Join(JoinPayload {
        name: identity.display_name.clone(),
        team: identity.team,
        game_id: identity.session_id.clone(),
        player_id,
        role,
    })
}

/// Create a ready envelope. The readiness handshake always sends `true`.
pub fn create_ready() -> ClientEnvelope {
    ClientEnvelope::Ready(ReadyPayload { ready: true })
}

pub fn create_score_update(score_delta: i64) -> ClientEnvelope {
    ClientEnvelope::ScoreUpdate(ScoreUpdatePayload { score_delta })
}

pub fn create_finish(final_score: i64) -> ClientEnvelope {
    ClientEnvelope::Finish(FinishPayload { final_score })
}

pub fn create_host_transfer(target: PlayerId) -> ClientEnvelope {
    ClientEnvelope::HostTransfer(HostTransferPayload {
        target_player_id: target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_join_matches_wire_shape() {
        let identity = SessionIdentity::new("ws://x", "Neo", Team::Defense);
        let json = encode(&create_join(&identity, None, None)).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["type"], "join");
        assert_eq!(v["payload"]["name"], "Neo");
        assert_eq!(v["payload"]["team"], "defense");
        assert_eq!(v["payload"]["gameId"], "main");
        assert!(v["payload"].get("playerId").is_none());
        assert!(v["payload"].get("role").is_none());
    }

    #[test]
    fn test_encode_join_with_resume_id() {
        let identity = SessionIdentity::new("ws://x", "Neo", Team::Attack);
        let json = encode(&create_join(&identity, Some(PlayerId::from("p9")), None)).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["payload"]["playerId"], "p9");
    }

    #[test]
    fn test_encode_join_with_host_role() {
        let identity = SessionIdentity::new("ws://x", "Morpheus", Team::Attack);
        let json = encode(&create_join(&identity, None, Some(Role::Host))).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["payload"]["role"], "host");
        assert!(v["payload"].get("playerId").is_none());
    }

    #[test]
    fn test_encode_match_envelopes() {
        let v: serde_json::Value =
            serde_json::from_str(&encode(&create_ready()).unwrap()).unwrap();
        assert_eq!(v, serde_json::json!({"type":"ready","payload":{"ready":true}}));

        let v: serde_json::Value =
            serde_json::from_str(&encode(&create_score_update(7)).unwrap()).unwrap();
        assert_eq!(v, serde_json::json!({"type":"score_update","payload":{"scoreDelta":7}}));

        let v: serde_json::Value =
            serde_json::from_str(&encode(&create_finish(31)).unwrap()).unwrap();
        assert_eq!(v, serde_json::json!({"type":"finish","payload":{"finalScore":31}}));

        let v: serde_json::Value =
            serde_json::from_str(&encode(&ClientEnvelope::Leave(EmptyPayload {})).unwrap())
                .unwrap();
        assert_eq!(v, serde_json::json!({"type":"leave","payload":{}}));

        let v: serde_json::Value = serde_json::from_str(
            &encode(&create_host_transfer(PlayerId::from("p2"))).unwrap(),
        )
        .unwrap();
        assert_eq!(v["payload"]["targetPlayerId"], "p2");
    }

    #[test]
    fn test_parse_joined_and_full_state() {
        let joined = parse_envelope(r#"{"type":"joined","payload":{"playerId":"p1","gameId":"main"}}"#)
            .unwrap();
        match joined {
            ServerEnvelope::Joined(a) => {
                assert_eq!(a.player_id, PlayerId::from("p1"));
                assert_eq!(a.game_id.as_deref(), Some("main"));
            }
            other => panic!("Expected Joined, got {other:?}"),
        }

        let full = parse_envelope(
            r#"{"type":"full_state","payload":{"gameId":"main","players":{"p1":{"name":"Neo","team":"defense","ready":false,"score":0}},"teamScores":{"attack":0,"defense":0},"started":false,"hostId":null}}"#,
        )
        .unwrap();
        match full {
            ServerEnvelope::FullState(s) => {
                assert_eq!(s.players.len(), 1);
                let neo = s.players.get(&PlayerId::from("p1")).unwrap();
                assert_eq!(neo.name, "Neo");
                assert_eq!(neo.team, Team::Defense);
                assert!(!s.started);
                assert_eq!(s.host_id, None);
            }
            other => panic!("Expected FullState, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_start_without_payload() {
        assert_eq!(
            parse_envelope(r#"{"type":"start"}"#).unwrap(),
            ServerEnvelope::Start(StartSignal::default())
        );
        assert_eq!(
            parse_envelope(r#"{"type":"start","payload":null}"#).unwrap().kind(),
            EnvelopeKind::Start
        );
    }

    #[test]
    fn test_parse_player_finished_exposes_final_score() {
        let env = parse_envelope(
            r#"{"type":"player_finished","payload":{"playerId":"p1","players":{"p1":{"name":"Neo","team":"attack","ready":false,"score":42}},"teamScores":{"attack":42,"defense":0}}}"#,
        )
        .unwrap();
        let ServerEnvelope::PlayerFinished(f) = env else {
            panic!("Expected PlayerFinished");
        };
        assert_eq!(f.final_score(), Some(42));
        assert_eq!(f.team_scores.unwrap().attack, 42);
    }

    #[test]
    fn test_unknown_type_is_violation() {
        match parse_envelope(r#"{"type":"teleport","payload":{}}"#) {
            Err(ParseError::Violation(ProtocolViolation::UnknownType { kind })) => {
                assert_eq!(kind, "teleport");
            }
            other => panic!("Expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_payload_is_violation() {
        // full_state must carry a players mapping.
        match parse_envelope(r#"{"type":"full_state","payload":{"started":true}}"#) {
            Err(ParseError::Violation(ProtocolViolation::InvalidPayload { kind, .. })) => {
                assert_eq!(kind, "full_state");
            }
            other => panic!("Expected InvalidPayload, got {other:?}"),
        }
        // joined must carry a playerId.
        assert!(matches!(
            parse_envelope(r#"{"type":"joined","payload":{}}"#),
            Err(ParseError::Violation(_))
        ));
    }

    #[test]
    fn test_malformed_text_is_not_a_violation() {
        assert!(matches!(parse_envelope("not json"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_envelope(r#"{"payload":{}}"#), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_envelope(r#"[1,2]"#), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_server_envelope_serializes_to_parsable_wire() {
        let env = ServerEnvelope::HostUpdate(HostUpdate {
            host_id: Some(PlayerId::from("p3")),
        });
        let text = serde_json::to_string(&env).unwrap();
        assert_eq!(parse_envelope(&text).unwrap(), env);
    }

    #[test]
    fn test_client_envelope_parses_back_for_coordinators() {
        let text = r#"{"type":"score_update","payload":{"scoreDelta":-3}}"#;
        let env: ClientEnvelope = serde_json::from_str(text).unwrap();
        assert_eq!(env, create_score_update(-3));
        assert_eq!(env.kind(), "score_update");
    }
}
