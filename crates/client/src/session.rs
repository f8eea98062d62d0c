//! Session client state machine
//!
//! ```text
//! Unconnected -> Connecting -> AwaitingInitialState -> Lobby -> AwaitingStart
//!             -> InMatch -> Finished -> Closed
//! ```
//!
//! Transitions happen only on explicit calls or on envelope arrival; there
//! are no built-in timeouts. Callers that need a bounded wait race the call
//! against a deadline and close through a [`CloseHandle`].

use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::{Delivery, Dispatcher};
use crate::error::{Result, SessionError, TransportError};
use crate::inbox::{Inbox, Topic};
use crate::protocol::{
    create_finish, create_host_transfer, create_join, create_ready, create_score_update, encode,
    ClientEnvelope, EmptyPayload, Role, ServerEnvelope,
};
use crate::state::SessionState;
use crate::transport::Connector;
use crate::types::{PlayerId, SessionIdentity, MIN_READY_PLAYERS};
use crate::ws::WsConnector;

/// Lifecycle position of a [`SessionClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Unconnected,
    Connecting,
    AwaitingInitialState,
    /// Joined, not ready.
    Lobby,
    /// Joined and ready, waiting for `start`.
    AwaitingStart,
    InMatch,
    Finished,
    Closed,
}

impl SessionPhase {
    /// True while the client holds a joined connection.
    pub fn is_joined(self) -> bool {
        matches!(
            self,
            SessionPhase::Lobby
                | SessionPhase::AwaitingStart
                | SessionPhase::InMatch
                | SessionPhase::Finished
        )
    }
}

/// Closes a client's connection from another task.
///
/// Any wait pending on the client fails with [`TransportError::ClosedLocally`].
#[derive(Debug, Clone)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// One player's connection to the session coordinator.
pub struct SessionClient<C: Connector = WsConnector> {
    identity: SessionIdentity,
    connector: C,
    resume_id: Option<PlayerId>,
    role: Option<Role>,
    phase: SessionPhase,
    state: SessionState,
    dispatcher: Option<Dispatcher>,
    inbox: Inbox,
    terminal: Option<TransportError>,
}

impl SessionClient<WsConnector> {
    /// Client that connects over WebSocket to `identity.server_address`.
    pub fn new(identity: SessionIdentity) -> Self {
        Self::with_connector(identity, WsConnector)
    }
}

impl<C: Connector> SessionClient<C> {
    pub fn with_connector(identity: SessionIdentity, connector: C) -> Self {
        Self {
            identity,
            connector,
            resume_id: None,
            role: None,
            phase: SessionPhase::Unconnected,
            state: SessionState::default(),
            dispatcher: None,
            inbox: Inbox::default(),
            terminal: None,
        }
    }

    /// Ask the coordinator to resume an identity it handed out earlier.
    #[must_use]
    pub fn with_resume(mut self, player_id: PlayerId) -> Self {
        self.resume_id = Some(player_id);
        self
    }

    /// Request a role on join. The coordinator grants `host` only when the
    /// session has none; the outcome arrives as `host_update`.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn player_id(&self) -> Option<&PlayerId> {
        self.state.assigned_player_id.as_ref()
    }

    /// The failure that ended the connection, if it has ended.
    pub fn connection_error(&self) -> Option<&TransportError> {
        self.terminal.as_ref()
    }

    /// Handle that can close this client's connection from elsewhere.
    ///
    /// Only available once [`connect`](Self::connect) has opened the transport.
    pub fn close_handle(&self) -> Option<CloseHandle> {
        self.dispatcher.as_ref().map(|d| CloseHandle {
            token: d.shutdown_token(),
        })
    }

    // ============== Lifecycle ==============

    /// Open the connection, join, and wait for the first `full_state`.
    ///
    /// `joined` / `resumed` only record the assigned id; the call returns once
    /// `full_state` arrives. Anything else received before it is discarded.
    /// On failure the client is left `Unconnected` (open failed) or `Closed`.
    pub async fn connect(&mut self) -> Result<&SessionState> {
        match self.phase {
            SessionPhase::Unconnected => {}
            SessionPhase::Closed => return Err(SessionError::ConnectionClosed),
            _ => return Err(SessionError::AlreadyConnected),
        }

        self.phase = SessionPhase::Connecting;
        let address = self.identity.server_address.clone();
        debug!(%address, "opening transport");
        let transport = match self.connector.open(&address).await {
            Ok(t) => t,
            Err(e) => {
                self.phase = SessionPhase::Unconnected;
                return Err(e.into());
            }
        };
        self.dispatcher = Some(Dispatcher::spawn(transport));
        self.phase = SessionPhase::AwaitingInitialState;

        match self.join_and_await_full_state().await {
            Ok(()) => {
                self.phase = SessionPhase::Lobby;
                info!(
                    player_id = ?self.state.assigned_player_id,
                    players = self.state.players.len(),
                    "joined session {}",
                    self.identity.session_id
                );
                Ok(&self.state)
            }
            Err(e) => {
                self.shutdown_transport().await;
                self.state = SessionState::default();
                self.phase = SessionPhase::Closed;
                Err(e)
            }
        }
    }

    async fn join_and_await_full_state(&mut self) -> Result<()> {
        let join = create_join(&self.identity, self.resume_id.clone(), self.role);
        self.send(join).await?;
        loop {
            let envelope = self.receive().await?;
            match envelope {
                ServerEnvelope::FullState(_) => return Ok(()),
                ServerEnvelope::Joined(_) | ServerEnvelope::Resumed(_) => {
                    debug!(player_id = ?self.state.assigned_player_id, "player id assigned");
                }
                other => debug!(kind = %other.kind(), "discarding envelope before full_state"),
            }
        }
    }

    /// Signal readiness without waiting for the coordinator's answer.
    pub async fn mark_ready(&mut self) -> Result<()> {
        self.require_joined()?;
        self.send(create_ready()).await?;
        self.phase = SessionPhase::AwaitingStart;
        Ok(())
    }

    /// Signal readiness, then wait for the next roster envelope
    /// (`players_update`, `score_broadcast` or `player_finished`) and hand it
    /// to `on_players_update` exactly once.
    ///
    /// Envelopes of other topics that arrive first stay queued for later waits.
    pub async fn mark_ready_with<F>(&mut self, mut on_players_update: F) -> Result<()>
    where
        F: FnMut(&ServerEnvelope),
    {
        self.mark_ready().await?;
        let update = self.take_topic(Topic::Roster).await?;
        on_players_update(&update);
        Ok(())
    }

    /// Block until `start` arrives. Everything received before it is discarded.
    pub async fn await_match_start(&mut self) -> Result<()> {
        self.await_match_start_with(|_| {}).await
    }

    /// Block until `start` arrives, forwarding every earlier envelope to
    /// `on_tick` in arrival order.
    pub async fn await_match_start_with<F>(&mut self, mut on_tick: F) -> Result<()>
    where
        F: FnMut(&ServerEnvelope),
    {
        self.require_joined()?;
        loop {
            let envelope = self.next_envelope().await?;
            if let ServerEnvelope::Start(_) = envelope {
                self.phase = SessionPhase::InMatch;
                info!("match started");
                return Ok(());
            }
            on_tick(&envelope);
        }
    }

    /// Report a score change. Fire-and-forget: no acknowledgment is awaited.
    ///
    /// The client never sums deltas itself; the running total is whatever the
    /// coordinator broadcasts.
    pub async fn report_score_delta(&mut self, delta: i64) -> Result<()> {
        self.require_joined()?;
        if self.phase != SessionPhase::InMatch {
            warn!(phase = ?self.phase, delta, "score reported outside a match");
        }
        self.send(create_score_update(delta)).await
    }

    /// Submit the final score and move to `Finished`.
    pub async fn finish(&mut self, final_score: i64) -> Result<()> {
        self.require_joined()?;
        self.send(create_finish(final_score)).await?;
        self.phase = SessionPhase::Finished;
        info!(final_score, "finished");
        Ok(())
    }

    /// Release the connection. Idempotent; never fails.
    pub async fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        self.shutdown_transport().await;
        self.inbox.clear();
        self.state = SessionState::default();
        self.phase = SessionPhase::Closed;
        debug!("session client closed");
    }

    /// Tell the coordinator this player is leaving, then close.
    pub async fn leave(&mut self) -> Result<()> {
        self.require_joined()?;
        let sent = self.send(ClientEnvelope::Leave(EmptyPayload {})).await;
        self.close().await;
        sent
    }

    // ============== Host controls ==============

    /// Ask to become host. The answer arrives as `host_update` or `error`.
    pub async fn claim_host(&mut self) -> Result<()> {
        self.require_joined()?;
        self.send(ClientEnvelope::ClaimHost(EmptyPayload {})).await
    }

    /// Ask the coordinator to start the match (host only).
    ///
    /// Sent even when the local roster shows too few ready players; the
    /// coordinator has the final say and answers with `start` or `error`.
    pub async fn request_start(&mut self) -> Result<()> {
        self.require_joined()?;
        if !self.state.can_start() {
            warn!(
                ready = self.state.ready_players(),
                required = MIN_READY_PLAYERS,
                "requesting start with too few ready players"
            );
        }
        self.send(ClientEnvelope::StartRequest(EmptyPayload {})).await
    }

    /// Ask the coordinator to end the session (host only).
    pub async fn end_session(&mut self) -> Result<()> {
        self.require_joined()?;
        self.send(ClientEnvelope::EndSession(EmptyPayload {})).await
    }

    /// Hand host rights to another connected player (host only).
    pub async fn transfer_host(&mut self, target: PlayerId) -> Result<()> {
        self.require_joined()?;
        self.send(create_host_transfer(target)).await
    }

    // ============== Observation ==============

    /// Wait for the next inbound envelope, oldest first.
    pub async fn next_event(&mut self) -> Result<ServerEnvelope> {
        self.require_joined()?;
        self.next_envelope().await
    }

    /// Everything already received, oldest first, without waiting.
    ///
    /// On error, envelopes pulled so far stay queued for later calls.
    pub async fn drain_events(&mut self) -> Result<Vec<ServerEnvelope>> {
        self.require_joined()?;
        self.pull_ready()?;
        let mut events = Vec::with_capacity(self.inbox.len());
        while let Some(envelope) = self.inbox.pop_earliest() {
            events.push(envelope);
        }
        Ok(events)
    }

    // ============== Internal helpers ==============

    fn require_joined(&self) -> Result<()> {
        match self.phase {
            SessionPhase::Closed => Err(SessionError::ConnectionClosed),
            p if p.is_joined() => match &self.terminal {
                Some(e) => Err(e.clone().into()),
                None => Ok(()),
            },
            _ => Err(SessionError::NotConnected),
        }
    }

    async fn send(&mut self, envelope: ClientEnvelope) -> Result<()> {
        if let Some(e) = &self.terminal {
            return Err(e.clone().into());
        }
        let Some(dispatcher) = self.dispatcher.as_ref() else {
            return Err(SessionError::NotConnected);
        };
        let text = encode(&envelope)?;
        debug!(kind = envelope.kind(), "sending envelope");
        match dispatcher.send(text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_terminal() {
                    self.terminal = Some(e.clone());
                }
                Err(e.into())
            }
        }
    }

    /// Pull one envelope from the dispatch loop and apply it to the state.
    async fn receive(&mut self) -> Result<ServerEnvelope> {
        if let Some(e) = &self.terminal {
            return Err(e.clone().into());
        }
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        let delivery = dispatcher
            .recv()
            .await
            .unwrap_or(Err(TransportError::ClosedLocally));
        self.accept(delivery)
    }

    fn accept(&mut self, delivery: Delivery) -> Result<ServerEnvelope> {
        match delivery {
            Ok(envelope) => {
                self.state.apply(&envelope);
                Ok(envelope)
            }
            Err(e) => {
                if e.is_terminal() {
                    self.terminal = Some(e.clone());
                }
                Err(e.into())
            }
        }
    }

    /// Move everything already delivered into the inbox, applying it.
    fn pull_ready(&mut self) -> Result<()> {
        if let Some(e) = &self.terminal {
            return Err(e.clone().into());
        }
        loop {
            let Some(dispatcher) = self.dispatcher.as_mut() else {
                return Err(SessionError::NotConnected);
            };
            let delivery = match dispatcher.try_recv() {
                Ok(d) => d,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => Err(TransportError::ClosedLocally),
            };
            let envelope = self.accept(delivery)?;
            self.inbox.push(envelope);
        }
    }

    async fn next_envelope(&mut self) -> Result<ServerEnvelope> {
        match self.inbox.pop_earliest() {
            Some(envelope) => Ok(envelope),
            None => self.receive().await,
        }
    }

    async fn take_topic(&mut self, topic: Topic) -> Result<ServerEnvelope> {
        loop {
            if let Some(envelope) = self.inbox.pop_topic(topic) {
                return Ok(envelope);
            }
            let envelope = self.receive().await?;
            self.inbox.push(envelope);
        }
    }

    async fn shutdown_transport(&mut self) {
        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.shutdown().await;
        }
    }
}

impl<C: Connector> std::fmt::Debug for SessionClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("identity", &self.identity)
            .field("phase", &self.phase)
            .field("player_id", &self.state.assigned_player_id)
            .field("queued", &self.inbox.len())
            .finish()
    }
}
