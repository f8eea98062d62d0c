//! Many simulated players against one coordinator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{Connector, SessionClient, SessionError, TransportError};
use crate::play::play_match;
use crate::sim::ScoreFeed;

/// Outcome tallies for one swarm run.
#[derive(Debug, Default)]
pub struct RunCounters {
    joined: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
    failed: AtomicUsize,
    stopped: AtomicUsize,
}

/// Point-in-time copy of [`RunCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub joined: usize,
    pub started: usize,
    pub finished: usize,
    pub failed: usize,
    pub stopped: usize,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            joined: self.joined.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            stopped: self.stopped.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "joined={} started={} finished={} failed={} stopped={}",
            self.joined, self.started, self.finished, self.failed, self.stopped
        )
    }
}

/// Drive one client from connect to close, tallying progress in `counters`.
///
/// Cancelling `stop` abandons the run with [`TransportError::ClosedLocally`].
/// The client is always closed, whatever happened.
pub async fn run_worker<C: Connector>(
    worker: usize,
    mut client: SessionClient<C>,
    mut feed: ScoreFeed,
    interval: Duration,
    counters: &RunCounters,
    stop: &CancellationToken,
) -> Result<i64, SessionError> {
    let result = tokio::select! {
        r = drive(&mut client, &mut feed, interval, counters) => r,
        _ = stop.cancelled() => Err(TransportError::ClosedLocally.into()),
    };
    client.close().await;
    match &result {
        Ok(score) => {
            counters.finished.fetch_add(1, Ordering::Relaxed);
            info!(worker, score, "worker finished");
        }
        Err(_) if stop.is_cancelled() => {
            counters.stopped.fetch_add(1, Ordering::Relaxed);
            info!(worker, "worker stopped");
        }
        Err(e) if e.transport().is_some_and(TransportError::is_clean_close) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            info!(worker, "coordinator closed the session: {e}");
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(worker, "worker failed: {e}");
        }
    }
    result
}

async fn drive<C: Connector>(
    client: &mut SessionClient<C>,
    feed: &mut ScoreFeed,
    interval: Duration,
    counters: &RunCounters,
) -> Result<i64, SessionError> {
    client.connect().await?;
    counters.joined.fetch_add(1, Ordering::Relaxed);
    client.mark_ready().await?;
    client.await_match_start().await?;
    counters.started.fetch_add(1, Ordering::Relaxed);
    play_match(client, feed, interval, |_, _| {}).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{memory_pair, MemoryConnector};
    use crate::protocol::{FullState, ServerEnvelope, StartSignal};
    use crate::sim::SimpleRng;
    use crate::types::{Roster, SessionIdentity, Team};

    fn identity(i: usize) -> SessionIdentity {
        SessionIdentity::new("mem://", format!("Bot {i}"), Team::Attack)
    }

    fn full_state() -> ServerEnvelope {
        ServerEnvelope::FullState(FullState {
            game_id: None,
            players: Roster::new(),
            team_scores: None,
            started: false,
            host_id: None,
        })
    }

    #[tokio::test]
    async fn counters_tally_success_and_failure() {
        let counters = RunCounters::new();

        let (transport, ok_end) = memory_pair();
        ok_end.send(&full_state());
        ok_end.send(&ServerEnvelope::Start(StartSignal::default()));
        let ok = SessionClient::with_connector(identity(0), MemoryConnector::new(transport));

        let (transport, mut dropped_end) = memory_pair();
        dropped_end.send(&full_state());
        dropped_end.drop_link();
        let failing = SessionClient::with_connector(identity(1), MemoryConnector::new(transport));

        let refused = SessionClient::with_connector(identity(2), MemoryConnector::refusing());

        let feed = || ScoreFeed::new(SimpleRng::new(9), 2);
        let stop = CancellationToken::new();
        let (a, b, c) = tokio::join!(
            run_worker(0, ok, feed(), Duration::ZERO, &counters, &stop),
            run_worker(1, failing, feed(), Duration::ZERO, &counters, &stop),
            run_worker(2, refused, feed(), Duration::ZERO, &counters, &stop),
        );

        assert!(a.unwrap() >= 2);
        assert!(matches!(
            b,
            Err(SessionError::Transport(TransportError::ClosedAbnormally { .. }))
        ));
        assert!(matches!(c, Err(SessionError::Connection(_))));
        assert_eq!(
            counters.snapshot(),
            RunSummary {
                joined: 2,
                started: 1,
                finished: 1,
                failed: 2,
                stopped: 0,
            }
        );
        assert_eq!(ok_end.close_count(), 1);
    }

    #[tokio::test]
    async fn stop_closes_a_worker_blocked_in_the_lobby() {
        let counters = RunCounters::new();
        let stop = CancellationToken::new();

        let (transport, coordinator) = memory_pair();
        coordinator.send(&full_state());
        let client = SessionClient::with_connector(identity(0), MemoryConnector::new(transport));

        let trigger = stop.clone();
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let feed = ScoreFeed::new(SimpleRng::new(3), 2);
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            run_worker(0, client, feed, Duration::ZERO, &counters, &stop),
        )
        .await
        .expect("stop did not end the worker");
        stopper.await.unwrap();

        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::ClosedLocally))
        ));
        assert_eq!(coordinator.close_count(), 1);
        assert_eq!(
            counters.snapshot(),
            RunSummary {
                joined: 1,
                started: 0,
                finished: 0,
                failed: 0,
                stopped: 1,
            }
        );
    }

    #[tokio::test]
    async fn clean_coordinator_close_counts_as_failure() {
        let counters = RunCounters::new();
        let stop = CancellationToken::new();

        let (transport, mut coordinator) = memory_pair();
        coordinator.send(&full_state());
        coordinator.close_cleanly(1000, "session over");
        let client = SessionClient::with_connector(identity(0), MemoryConnector::new(transport));

        let feed = ScoreFeed::new(SimpleRng::new(3), 2);
        let err = run_worker(0, client, feed, Duration::ZERO, &counters, &stop)
            .await
            .unwrap_err();
        assert!(err.transport().is_some_and(TransportError::is_clean_close));
        assert_eq!(counters.snapshot().failed, 1);
        assert_eq!(counters.snapshot().stopped, 0);
    }
}
