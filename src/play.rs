//! Match driving shared by the binaries.

use std::time::Duration;

use crate::client::{Connector, Result, SessionClient};
use crate::protocol::ServerEnvelope;
use crate::sim::ScoreFeed;

/// Pause between simulated scoring rounds.
pub const ROUND_INTERVAL: Duration = Duration::from_secs(1);

/// `[Lobby] ready: 3 / 5` for envelopes that carry a roster.
pub fn lobby_progress_line(envelope: &ServerEnvelope) -> Option<String> {
    let players = envelope.players()?;
    if players.is_empty() {
        return None;
    }
    Some(format!(
        "[Lobby] ready: {} / {}",
        players.ready_count(),
        players.len()
    ))
}

/// Report every round of `feed`, `interval` apart, then finish with the total.
///
/// `on_round` sees each delta and the running total. Returns the final score.
pub async fn play_match<C, F>(
    client: &mut SessionClient<C>,
    feed: &mut ScoreFeed,
    interval: Duration,
    mut on_round: F,
) -> Result<i64>
where
    C: Connector,
    F: FnMut(i64, i64),
{
    while let Some(delta) = feed.next() {
        tokio::time::sleep(interval).await;
        client.report_score_delta(delta).await?;
        on_round(delta, feed.total());
    }
    let total = feed.total();
    client.finish(total).await?;
    Ok(total)
}
