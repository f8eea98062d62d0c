//! Load driver: many simulated players in one session.
//!
//! Every worker opens its own connection, marks ready immediately and plays
//! a simulated match once the host starts it. Totals are printed at the end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use lobby_session::args::parse_swarm_args;
use lobby_session::client::{ClientConfig, SessionClient};
use lobby_session::play::ROUND_INTERVAL;
use lobby_session::sim::{ScoreFeed, SimpleRng};
use lobby_session::swarm::{run_worker, RunCounters};
use lobby_session::trace::init_tracing;

/// How long workers get to close their connections after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

async fn join_all(workers: &mut JoinSet<()>) {
    while workers.join_next().await.is_some() {}
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = parse_swarm_args(&args, ClientConfig::from_env())?;
    println!(
        "Starting {} players against {} (session {})",
        parsed.workers, parsed.config.server_url, parsed.config.session_id
    );

    let counters = Arc::new(RunCounters::new());
    let mut seed = SimpleRng::from_clock();
    let mut workers = JoinSet::new();
    let stop = CancellationToken::new();

    for worker in 0..parsed.workers {
        let identity = parsed.config.identity(format!("Bot {:03}", worker + 1));
        let client = SessionClient::new(identity);
        let feed = ScoreFeed::new(SimpleRng::new(seed.next_u32()), parsed.rounds);
        let counters = Arc::clone(&counters);
        let stop = stop.clone();
        workers.spawn(async move {
            let _ = run_worker(worker, client, feed, ROUND_INTERVAL, &counters, &stop).await;
        });
    }

    tokio::select! {
        _ = join_all(&mut workers) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Stopping...");
            stop.cancel();
            if tokio::time::timeout(SHUTDOWN_GRACE, join_all(&mut workers)).await.is_err() {
                warn!(remaining = workers.len(), "workers did not close in time; aborting");
                workers.shutdown().await;
            }
        }
    }

    let summary = counters.snapshot();
    println!("{summary}");
    if summary.finished == 0 {
        error!("no player finished a match");
        bail!("no player finished a match ({summary})");
    }
    Ok(())
}
