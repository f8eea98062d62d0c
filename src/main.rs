//! Interactive player (default binary).
//!
//! Asks for a display name, joins the coordinator's lobby, waits for ENTER
//! before marking ready, then plays a simulated match once the host starts it.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use lobby_session::args::parse_player_args;
use lobby_session::client::{BellNotifier, ClientConfig, Notifier, SessionClient};
use lobby_session::play::{lobby_progress_line, play_match, ROUND_INTERVAL};
use lobby_session::sim::{ScoreFeed, SimpleRng};
use lobby_session::trace::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = parse_player_args(&args, ClientConfig::from_env())?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let name = match parsed.name.clone() {
        Some(name) => name,
        None => prompt_name(&mut stdin).await?,
    };

    let identity = parsed.config.identity(name);
    println!("Connecting to {} ...", identity.server_address);

    let mut client = SessionClient::new(identity);
    if let Some(id) = parsed.config.player_id.clone() {
        client = client.with_resume(id);
    }
    let notifier = BellNotifier;

    let result = tokio::select! {
        r = run(&mut client, &mut stdin, parsed.rounds) => r,
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("Stopped by user.");
            Ok(())
        }
    };
    client.close().await;

    match &result {
        Ok(()) => notifier.success(),
        Err(_) => notifier.failure(),
    }
    result
}

async fn prompt_name(stdin: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    loop {
        println!("Your name:");
        let line = stdin
            .next_line()
            .await?
            .context("stdin closed before a name was entered")?;
        let name = line.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

async fn run(
    client: &mut SessionClient,
    stdin: &mut Lines<BufReader<Stdin>>,
    rounds: u32,
) -> Result<()> {
    let state = client.connect().await.context("failed to join the lobby")?;
    println!("Connected. Players in lobby: {}", state.players.len());

    println!("Press ENTER to mark yourself READY...");
    // EOF counts as ENTER so the driver also runs unattended.
    let _ = stdin.next_line().await?;

    client
        .mark_ready_with(|update| {
            if let Some(line) = lobby_progress_line(update) {
                println!("{line}");
            }
        })
        .await?;

    println!("Waiting for the host to start the match...");
    client
        .await_match_start_with(|tick| {
            if let Some(line) = lobby_progress_line(tick) {
                println!("{line}");
            }
        })
        .await?;
    println!("==> MATCH STARTED! <==");

    let team = client.identity().team;
    let mut feed = ScoreFeed::new(SimpleRng::from_clock(), rounds);
    let total = play_match(client, &mut feed, ROUND_INTERVAL, |delta, running| {
        println!("[{team}] +{delta} points (running={running})");
    })
    .await?;

    println!("Finished with score={total}. You may close this window.");
    Ok(())
}
