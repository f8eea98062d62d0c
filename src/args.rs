//! Command-line parsing for the binaries.
//!
//! Flags override the `LOBBY_*` environment, which overrides the defaults.

use anyhow::{anyhow, Result};

use crate::client::ClientConfig;
use crate::types::{PlayerId, Team};

/// Rounds of simulated scoring in one match.
pub const DEFAULT_ROUNDS: u32 = 5;
/// Concurrent players a swarm run starts with.
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerArgs {
    pub config: ClientConfig,
    /// Skip the name prompt when set.
    pub name: Option<String>,
    pub rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmArgs {
    pub config: ClientConfig,
    pub workers: usize,
    pub rounds: u32,
}

fn value<'a>(args: &'a [String], i: usize, bin: &str, flag: &str) -> Result<&'a String> {
    args.get(i)
        .ok_or_else(|| anyhow!("{}: missing value for {}", bin, flag))
}

/// Apply a flag shared by every binary; false if `flag` is not one of them.
fn apply_common(config: &mut ClientConfig, flag: &str, v: &str) -> Result<bool> {
    match flag {
        "--url" => config.server_url = v.to_string(),
        "--session" => config.session_id = v.to_string(),
        "--team" => {
            config.team =
                Team::from_str(v).ok_or_else(|| anyhow!("invalid --team value: {}", v))?;
        }
        "--resume" => config.player_id = Some(PlayerId::new(v)),
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_rounds(v: &str, bin: &str) -> Result<u32> {
    v.parse::<u32>()
        .map_err(|_| anyhow!("{}: invalid --rounds value: {}", bin, v))
}

pub fn parse_player_args(args: &[String], base: ClientConfig) -> Result<PlayerArgs> {
    let mut config = base;
    let mut name = None;
    let mut rounds = DEFAULT_ROUNDS;
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        if !flag.starts_with("--") {
            return Err(anyhow!("lobby-player: unknown argument: {}", flag));
        }
        i += 1;
        let v = value(args, i, "lobby-player", flag)?;
        match flag {
            "--name" => name = Some(v.trim().to_string()).filter(|s| !s.is_empty()),
            "--rounds" => rounds = parse_rounds(v, "lobby-player")?,
            _ => {
                if !apply_common(&mut config, flag, v)? {
                    return Err(anyhow!("lobby-player: unknown argument: {}", flag));
                }
            }
        }
        i += 1;
    }

    Ok(PlayerArgs {
        config,
        name,
        rounds,
    })
}

pub fn parse_swarm_args(args: &[String], base: ClientConfig) -> Result<SwarmArgs> {
    let mut config = base;
    let mut workers = DEFAULT_WORKERS;
    let mut rounds = DEFAULT_ROUNDS;
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        if !flag.starts_with("--") {
            return Err(anyhow!("lobby-swarm: unknown argument: {}", flag));
        }
        i += 1;
        let v = value(args, i, "lobby-swarm", flag)?;
        match flag {
            "--workers" => {
                workers = v
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| anyhow!("lobby-swarm: invalid --workers value: {}", v))?;
            }
            "--rounds" => rounds = parse_rounds(v, "lobby-swarm")?,
            _ => {
                if !apply_common(&mut config, flag, v)? {
                    return Err(anyhow!("lobby-swarm: unknown argument: {}", flag));
                }
            }
        }
        i += 1;
    }

    Ok(SwarmArgs {
        config,
        workers,
        rounds,
    })
}
