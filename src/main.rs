//! Keno CLI
//!
//! Play rounds against a local engine, or verify a settled round from its
//! revealed seeds.

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use keno::common::config::{generate_sample_config, ConfigLoader, RevealConfig};
use keno::games::commitment::MAX_DIGEST_BLOCKS;
use keno::games::types::MAX_DRAW_SIZE;
use keno::games::{replay, DifficultyTier, RoundEngine, RoundEvent, Seed, Selection};

#[derive(Parser, Debug)]
#[command(name = "keno")]
#[command(about = "Provably fair keno draw engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one or more rounds on a fresh engine
    Play(PlayArgs),
    /// Recompute digest, draw and payout from revealed seeds
    Verify(VerifyArgs),
    /// Write the default configuration as TOML
    SampleConfig {
        /// Output path
        path: String,
    },
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Selected numbers (comma-separated, 1-80, at most 10)
    #[arg(long, value_delimiter = ',', required = true)]
    numbers: Vec<u8>,

    /// Stake per round
    #[arg(long)]
    stake: Option<u64>,

    /// Difficulty tier: easy, medium or hard
    #[arg(long)]
    tier: Option<DifficultyTier>,

    /// Rounds to play
    #[arg(long, default_value = "1")]
    rounds: u32,

    /// Player seed for the first round (64 hex characters)
    #[arg(long)]
    player_seed: Option<String>,

    /// Configuration file
    #[arg(long)]
    config: Option<String>,

    /// Skip reveal pacing
    #[arg(long)]
    instant: bool,

    /// Print round records as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[arg(long)]
    house_seed: String,

    #[arg(long)]
    player_seed: String,

    /// Selected numbers (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    numbers: Vec<u8>,

    #[arg(long, default_value = "easy")]
    tier: DifficultyTier,

    #[arg(long, default_value = "1")]
    stake: u64,

    /// HMAC blocks in the digest
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u32).range(1..=MAX_DIGEST_BLOCKS as i64))]
    digest_blocks: u32,

    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u8).range(1..=MAX_DRAW_SIZE as i64))]
    draw_size: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "keno=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Play(args) => play(args).await,
        Command::Verify(args) => verify(args),
        Command::SampleConfig { path } => {
            generate_sample_config(&path)?;
            println!("Wrote default configuration to {}", path);
            Ok(())
        }
    }
}

async fn play(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if args.instant {
        config.reveal = RevealConfig::instant();
    }

    let mut engine = RoundEngine::new(&config);
    engine.configure_selection(args.numbers.iter().copied())?;
    engine.configure_stake_and_tier(
        args.stake.unwrap_or(config.engine.default_stake),
        args.tier.unwrap_or(config.engine.default_tier),
    )?;
    if let Some(hex_seed) = &args.player_seed {
        engine.set_player_seed(Seed::from_hex(hex_seed)?)?;
    }

    for round_number in 1..=args.rounds {
        if let Some(hash) = engine.published_commitment() {
            println!("Next house seed commitment: {}", hash);
        }

        let round = match engine.start_round() {
            Ok(round) => round,
            Err(e) => {
                println!("Round {} not started: {}", round_number, e);
                break;
            }
        };
        println!("Round {} - balance after stake: {}", round_number, round.balance());

        let mut events = Box::pin(round.into_stream());
        while let Some(event) = events.next().await {
            match event {
                RoundEvent::NumberRevealed { index, number, is_match } => {
                    let marker = if is_match { " *" } else { "" };
                    println!("  #{:>2}: {:>2}{}", index + 1, number, marker);
                }
                RoundEvent::Settled(settlement) => {
                    println!(
                        "  {} matches x{} -> payout {} (balance {})",
                        settlement.match_count,
                        settlement.multiplier,
                        settlement.payout,
                        settlement.new_balance
                    );
                }
            }
        }
        drop(events);

        if let Some(record) = engine.last_record() {
            if args.json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else {
                println!("  house seed:  {}", record.audit.house_seed);
                println!("  player seed: {}", record.audit.player_seed);
                println!("  digest:      {}", record.audit.digest_hex);
            }
        }
    }

    println!("Final balance: {}", engine.balance());
    Ok(())
}

fn verify(args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let house_seed = Seed::from_hex(&args.house_seed)?;
    let player_seed = Seed::from_hex(&args.player_seed)?;
    let selection = Selection::from_numbers(args.numbers)?;

    let result = replay(
        &house_seed,
        &player_seed,
        &selection,
        args.tier,
        args.stake,
        args.digest_blocks,
        usize::from(args.draw_size),
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
