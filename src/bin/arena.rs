use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use othello_arena::config::ArenaConfig;
use othello_arena::coordinator::{BotTurn, MatchConfig, MatchRegistry, PlayerKind};
use othello_arena::quarantine::{Quarantine, RequestInfo};
use othello_arena::registry::BotRegistry;
use othello_arena::runtime::BotRuntime;
use othello_arena::util::bot_game;
use othello_arena::vetter::SourceVetter;

/// Host Othello matches between humans and uploaded bots.
#[derive(Parser)]
#[command(name = "arena", about = "Othello arena for humans and untrusted bots")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "arena.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the default configuration
    DefaultConfig,
    /// Vet a python bot without uploading it
    Vet { file: PathBuf },
    /// Vet and store a python bot
    Upload { file: PathBuf },
    /// List the available bots
    Bots,
    /// Delete an uploaded bot
    Remove { name: String },
    /// Play a single match, use "human" to enter moves on stdin
    Play {
        #[arg(long)]
        black: String,
        #[arg(long)]
        white: String,
        #[arg(long)]
        size: Option<usize>,
    },
    /// Play a series between two bots with alternating colors
    Series {
        left: String,
        right: String,
        #[arg(long, default_value_t = 10)]
        games: u32,
        #[arg(long)]
        size: Option<usize>,
    },
    /// Show the most recent rejected uploads
    Quarantine {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ArenaConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    match cli.command {
        Command::DefaultConfig => print!("{}", ArenaConfig::default_toml()),
        Command::Vet { file } => vet(&file)?,
        Command::Upload { file } => upload(&config, &file)?,
        Command::Bots => {
            let bots = BotRegistry::open(&config.storage.uploads_dir)?;
            for record in bots.list() {
                match record.upload_time {
                    Some(time) => println!("{:<24} {:<9} {}", record.name, record.origin(), time.to_rfc3339()),
                    None => println!("{:<24} {}", record.name, record.origin()),
                }
            }
        }
        Command::Remove { name } => {
            let mut bots = BotRegistry::open(&config.storage.uploads_dir)?;
            bots.remove(&name)?;
            println!("Removed '{}'", name);
        }
        Command::Play { black, white, size } => play(&config, &black, &white, size)?,
        Command::Series {
            left,
            right,
            games,
            size,
        } => series(&config, &left, &right, games, size)?,
        Command::Quarantine { limit } => {
            let quarantine = Quarantine::open(&config.storage.quarantine_dir)?;
            for entry in quarantine.entries(Some(limit))? {
                println!(
                    "{} {} -> {}",
                    entry.timestamp.to_rfc3339(),
                    entry.filename,
                    entry.quarantine_path.display()
                );
                for violation in &entry.violations {
                    println!("  - {}", violation);
                }
            }
        }
    }

    Ok(())
}

fn file_name(file: &Path) -> Result<String> {
    match file.file_name().and_then(|n| n.to_str()) {
        Some(name) => Ok(name.to_owned()),
        None => bail!("'{}' has no valid file name", file.display()),
    }
}

fn vet(file: &Path) -> Result<()> {
    let source = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let report = SourceVetter::default().vet(&source, &file_name(file)?);

    if report.is_valid() {
        println!("{}: no violations", report.filename);
        return Ok(());
    }
    for violation in &report.violations {
        println!("{}: {}", report.filename, violation);
    }
    bail!("{} violation(s) found", report.violations.len())
}

fn upload(config: &ArenaConfig, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let mut bots = BotRegistry::open(&config.storage.uploads_dir)?;
    let quarantine = Quarantine::open(&config.storage.quarantine_dir)?;

    let info = RequestInfo {
        ip: None,
        user_agent: Some("arena-cli".to_owned()),
    };
    let record = bots.upload(&file_name(file)?, &bytes, &info, &SourceVetter::default(), &quarantine)?;
    println!("Uploaded '{}'", record.name);
    Ok(())
}

fn player(name: &str) -> PlayerKind {
    if name.eq_ignore_ascii_case("human") {
        PlayerKind::Human
    } else {
        PlayerKind::bot(name)
    }
}

fn play(config: &ArenaConfig, black: &str, white: &str, size: Option<usize>) -> Result<()> {
    let bots = BotRegistry::open(&config.storage.uploads_dir)?;
    let runtime = BotRuntime::from_config(&config.runtime);

    let mut match_config = MatchConfig::from_defaults(&config.matches, player(black), player(white));
    if let Some(size) = size {
        match_config.board_size = size;
    }

    let mut matches = MatchRegistry::new();
    let game = matches.create(match_config, &bots, &runtime)?;
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    while !game.is_over() {
        println!("{}", game.board());
        let color = game.current_player();

        if game.is_bot_turn() {
            match game.make_bot_move()? {
                BotTurn::Played { coord, elapsed, .. } => {
                    println!("{} ({}) plays {} in {:.3}s", color, game.player_label(color), coord, elapsed.as_secs_f32())
                }
                BotTurn::Forfeited { reason, .. } => println!("{}", reason),
            }
            continue;
        }

        println!("{} to move, enter 'row col':", color);
        let line = match lines.next() {
            Some(line) => line?,
            None => bail!("stdin closed before the match finished"),
        };
        let parsed: Vec<i64> = line.split_whitespace().filter_map(|s| s.parse().ok()).collect();
        match parsed.as_slice() {
            &[row, col] => {
                if let Err(e) = game.make_move(row, col) {
                    println!("{}", e);
                }
            }
            _ => println!("expected two integers"),
        }
    }

    println!("{}", game.board());
    let (black_count, white_count) = game.board().count_pieces();
    println!("{} ({} - {})", game.message().unwrap_or("Game over"), black_count, white_count);
    if let Some(winner) = game.outcome().and_then(|o| o.winner()) {
        println!("Winner: {} ({})", winner, game.player_label(winner));
    } else if game.outcome().is_some() {
        println!("Draw");
    }
    Ok(())
}

fn series(config: &ArenaConfig, left: &str, right: &str, games: u32, size: Option<usize>) -> Result<()> {
    let bots = BotRegistry::open(&config.storage.uploads_dir)?;
    let runtime = BotRuntime::from_config(&config.runtime);

    let result = bot_game::run(
        &bots,
        &runtime,
        left,
        right,
        games,
        |black, white| {
            let mut match_config = MatchConfig::from_defaults(&config.matches, black, white);
            if let Some(size) = size {
                match_config.board_size = size;
            }
            match_config
        },
        |wdl, replay| {
            let note = replay.forfeit.as_deref().unwrap_or("");
            println!("{}: {:?} {}", replay.id, wdl, note);
        },
    )?;

    println!("{:?}", result);
    Ok(())
}
