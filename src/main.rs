//! Binary entrypoint for the NenQuest CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the game store
//! - `play --owner <id>` - run the text command loop on stdin/stdout as `<id>`
//! - `status` - print store and catalogue counts
//! - `seed` - replace the enemy/loot catalogue from the configured seed files
//!
//! See the library crate docs for module-level details: `nenquest::`.
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use nenquest::config::{Config, GameConfig};
use nenquest::game::catalogue::{
    default_enemies, default_loot, load_enemies_from_json, load_loot_from_json,
};
use nenquest::game::types::{EnemyTemplate, LootTemplate};
use nenquest::game::{CommandProcessor, GameService, GameStoreBuilder, Location};
use nenquest::metrics;

#[derive(Parser)]
#[command(name = "nenquest")]
#[command(about = "A text-chat RPG bot with dice-roll combat")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the store
    Init,
    /// Play from the terminal, one command per line
    Play {
        /// Chat user id that owns the characters
        #[arg(short, long, default_value = "console")]
        owner: String,
    },
    /// Show store statistics
    Status,
    /// Replace the enemy and loot catalogue
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new NenQuest configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            let cfg = Config::default();
            let store = GameStoreBuilder::new(&cfg.game.data_dir).open()?;
            info!(
                "Game store ready at {} ({} characters)",
                cfg.game.data_dir,
                store.count_characters()
            );
        }
        Commands::Play { owner } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting NenQuest v{}", env!("CARGO_PKG_VERSION"));
            let (enemies, loot) = load_catalogue(&config.game)?;
            let store = GameStoreBuilder::new(&config.game.data_dir)
                .with_catalogue(enemies, loot)
                .open()?;
            let service = Arc::new(GameService::new(store, config.game.clone()));
            run_console(CommandProcessor::new(service), owner).await?;
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let store = GameStoreBuilder::new(&config.game.data_dir).open()?;
            println!("{} status", config.game.name);
            println!("  data dir:   {}", config.game.data_dir);
            println!("  characters: {}", store.count_characters());
            for location in Location::ALL {
                println!(
                    "  {:<24} {:>3} enemies {:>3} loot",
                    location.name(),
                    store.enemies_in(location)?.len(),
                    store.loot_in(location)?.len()
                );
            }
        }
        Commands::Seed => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let (enemies, loot) = load_catalogue(&config.game)?;
            let store = GameStoreBuilder::new(&config.game.data_dir)
                .without_catalogue_seed()
                .open()?;
            let written = store.replace_catalogue(&enemies, &loot)?;
            info!("Catalogue replaced: {} templates", written);
            println!("Seeded {} enemies and {} loot items.", enemies.len(), loot.len());
        }
    }

    Ok(())
}

/// Built-in catalogues unless the config points at seed files.
fn load_catalogue(game: &GameConfig) -> Result<(Vec<EnemyTemplate>, Vec<LootTemplate>)> {
    let enemies = match &game.enemy_seed_file {
        Some(path) => load_enemies_from_json(path)?,
        None => default_enemies()?,
    };
    let loot = match &game.loot_seed_file {
        Some(path) => load_loot_from_json(path)?,
        None => default_loot()?,
    };
    Ok((enemies, loot))
}

async fn run_console(processor: CommandProcessor, owner: String) -> Result<()> {
    let processor = Arc::new(processor);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut sweep = tokio::time::interval(std::time::Duration::from_secs(60));

    stdout
        .write_all(b"Welcome to NenQuest. Type HELP for commands, QUIT to exit.\n> ")
        .await?;
    stdout.flush().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim().to_string();
                if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    break;
                }
                if !line.is_empty() {
                    let p = processor.clone();
                    let who = owner.clone();
                    let reply = tokio::task::spawn_blocking(move || p.handle(&who, &line)).await?;
                    stdout.write_all(reply.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
            }
            _ = sweep.tick() => {
                let expired = processor.service().engine().expire_idle_now();
                if !expired.is_empty() {
                    warn!("dropped {} idle encounter(s)", expired.len());
                }
            }
        }
    }

    let stats = metrics::snapshot();
    info!(
        "Session over: commands={} errors={} encounters={} victories={} defeats={}",
        stats.commands, stats.command_errors, stats.encounters_started, stats.victories, stats.defeats
    );
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Console output only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
