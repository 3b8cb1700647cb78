use clap::{Parser, Subcommand};
use diceland::web::{ServerConfig, run_server};
use diceland::{Game, GameConfig, simulate};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Diceland - capture every square with dice and allies
#[derive(Parser, Debug)]
#[command(name = "diceland")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the game over HTTP (default)
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Directory with the browser client
        #[arg(long, default_value = "static")]
        static_dir: PathBuf,

        /// JSON game config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Play computer-only games and report win rates
    Simulate {
        #[arg(short, long, default_value = "100")]
        games: usize,

        /// Seed of the first game (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON game config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Attacks before a game is abandoned
        #[arg(long, default_value = "10000")]
        max_attacks: usize,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<GameConfig, diceland::GameError> {
    match path {
        Some(path) => GameConfig::load(path),
        None => Ok(GameConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let command = args.command.unwrap_or(Commands::Serve {
        addr: ServerConfig::default().addr,
        static_dir: ServerConfig::default().static_dir,
        config: None,
        seed: None,
    });

    match command {
        Commands::Serve {
            addr,
            static_dir,
            config,
            seed,
        } => {
            println!("🎲 Diceland - Web Edition");
            println!("=========================");
            println!();

            let config = load_config(config)?;
            let game = match seed {
                Some(seed) => Game::with_seed(config, seed)?,
                None => Game::new(config)?,
            };
            run_server(ServerConfig { addr, static_dir }, game).await?;
        }
        Commands::Simulate {
            games,
            seed,
            config,
            max_attacks,
        } => {
            let config = load_config(config)?;
            let seed = seed.unwrap_or_else(rand::random);
            println!("Simulating {} games from seed {}", games, seed);

            let summary = simulate(&config, games, seed, max_attacks)?;
            summary.display();
        }
    }

    Ok(())
}
