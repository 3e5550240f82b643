use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mealweek::commands::{AppContext, ConfigCommand, MigrateCommand, SyncCommand, WeekCommand};
use mealweek::config::Config;

#[derive(Parser)]
#[command(name = "mealweek")]
#[command(version)]
#[command(about = "Weekly meal delivery planning and sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect, lock, and unlock delivery weeks
    Week(WeekCommand),

    /// Push state and inspect sync health
    Sync(SyncCommand),

    /// One-time migration from the JSON tree to the relational store
    Migrate(MigrateCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mealweek=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Week(cmd)) => {
            let mut ctx = AppContext::open(&config).await;
            cmd.run(&mut ctx).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let mut ctx = AppContext::open(&config).await;
            cmd.run(&mut ctx).await?;
        }
        Some(Commands::Migrate(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
