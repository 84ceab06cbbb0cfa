use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wl_cli::commands::{aggregate, history, mark, send, status};
use wl_cli::{Cli, Commands, Config};

/// Open the ledger, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<wl_db::Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    wl_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Aggregate(args) => aggregate::run(&mut out, args, &config)?,
        Commands::Send(args) => {
            let mut db = open_database(&config)?;
            send::run(&mut out, args, &config, &mut db)?;
        }
        Commands::Mark { entry } => {
            mark::run(entry, &config)?;
        }
        Commands::History(args) => {
            let db = open_database(&config)?;
            history::run(&mut out, args, &config, &db)?;
        }
        Commands::Status => {
            let db = open_database(&config)?;
            status::run(&mut out, &config, &db)?;
        }
    }

    Ok(())
}
