use std::process::ExitCode;

use clap::Parser as _;
use clap_derive::{Parser, Subcommand};
use healthcast::config::Configuration;
use healthcast::database::Database;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Create the database and apply migrations.
    Setup,
    /// Send the weather and health digest to every user with a saved city.
    Alerts {
        /// Log digests instead of sending them.
        #[clap(long)]
        dry_run: bool,
    },
}

async fn run(cmd: Commands) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Configuration::default().read()?;

    match cmd {
        Commands::Setup => {
            let db = Database::new(&config.database.url, config.database.pool_size).await?;
            db.migrate().await?;
            println!("Database {:?} is ready.", config.database.url);
        },
        Commands::Alerts { dry_run } => {
            let state = healthcast::initialize_state(config).await?;
            let summary = healthcast::alerts::run(&state, dry_run).await?;
            println!(
                "Alerts finished: {} user(s) with a city, {} delivered, {} failed.",
                summary.users, summary.delivered, summary.failed
            );
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args.cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        },
    }
}
