use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vigil::{
    cmd::{report, ReportArgs},
    config::AppConfig,
    loader::SeedLoader,
    models::Event,
    persistence::sqlite::SqliteStore,
    supervisor::Supervisor,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the monitoring core, ingesting JSON events from stdin.
    Run,
    /// Prints an outage or downtime report for a check or tag.
    Report(ReportArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = AppConfig::new(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run_supervisor(config).await?,
        Commands::Report(args) => report::execute(args, &config).await?,
    }

    Ok(())
}

async fn run_supervisor(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(database_url = %config.database_url, "Initializing store...");
    let store = Arc::new(SqliteStore::new(&config.database_url).await?);
    store.run_migrations().await?;
    tracing::info!("Database migrations completed.");

    let seed_loader = SeedLoader::new(config.clone(), store.clone(), store.clone());
    seed_loader.run().await?;
    tracing::info!("Seed data loaded.");

    let supervisor = Supervisor::builder().config(config.clone()).store(store).build()?;

    let (events_tx, events_rx) = mpsc::channel::<Event>(config.channel_capacity);
    tokio::spawn(read_events_from_stdin(events_tx));

    tracing::info!("Supervisor initialized, processing events from stdin...");
    supervisor.run(events_rx).await;

    Ok(())
}

/// Reads one JSON event per line from stdin and forwards it to the
/// supervisor. Malformed lines are logged and skipped.
async fn read_events_from_stdin(events: mpsc::Sender<Event>) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Event>(line) {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping malformed event line.");
                    }
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read from stdin.");
                return;
            }
        }
    }
}
