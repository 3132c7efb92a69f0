//! music2db - keeps a remote music catalog in sync with a local library.

mod settings;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use core_runtime::logging::init_logging;
use core_service::Music2Db;
use core_sync::{CycleState, DEFAULT_SEARCH_LIMIT};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "music2db")]
#[command(about = "Scan a music library and sync its metadata to a remote catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "MUSIC2DB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync agent on its daily schedule
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        run_once: bool,
        /// Skip the cycle that normally runs at startup
        #[arg(long)]
        dont_scan_now: bool,
    },
    /// Print the payload a file would be sent as
    ShowMetadata {
        /// Audio file to read
        file: PathBuf,
        /// Also send it through the one-track endpoint
        #[arg(long)]
        send: bool,
    },
    /// Search the remote catalog by tags
    Search {
        /// Tags to match, e.g. "indie rock"
        tags: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = settings::load(cli.config.as_deref())?;
    init_logging(config.logging_config()).context("failed to initialize logging")?;

    let agent = Music2Db::new(config).context("failed to start agent")?;

    match cli.command {
        Commands::Run {
            run_once,
            dont_scan_now,
        } => run(agent, run_once, dont_scan_now).await,
        Commands::ShowMetadata { file, send } => show_metadata(&agent, file, send).await,
        Commands::Search { tags, limit } => search(&agent, &tags, limit).await,
    }
}

async fn run(agent: Music2Db, run_once: bool, dont_scan_now: bool) -> Result<()> {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested");
        signal_token.cancel();
    });

    if run_once {
        let cycle = agent.run_once(shutdown).await;
        return match cycle.state {
            CycleState::Failed => bail!(
                "cycle failed: {}",
                cycle.error_message.unwrap_or_default()
            ),
            state => {
                info!(%state, synced = cycle.counts.synced, "Single cycle finished");
                Ok(())
            }
        };
    }

    let run_on_startup = agent.config().run_on_startup && !dont_scan_now;
    let scheduler = agent.scheduler(shutdown)?;
    info!(scan_time = %scheduler.scan_time(), run_on_startup, "Agent started");
    scheduler.run(run_on_startup).await;
    Ok(())
}

async fn show_metadata(agent: &Music2Db, file: PathBuf, send: bool) -> Result<()> {
    let file = file
        .canonicalize()
        .with_context(|| format!("cannot open {}", file.display()))?;
    let track = agent.extract(&file)?;

    println!("{}", serde_json::to_string_pretty(&agent.payload(&track))?);

    if send {
        match agent.send_track(&track).await? {
            Some(message) => println!("{}", message),
            None => println!("Sent."),
        }
    }
    Ok(())
}

async fn search(agent: &Music2Db, tags: &str, limit: u32) -> Result<()> {
    let paths = agent.search(tags, limit).await?;
    if paths.is_empty() {
        warn!(tags, "No tracks found");
    }
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
