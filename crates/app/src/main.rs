use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tariffscan_ocr::ScanConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod commit;
mod replay;

use commit::Committer;
use replay::{ReplayOptions, ReplayRecognizer};

#[derive(Parser)]
#[command(name = "tariffscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reads HS codes and item names off customs declarations", long_about = None)]
struct Cli {
    /// Scan configuration (TOML); defaults to the user config dir
    #[arg(long, global = true, env = "TARIFFSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Scan database; defaults to the user data dir
    #[arg(long, global = true, env = "TARIFFSCAN_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed recorded pages through the live scanning pipeline
    Replay {
        /// Recorded pages, one JSON object per line
        frames_file: PathBuf,

        /// Simulated camera frame rate
        #[arg(long, default_value_t = 30)]
        fps: u32,

        /// Number of frames to capture
        #[arg(long, default_value_t = 300)]
        frames: u64,

        /// Save the last seen result when the session ends
        #[arg(long)]
        save_last: bool,

        /// Never write to the database
        #[arg(long)]
        no_commit: bool,
    },
    /// Extract items from a single recorded page
    Extract {
        page_file: PathBuf,

        #[arg(long)]
        save: bool,
    },
    /// Show the most recent scans
    List {
        #[arg(long, default_value_t = tariffscan_storage::DEFAULT_LIST_LIMIT)]
        limit: i64,
    },
    /// Find scans by code or name
    Search { query: String },
    /// Delete all scans
    Clear,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "tariffscan", "TariffScan")
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<ScanConfig> {
    if let Some(path) = explicit {
        return ScanConfig::load(path).with_context(|| format!("loading {}", path.display()));
    }
    let default_path = project_dirs().map(|d| d.config_dir().join("tariffscan.toml"));
    match default_path {
        Some(path) if path.exists() => {
            tracing::info!("Using config {}", path.display());
            ScanConfig::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        _ => Ok(ScanConfig::default()),
    }
}

async fn open_committer(explicit: Option<&Path>) -> anyhow::Result<Committer> {
    let db_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let dirs = project_dirs().context("no home directory for the scan database")?;
            let data_dir = dirs.data_dir().to_path_buf();
            std::fs::create_dir_all(&data_dir)
                .with_context(|| format!("creating {}", data_dir.display()))?;
            data_dir.join("scans.db")
        }
    };
    tracing::debug!("Opening {}", db_path.display());
    let pool = tariffscan_storage::create_db(&db_path)
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;
    Ok(Committer::new(pool))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay { frames_file, fps, frames, save_last, no_commit } => {
            let recognizer = ReplayRecognizer::load(&frames_file)?;
            if recognizer.is_empty() {
                tracing::warn!("{} holds no pages", frames_file.display());
            } else {
                tracing::info!(pages = recognizer.len(), "Replaying {}", frames_file.display());
            }
            let mut committer = if no_commit {
                None
            } else {
                Some(open_committer(cli.db.as_deref()).await?)
            };
            let options = ReplayOptions { fps, frames, save_last };
            let summary = replay::run_replay(recognizer, &config, &options, committer.as_mut()).await?;
            println!(
                "{} frame(s) accepted, {} dropped, {} failed, {} item(s) saved",
                summary.submitted, summary.dropped, summary.failed, summary.saved
            );
        }
        Commands::Extract { page_file, save } => {
            let mut committer = if save {
                Some(open_committer(cli.db.as_deref()).await?)
            } else {
                None
            };
            commands::extract(&config, &page_file, committer.as_mut()).await?;
        }
        Commands::List { limit } => {
            let committer = open_committer(cli.db.as_deref()).await?;
            commands::list(committer.pool(), limit).await?;
        }
        Commands::Search { query } => {
            let committer = open_committer(cli.db.as_deref()).await?;
            commands::search(committer.pool(), &query).await?;
        }
        Commands::Clear => {
            let mut committer = open_committer(cli.db.as_deref()).await?;
            commands::clear(&mut committer).await?;
        }
    }

    Ok(())
}
