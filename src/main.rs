use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use khl_stats::api::types::ErrorBody;
use khl_stats::api::{create_router, AppState};
use khl_stats::bot::TelegramBot;
use khl_stats::config::{AppConfig, LoggingConfig};
use khl_stats::snapshot::write_snapshot;
use khl_stats::{
    lookup, IndexCache, IndexSource, KhlClient, Lookup, Mode, Season, SeasonKey, SnapshotSource,
    Suggestion,
};

#[derive(Debug, Parser)]
#[command(name = "khl-stats", version, about = "KHL player statistics for a Telegram mini app")]
struct Cli {
    /// Directory holding default.toml and per-environment overrides
    #[arg(long, env = "KHL_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Run the Telegram bot that opens the mini app
    Bot,
    /// Look up one player and print the result as JSON
    Lookup {
        name: String,
        /// Season as YYYY/YYYY (default: current season)
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        playoff: bool,
    },
    /// Scrape one season and write it as a JSON snapshot
    Snapshot {
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        playoff: bool,
        /// Output directory
        #[arg(long, default_value = "snapshots")]
        out: PathBuf,
    },
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));

    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn season_key(config: &AppConfig, season: Option<&str>, playoff: bool) -> Result<SeasonKey> {
    let season = match season {
        Some(s) => s.parse::<Season>()?,
        None => config.fallback_season(),
    };
    let mode = if playoff { Mode::Playoffs } else { Mode::Regular };
    Ok(SeasonKey::new(season, mode))
}

/// Snapshots when a snapshot directory is configured, the live site otherwise.
fn index_source(config: &AppConfig) -> Result<Arc<dyn IndexSource>> {
    let source: Arc<dyn IndexSource> = match &config.snapshot.dir {
        Some(dir) => {
            info!(?dir, "serving from snapshots");
            Arc::new(SnapshotSource::new(dir))
        }
        None => Arc::new(KhlClient::from_config(&config.source)?),
    };
    Ok(source)
}

async fn serve(config: AppConfig) -> Result<()> {
    let cache = IndexCache::with_capacity(index_source(&config)?, config.cache.max_seasons);
    let state = AppState::new(Arc::new(cache), config.default_season);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn run_lookup(config: AppConfig, name: &str, key: SeasonKey) -> Result<()> {
    let cache = IndexCache::new(index_source(&config)?);
    let index = cache.get(key).await?;
    let output = match lookup(&index, name) {
        Lookup::Found(record) => serde_json::to_string_pretty(record)?,
        Lookup::Ambiguous(candidates) => {
            serde_json::to_string_pretty(&ErrorBody {
                error: "Several players match, pick one".to_string(),
                candidates: Some(candidates.into_iter().map(Suggestion::from).collect()),
            })?
        }
        Lookup::NotFound => anyhow::bail!("player {name:?} not found in {key}"),
    };
    println!("{output}");
    Ok(())
}

async fn run_snapshot(config: AppConfig, key: SeasonKey, out: PathBuf) -> Result<()> {
    let client = KhlClient::from_config(&config.source)?;
    let records = client.get_season(key).await?;
    let path = write_snapshot(&out, &key, &records)?;
    info!(?path, players = records.len(), "snapshot written");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config_dir).context("failed to load configuration")?;
    init_logging(&config.logging);

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Bot => {
            let bot = TelegramBot::from_config(&config.bot)?;
            bot.run(shutdown_signal()).await;
            Ok(())
        }
        Command::Lookup {
            name,
            season,
            playoff,
        } => {
            let key = season_key(&config, season.as_deref(), playoff)?;
            run_lookup(config, &name, key).await
        }
        Command::Snapshot {
            season,
            playoff,
            out,
        } => {
            let key = season_key(&config, season.as_deref(), playoff)?;
            run_snapshot(config, key, out).await
        }
    }
}
