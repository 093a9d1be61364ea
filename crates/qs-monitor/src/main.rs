//! # qs-monitor
//!
//! Terminal watchlist monitor for the stock screener's realtime quote feed.
//!
//! Streams quotes for the configured symbols (plus the server watchlist),
//! prints a refreshed table, and manages the server watchlist.
//!
//! # Usage
//!
//! ```bash
//! qs-monitor config.json --log-level info
//! qs-monitor --origin http://127.0.0.1:8000 status
//! qs-monitor --origin http://127.0.0.1:8000 add 600519.SH 000001.SZ
//! ```

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use qs_core::config::{AppConfig, load_config};
use qs_core::types::{normalize_ts_codes, parse_ts_code_list};
use qs_realtime::monitor::{build_rows, render_table, status_banner};
use qs_realtime::{ChannelConfig, QuoteChannel, RealtimeSettings, WatchlistClient};
use tracing::{info, warn};

/// Stock Screener Realtime Monitor.
#[derive(Parser)]
#[command(name = "qs-monitor", about = "Stock Screener Realtime Monitor")]
struct Cli {
    /// Configuration file path (JSON).
    config: Option<PathBuf>,

    /// Backend origin (e.g. http://127.0.0.1:8000); overrides the config file.
    #[arg(long)]
    origin: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Stream quotes and print the watchlist table (default).
    Watch,
    /// Print the server's realtime status.
    Status,
    /// Add symbols to the server watchlist.
    Add {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Remove symbols from the server watchlist.
    Remove {
        #[arg(required = true)]
        codes: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let mut config = match (&cli.config, &cli.origin) {
        (Some(path), _) => load_config(path)?,
        (None, Some(origin)) => AppConfig::from_origin(origin.clone()),
        (None, None) => bail!("either a config file or --origin is required"),
    };
    if let Some(origin) = &cli.origin {
        config.server.origin = origin.clone();
    }

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    let _log_guard = qs_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name())?;

    let settings = RealtimeSettings::from_app_config(&config)?;
    info!("qs-monitor starting, stream={}, api={}", settings.ws_url, settings.api_base_url);

    // 3. Dispatch
    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(&settings).await,
        Command::Status => print_status(&settings).await,
        Command::Add { codes } => add(&settings, &codes).await,
        Command::Remove { codes } => remove(&settings, &codes).await,
    }
}

async fn watch(settings: &RealtimeSettings) -> Result<()> {
    let client = WatchlistClient::new(settings)?;

    let mut watchlist = settings.symbols.clone();
    if settings.seed_from_watchlist {
        match client.status().await {
            Ok(status) => watchlist.extend(status.watchlist),
            Err(e) => warn!("[monitor] server watchlist unavailable, using configured symbols: {e:#}"),
        }
    }
    let watchlist = normalize_ts_codes(watchlist);
    info!("[monitor] watching {} symbol(s)", watchlist.len());

    let channel = QuoteChannel::new(ChannelConfig::from(settings));
    channel.subscribe(&watchlist);
    channel.connect();

    let mut status_rx = channel.status_watch();
    let mut ticker = tokio::time::interval(settings.refresh_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("[monitor] press Ctrl+C to stop");
    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res?;
                info!("shutdown signal received");
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *status_rx.borrow_and_update();
                match status_banner(status, Some(settings.reconnect_delay)) {
                    Some(banner) => warn!("[monitor] {banner}"),
                    None => info!("[monitor] connected"),
                }
            }
            _ = ticker.tick() => {
                let rows = build_rows(&watchlist, &channel.quotes());
                if let Some(banner) = status_banner(channel.status(), Some(settings.reconnect_delay)) {
                    println!("[{banner}]");
                }
                println!("{}", render_table(&rows));
            }
        }
    }

    channel.disconnect();
    info!("qs-monitor stopped");
    Ok(())
}

async fn print_status(settings: &RealtimeSettings) -> Result<()> {
    let status = WatchlistClient::new(settings)?.status().await?;
    println!("collecting:            {}", status.collecting);
    println!("watchlist:             {}/{}", status.watchlist_count, status.max_stocks);
    println!("websocket connections: {}", status.websocket_connections);
    for code in &status.watchlist {
        println!("  {code}");
    }
    Ok(())
}

async fn add(settings: &RealtimeSettings, codes: &[String]) -> Result<()> {
    let codes = parse_ts_code_list(&codes.join(" "));
    if codes.is_empty() {
        bail!("no symbols given");
    }
    let result = WatchlistClient::new(settings)?.add(&codes).await?;
    println!("added {:?}, watchlist now {}", result.added, result.watchlist_count);
    if !result.rejected.is_empty() {
        println!("rejected {:?}: {}", result.rejected, result.message.unwrap_or_default());
    }
    Ok(())
}

async fn remove(settings: &RealtimeSettings, codes: &[String]) -> Result<()> {
    let codes = parse_ts_code_list(&codes.join(" "));
    if codes.is_empty() {
        bail!("no symbols given");
    }
    let result = WatchlistClient::new(settings)?.remove(&codes).await?;
    println!("removed {:?}, watchlist now {}", result.removed, result.watchlist_count);
    Ok(())
}
