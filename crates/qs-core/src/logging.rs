//! Logging initialization using the `tracing` ecosystem.
//!
//! Human-readable events go to stderr, since stdout carries the monitor's
//! quote table. With a log directory, the same events are also written as JSON
//! lines to a daily-rotating file through a non-blocking appender.
//!
//! `RUST_LOG` takes precedence over the level passed in.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the file writer alive. Hold it until the program exits or buffered
/// lines are lost.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber. Call once at program start.
///
/// - `log_level`: directives used when `RUST_LOG` is unset, e.g. `"info"` or
///   `"qs_realtime=debug"`
/// - `log_dir`: optional directory for daily-rotating JSON log files
/// - `module_name`: log file prefix (e.g. `"qs-monitor"`)
pub fn init_logging(log_level: &str, log_dir: Option<&str>, module_name: &str) -> Result<LogGuard> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(log_level, env.as_deref());

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init()
            .context("install tracing subscriber")?;
        return Ok(LogGuard { _file: None });
    };

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, module_name));
    let file_layer = fmt::layer().json().with_writer(writer).with_ansi(false).with_current_span(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(LogGuard { _file: Some(guard) })
}

/// Resolve the level filter. Unparseable directives fall back to `info`.
///
/// The socket and HTTP stacks log every frame at debug, so they are capped at
/// `info` unless named explicitly.
fn build_filter(log_level: &str, env: Option<&str>) -> EnvFilter {
    let directives = env.map(str::trim).filter(|d| !d.is_empty()).unwrap_or(log_level);
    let mut filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));

    for quiet in ["tungstenite=info", "tokio_tungstenite=info", "hyper_util=info", "reqwest=info"] {
        let target = quiet.split('=').next().unwrap_or_default();
        if !directives.contains(target) {
            if let Ok(d) = quiet.parse() {
                filter = filter.add_directive(d);
            }
        }
    }
    filter
}
