//! Configuration parsing for the realtime client.
//!
//! All settings come from a single JSON config file. The top-level structure
//! contains logging metadata, the backend `server` block (origin and paths),
//! and an optional `realtime` block tuning the quote channel and monitor.
//!
//! # Example config
//!
//! ```json
//! {
//!   "module": { "module_name": "qs-monitor", "log_path": "/tmp/log" },
//!   "server": { "origin": "http://127.0.0.1:8000" },
//!   "realtime": {
//!     "symbols": ["600519.SH", "000001.SZ"],
//!     "reconnect_delay_ms": 5000,
//!     "seed_from_watchlist": true
//!   }
//! }
//! ```

use serde::Deserialize;

/// Default WebSocket path on the backend origin.
pub const DEFAULT_WS_PATH: &str = "/ws/realtime";
/// Default REST API prefix on the backend origin.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
/// Fixed delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
/// REST request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;
/// Monitor table refresh interval.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2_000;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    pub module: Option<ModuleMeta>,

    /// Backend server location.
    pub server: ServerConfig,

    /// Quote channel and monitor settings.
    pub realtime: Option<RealtimeConfig>,
}

impl AppConfig {
    /// Build a config that only names the backend origin; everything else
    /// takes its default.
    pub fn from_origin(origin: impl Into<String>) -> Self {
        Self {
            module: None,
            server: ServerConfig {
                origin: origin.into(),
                ws_path: None,
                api_prefix: None,
                request_timeout_sec: None,
            },
            realtime: None,
        }
    }

    /// Returns the module name, defaulting to `"qs-monitor"`.
    pub fn module_name(&self) -> String {
        self.module
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| "qs-monitor".to_string())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.module.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Returns the realtime block, or an all-default one.
    pub fn realtime(&self) -> RealtimeConfig {
        self.realtime.clone().unwrap_or_default()
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// Where the backend lives.
///
/// The quote stream and the REST API share one origin; the stream scheme
/// follows the origin scheme (`http` → `ws`, `https` → `wss`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Backend origin, e.g. `http://127.0.0.1:8000`.
    pub origin: String,

    /// WebSocket endpoint path (default: `/ws/realtime`).
    pub ws_path: Option<String>,

    /// REST API prefix (default: `/api/v1`).
    pub api_prefix: Option<String>,

    /// REST request timeout in seconds (default: 30).
    pub request_timeout_sec: Option<u64>,
}

impl ServerConfig {
    pub fn effective_ws_path(&self) -> &str {
        self.ws_path.as_deref().unwrap_or(DEFAULT_WS_PATH)
    }

    pub fn effective_api_prefix(&self) -> &str {
        self.api_prefix.as_deref().unwrap_or(DEFAULT_API_PREFIX)
    }

    pub fn effective_request_timeout_sec(&self) -> u64 {
        self.request_timeout_sec.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SEC)
    }
}

/// Quote channel and monitor settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealtimeConfig {
    /// Symbols to subscribe on start (e.g. `["600519.SH"]`).
    pub symbols: Option<Vec<String>>,

    /// Delay between a close and the next connection attempt, in ms (default: 5000).
    pub reconnect_delay_ms: Option<u64>,

    /// Also subscribe the server-side watchlist on start (default: true).
    pub seed_from_watchlist: Option<bool>,

    /// Monitor table refresh interval in ms (default: 2000).
    pub refresh_interval_ms: Option<u64>,
}

impl RealtimeConfig {
    pub fn effective_symbols(&self) -> Vec<String> {
        self.symbols.clone().unwrap_or_default()
    }

    pub fn effective_reconnect_delay_ms(&self) -> u64 {
        self.reconnect_delay_ms.unwrap_or(DEFAULT_RECONNECT_DELAY_MS)
    }

    pub fn effective_seed_from_watchlist(&self) -> bool {
        self.seed_from_watchlist.unwrap_or(true)
    }

    pub fn effective_refresh_interval_ms(&self) -> u64 {
        self.refresh_interval_ms.unwrap_or(DEFAULT_REFRESH_INTERVAL_MS)
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse a JSON config document.
pub fn parse_config(content: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = serde_json::from_str(content)?;
    Ok(config)
}
