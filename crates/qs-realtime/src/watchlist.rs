//! REST client for the backend's realtime endpoints.
//!
//! The server watchlist is what the backend collector polls; the quote
//! channel only streams symbols that are on it.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RealtimeSettings;

/// `GET /realtime/status` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RealtimeStatus {
    /// Whether the backend collector is running.
    #[serde(default)]
    pub collecting: bool,
    #[serde(default)]
    pub watchlist_count: usize,
    /// Server watchlist, sorted.
    #[serde(default)]
    pub watchlist: Vec<String>,
    /// Stream clients currently attached to the backend.
    #[serde(default)]
    pub websocket_connections: usize,
    /// Watchlist capacity.
    #[serde(default)]
    pub max_stocks: usize,
}

/// `POST /realtime/watchlist` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchlistAddResult {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub watchlist_count: usize,
    /// Symbols refused because the watchlist is full.
    #[serde(default)]
    pub rejected: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `DELETE /realtime/watchlist` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchlistRemoveResult {
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub watchlist_count: usize,
}

#[derive(Serialize)]
struct WatchlistRequest<'a> {
    ts_codes: &'a [String],
}

/// Realtime REST client.
pub struct WatchlistClient {
    http: reqwest::Client,
    /// REST base URL (e.g. `http://127.0.0.1:8000/api/v1`).
    base_url: String,
}

impl WatchlistClient {
    /// Create a client for the REST base in `settings`.
    pub fn new(settings: &RealtimeSettings) -> Result<Self> {
        Self::with_base_url(settings.api_base_url.clone(), settings.request_timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().context("build HTTP client")?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Collector state and the server watchlist.
    pub async fn status(&self) -> Result<RealtimeStatus> {
        let url = format!("{}/realtime/status", self.base_url);
        let status: RealtimeStatus = self
            .http
            .get(&url)
            .send()
            .await
            .context("realtime status request failed")?
            .error_for_status()
            .context("realtime status HTTP error")?
            .json()
            .await
            .context("decode realtime status")?;

        debug!("[watchlist] server tracks {} symbol(s)", status.watchlist_count);
        Ok(status)
    }

    /// Add symbols to the server watchlist.
    pub async fn add(&self, ts_codes: &[String]) -> Result<WatchlistAddResult> {
        let url = format!("{}/realtime/watchlist", self.base_url);
        let result: WatchlistAddResult = self
            .http
            .post(&url)
            .json(&WatchlistRequest { ts_codes })
            .send()
            .await
            .context("add watchlist request failed")?
            .error_for_status()
            .context("add watchlist HTTP error")?
            .json()
            .await
            .context("decode add watchlist response")?;

        info!("[watchlist] added {} symbol(s), now {}", result.added.len(), result.watchlist_count);
        if !result.rejected.is_empty() {
            warn!(
                "[watchlist] rejected {:?}: {}",
                result.rejected,
                result.message.as_deref().unwrap_or("watchlist full")
            );
        }
        Ok(result)
    }

    /// Remove symbols from the server watchlist.
    pub async fn remove(&self, ts_codes: &[String]) -> Result<WatchlistRemoveResult> {
        let url = format!("{}/realtime/watchlist", self.base_url);
        let result: WatchlistRemoveResult = self
            .http
            .delete(&url)
            .json(&WatchlistRequest { ts_codes })
            .send()
            .await
            .context("remove watchlist request failed")?
            .error_for_status()
            .context("remove watchlist HTTP error")?
            .json()
            .await
            .context("decode remove watchlist response")?;

        info!("[watchlist] removed {} symbol(s), now {}", result.removed.len(), result.watchlist_count);
        Ok(result)
    }
}
