//! Realtime settings resolved from the generic [`AppConfig`].
//!
//! The quote stream lives on the same origin as the REST API. Its scheme
//! follows the origin's: a dashboard served over `https` streams over `wss`.

use std::time::Duration;

use anyhow::Result;
use qs_core::config::AppConfig;
use qs_core::error::QsError;
use qs_core::types::normalize_ts_codes;
use url::Url;

/// Fully resolved realtime settings.
#[derive(Debug, Clone)]
pub struct RealtimeSettings {
    /// Log file prefix / display name.
    pub module_name: String,
    /// Quote stream endpoint, e.g. `ws://127.0.0.1:8000/ws/realtime`.
    pub ws_url: String,
    /// REST base, e.g. `http://127.0.0.1:8000/api/v1` (no trailing slash).
    pub api_base_url: String,
    /// Fixed delay between a close and the next connection attempt.
    pub reconnect_delay: Duration,
    /// REST request timeout.
    pub request_timeout: Duration,
    /// Normalized symbols to subscribe on start.
    pub symbols: Vec<String>,
    /// Also subscribe the server-side watchlist on start.
    pub seed_from_watchlist: bool,
    /// Monitor table refresh interval.
    pub refresh_interval: Duration,
}

impl RealtimeSettings {
    /// Resolve settings from an [`AppConfig`].
    pub fn from_app_config(cfg: &AppConfig) -> Result<Self> {
        let server = &cfg.server;
        let rt = cfg.realtime();

        let ws_url = ws_url_for_origin(&server.origin, server.effective_ws_path())?;
        let api_base_url = api_base_for_origin(&server.origin, server.effective_api_prefix())?;

        let reconnect_delay_ms = rt.effective_reconnect_delay_ms();
        if reconnect_delay_ms == 0 {
            return Err(QsError::Config("reconnect_delay_ms must be positive".into()).into());
        }

        Ok(Self {
            module_name: cfg.module_name(),
            ws_url,
            api_base_url,
            reconnect_delay: Duration::from_millis(reconnect_delay_ms),
            request_timeout: Duration::from_secs(server.effective_request_timeout_sec()),
            symbols: normalize_ts_codes(rt.effective_symbols()),
            seed_from_watchlist: rt.effective_seed_from_watchlist(),
            refresh_interval: Duration::from_millis(rt.effective_refresh_interval_ms().max(100)),
        })
    }
}

/// Derive the stream endpoint from the backend origin.
///
/// `http` → `ws`, `https` → `wss`; `ws`/`wss` origins are taken as-is. Any
/// path, query or fragment on the origin is replaced.
pub fn ws_url_for_origin(origin: &str, ws_path: &str) -> Result<String, QsError> {
    let mut url = parse_origin(origin)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(QsError::Config(format!("unsupported origin scheme '{other}' in {origin}"))),
    };
    url.set_scheme(scheme).map_err(|_| QsError::Config(format!("cannot switch {origin} to {scheme}")))?;
    url.set_path(ws_path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Derive the REST base URL from the backend origin.
pub fn api_base_for_origin(origin: &str, api_prefix: &str) -> Result<String, QsError> {
    let mut url = parse_origin(origin)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => return Err(QsError::Config(format!("unsupported origin scheme '{other}' in {origin}"))),
    };
    url.set_scheme(scheme).map_err(|_| QsError::Config(format!("cannot switch {origin} to {scheme}")))?;
    url.set_path(api_prefix);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string().trim_end_matches('/').to_string())
}

fn parse_origin(origin: &str) -> Result<Url, QsError> {
    let url = Url::parse(origin.trim()).map_err(|e| QsError::Config(format!("invalid origin '{origin}': {e}")))?;
    if url.host_str().is_none() {
        return Err(QsError::Config(format!("origin '{origin}' has no host")));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qs_core::config::parse_config;

    #[test]
    fn ws_scheme_follows_origin() {
        assert_eq!(ws_url_for_origin("http://127.0.0.1:8000", "/ws/realtime").unwrap(), "ws://127.0.0.1:8000/ws/realtime");
        assert_eq!(ws_url_for_origin("https://screener.example.com", "/ws/realtime").unwrap(), "wss://screener.example.com/ws/realtime");
        assert_eq!(ws_url_for_origin("wss://screener.example.com:9443", "/ws/realtime").unwrap(), "wss://screener.example.com:9443/ws/realtime");
    }

    #[test]
    fn origin_path_and_query_are_replaced() {
        let url = ws_url_for_origin("http://localhost:5173/monitor?tab=1#top", "/ws/realtime").unwrap();
        assert_eq!(url, "ws://localhost:5173/ws/realtime");
    }

    #[test]
    fn bad_origins() {
        assert!(matches!(ws_url_for_origin("ftp://host", "/ws"), Err(QsError::Config(_))));
        assert!(matches!(ws_url_for_origin("not a url", "/ws"), Err(QsError::Config(_))));
        assert!(api_base_for_origin("mailto:desk@example.com", "/api/v1").is_err());
    }

    #[test]
    fn api_base() {
        assert_eq!(api_base_for_origin("http://127.0.0.1:8000/", "/api/v1").unwrap(), "http://127.0.0.1:8000/api/v1");
        assert_eq!(api_base_for_origin("wss://screener.example.com", "/api/v1/").unwrap(), "https://screener.example.com/api/v1");
    }

    #[test]
    fn settings_from_config() {
        let cfg = parse_config(
            r#"{
                "server": { "origin": "https://screener.example.com" },
                "realtime": { "symbols": [" 600519.sh", "000001.SZ", ""], "reconnect_delay_ms": 3000 }
            }"#,
        )
        .unwrap();
        let s = RealtimeSettings::from_app_config(&cfg).unwrap();
        assert_eq!(s.ws_url, "wss://screener.example.com/ws/realtime");
        assert_eq!(s.api_base_url, "https://screener.example.com/api/v1");
        assert_eq!(s.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(s.request_timeout, Duration::from_secs(30));
        assert_eq!(s.symbols, vec!["600519.SH", "000001.SZ"]);
        assert!(s.seed_from_watchlist);
    }

    #[test]
    fn default_reconnect_delay_is_five_seconds() {
        let s = RealtimeSettings::from_app_config(&AppConfig::from_origin("http://127.0.0.1:8000")).unwrap();
        assert_eq!(s.reconnect_delay, Duration::from_millis(5_000));
        assert_eq!(s.ws_url, "ws://127.0.0.1:8000/ws/realtime");
    }

    #[test]
    fn zero_delay_rejected() {
        let cfg = parse_config(r#"{ "server": { "origin": "http://h" }, "realtime": { "reconnect_delay_ms": 0 } }"#).unwrap();
        assert!(RealtimeSettings::from_app_config(&cfg).is_err());
    }
}
