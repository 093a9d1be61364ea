//! Terminal watchlist view over the quote channel's state.
//!
//! Pure functions: the caller snapshots the watchlist, quote book and status
//! and gets back text.

use std::fmt::Write as _;
use std::time::Duration;

use qs_core::types::{ConnectionStatus, QuoteBook, RealtimeQuote};

/// Direction of a symbol's move vs. the previous close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_pct_chg(pct_chg: Option<f64>) -> Self {
        match pct_chg {
            Some(p) if p > 0.0 => Self::Up,
            Some(p) if p < 0.0 => Self::Down,
            _ => Self::Flat,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Flat => " ",
        }
    }
}

/// One table row. `quote` is `None` until the first snapshot arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistRow {
    pub ts_code: String,
    pub quote: Option<RealtimeQuote>,
}

impl WatchlistRow {
    pub fn trend(&self) -> Trend {
        Trend::from_pct_chg(self.quote.as_ref().and_then(|q| q.pct_chg()))
    }

    fn cells(&self) -> [String; 7] {
        let q = self.quote.as_ref();
        [
            self.ts_code.clone(),
            format!("{} {}", fmt_price(q.and_then(|q| q.close())), self.trend().marker()),
            fmt_pct(q.and_then(|q| q.pct_chg())),
            fmt_price(q.and_then(|q| q.open())),
            fmt_price(q.and_then(|q| q.high())),
            fmt_price(q.and_then(|q| q.low())),
            fmt_lots(q.and_then(|q| q.vol())),
        ]
    }
}

/// Rows in watchlist order.
pub fn build_rows(watchlist: &[String], quotes: &QuoteBook) -> Vec<WatchlistRow> {
    watchlist
        .iter()
        .map(|code| WatchlistRow { ts_code: code.clone(), quote: quotes.get(code).cloned() })
        .collect()
}

pub fn fmt_price(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

/// `+1.23%`, `-0.50%`, `0.00%`.
pub fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(v) if v > 0.0 => format!("+{v:.2}%"),
        Some(v) => format!("{v:.2}%"),
        None => "-".to_string(),
    }
}

/// Volume in lots of 100 shares.
pub fn fmt_lots(vol: Option<f64>) -> String {
    match vol {
        Some(v) => format!("{}", (v / 100.0).round() as i64),
        None => "-".to_string(),
    }
}

/// Banner shown above the table; `None` while connected.
///
/// `retry_in` is the pending reconnect delay, or `None` when the channel was
/// disconnected on purpose and will not retry.
pub fn status_banner(status: ConnectionStatus, retry_in: Option<Duration>) -> Option<String> {
    match status {
        ConnectionStatus::Connected => None,
        ConnectionStatus::Connecting => Some("connecting...".to_string()),
        ConnectionStatus::Disconnected => match retry_in {
            Some(delay) => {
                let secs = delay.as_millis().div_ceil(1000);
                Some(format!("disconnected, reconnecting in {secs}s"))
            }
            None => Some("disconnected".to_string()),
        },
    }
}

const HEADERS: [&str; 7] = ["Code", "Last", "Chg%", "Open", "High", "Low", "Vol(lots)"];

/// Render rows as a fixed-width text table. Numbers are right-aligned.
pub fn render_table(rows: &[WatchlistRow]) -> String {
    if rows.is_empty() {
        return "(watchlist is empty)\n".to_string();
    }

    let cells: Vec<[String; 7]> = rows.iter().map(WatchlistRow::cells).collect();
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_line(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &cells {
        write_line(&mut out, row, &widths);
    }
    out
}

fn write_line(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let mut parts = Vec::with_capacity(cells.len());
    for (i, (cell, w)) in cells.iter().zip(widths).enumerate() {
        // chars().count() keeps the trend markers aligned.
        let pad = w.saturating_sub(cell.chars().count());
        if i == 0 {
            parts.push(format!("{cell}{}", " ".repeat(pad)));
        } else {
            parts.push(format!("{}{cell}", " ".repeat(pad)));
        }
    }
    let _ = writeln!(out, "{}", parts.join("  ").trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(json: &str) -> RealtimeQuote {
        serde_json::from_str(json).unwrap()
    }

    fn book() -> QuoteBook {
        let mut book = QuoteBook::default();
        let q = quote(r#"{"ts_code":"600519.SH","close":1705.5,"pct_chg":0.32,"open":1700,"high":1710.2,"low":1698,"vol":1234567}"#);
        book.insert(q.ts_code().to_string(), q);
        let q = quote(r#"{"ts_code":"000001.SZ","close":"10.52","pct_chg":"-1.5"}"#);
        book.insert(q.ts_code().to_string(), q);
        book
    }

    #[test]
    fn rows_follow_watchlist_order_with_placeholders() {
        let watchlist = vec!["000001.SZ".to_string(), "300750.SZ".to_string(), "600519.SH".to_string()];
        let rows = build_rows(&watchlist, &book());
        let codes: Vec<&str> = rows.iter().map(|r| r.ts_code.as_str()).collect();
        assert_eq!(codes, vec!["000001.SZ", "300750.SZ", "600519.SH"]);
        assert!(rows[1].quote.is_none());
        assert_eq!(rows[0].trend(), Trend::Down);
        assert_eq!(rows[1].trend(), Trend::Flat);
        assert_eq!(rows[2].trend(), Trend::Up);
    }

    #[test]
    fn trend_from_pct_chg() {
        assert_eq!(Trend::from_pct_chg(Some(0.01)), Trend::Up);
        assert_eq!(Trend::from_pct_chg(Some(-2.0)), Trend::Down);
        assert_eq!(Trend::from_pct_chg(Some(0.0)), Trend::Flat);
        assert_eq!(Trend::from_pct_chg(None), Trend::Flat);
    }

    #[test]
    fn formatting() {
        assert_eq!(fmt_price(Some(1705.5)), "1705.50");
        assert_eq!(fmt_price(None), "-");
        assert_eq!(fmt_pct(Some(1.234)), "+1.23%");
        assert_eq!(fmt_pct(Some(-0.5)), "-0.50%");
        assert_eq!(fmt_pct(Some(0.0)), "0.00%");
        assert_eq!(fmt_pct(None), "-");
        assert_eq!(fmt_lots(Some(1_234_567.0)), "12346");
        assert_eq!(fmt_lots(None), "-");
    }

    #[test]
    fn banner_per_status() {
        let retry = Some(Duration::from_millis(5_000));
        assert_eq!(status_banner(ConnectionStatus::Connected, retry), None);
        assert_eq!(status_banner(ConnectionStatus::Connecting, retry).as_deref(), Some("connecting..."));
        assert_eq!(
            status_banner(ConnectionStatus::Disconnected, retry).as_deref(),
            Some("disconnected, reconnecting in 5s")
        );
    }

    #[test]
    fn banner_without_pending_retry() {
        assert_eq!(status_banner(ConnectionStatus::Disconnected, None).as_deref(), Some("disconnected"));
        assert_eq!(status_banner(ConnectionStatus::Connected, None), None);
    }

    #[test]
    fn renders_aligned_table() {
        let watchlist = vec!["600519.SH".to_string(), "300750.SZ".to_string()];
        let table = render_table(&build_rows(&watchlist, &book()));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Code"));
        assert!(lines[1].starts_with("---------"));
        assert!(lines[2].starts_with("600519.SH"));
        assert!(lines[2].contains("1705.50 ▲"));
        assert!(lines[2].contains("+0.32%"));
        assert!(lines[2].ends_with("12346"));
        assert!(lines[3].starts_with("300750.SZ"));
        assert!(lines[3].ends_with('-'));
        assert_eq!(lines[2].chars().count(), lines[0].chars().count());
    }

    #[test]
    fn empty_watchlist() {
        assert_eq!(render_table(&[]), "(watchlist is empty)\n");
    }
}
