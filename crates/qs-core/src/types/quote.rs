//! Realtime quote snapshot: the payload pushed by the quote feed.
//!
//! The backend forwards whatever the collector produced for a symbol, so only
//! `ts_code` is guaranteed. The snapshot is the inbound object itself, kept
//! verbatim; the typed accessors read it leniently (numeric strings count,
//! junk reads as absent) without rewriting what was received.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json_util::{parse_str_f64, parse_str_string};

/// Latest known state of one symbol.
///
/// Serializes back to exactly the object it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct RealtimeQuote {
    ts_code: String,
    fields: Map<String, Value>,
}

impl RealtimeQuote {
    /// Wrap an inbound object. `None` unless it carries a non-empty string
    /// `ts_code`.
    pub fn from_map(fields: Map<String, Value>) -> Option<Self> {
        let ts_code = fields.get("ts_code")?.as_str().filter(|c| !c.is_empty())?.to_string();
        Some(Self { ts_code, fields })
    }

    /// A quote carrying only its symbol (no data received yet).
    pub fn empty(ts_code: impl Into<String>) -> Self {
        let ts_code = ts_code.into();
        let mut fields = Map::new();
        fields.insert("ts_code".to_string(), Value::String(ts_code.clone()));
        Self { ts_code, fields }
    }

    /// Symbol identifier, e.g. `600519.SH`.
    pub fn ts_code(&self) -> &str {
        &self.ts_code
    }

    /// Raw value of any field, as received.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The inbound object, as received.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn number(&self, key: &str) -> Option<f64> {
        parse_str_f64(self.fields.get(key))
    }

    /// Trade date; shows up both as `"20240105"` and `20240105`.
    pub fn trade_date(&self) -> Option<String> {
        parse_str_string(self.fields.get("trade_date"))
    }

    pub fn open(&self) -> Option<f64> {
        self.number("open")
    }

    pub fn high(&self) -> Option<f64> {
        self.number("high")
    }

    pub fn low(&self) -> Option<f64> {
        self.number("low")
    }

    /// Last price.
    pub fn close(&self) -> Option<f64> {
        self.number("close")
    }

    pub fn pre_close(&self) -> Option<f64> {
        self.number("pre_close")
    }

    /// Absolute change vs. `pre_close`.
    pub fn change(&self) -> Option<f64> {
        self.number("change")
    }

    /// Percent change vs. `pre_close` (already in percent, `1.5` = +1.5%).
    pub fn pct_chg(&self) -> Option<f64> {
        self.number("pct_chg")
    }

    /// Volume in shares.
    pub fn vol(&self) -> Option<f64> {
        self.number("vol")
    }

    /// Turnover.
    pub fn amount(&self) -> Option<f64> {
        self.number("amount")
    }
}

impl TryFrom<Map<String, Value>> for RealtimeQuote {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(fields).ok_or_else(|| "quote needs a non-empty string ts_code".to_string())
    }
}

impl From<RealtimeQuote> for Map<String, Value> {
    fn from(q: RealtimeQuote) -> Self {
        q.fields
    }
}

impl std::fmt::Display for RealtimeQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.close(), self.pct_chg()) {
            (Some(close), Some(pct)) => write!(f, "Quote({} close={close:.2} pct={pct:+.2}%)", self.ts_code),
            (Some(close), None) => write!(f, "Quote({} close={close:.2})", self.ts_code),
            _ => write!(f, "Quote({} -)", self.ts_code),
        }
    }
}

/// Per-symbol snapshot store. Values are replaced wholesale, never merged.
pub type QuoteBook = AHashMap<String, RealtimeQuote>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_accessors_read_leniently() {
        let q: RealtimeQuote = serde_json::from_str(
            r#"{"ts_code":"600519.SH","close":1700.0,"pct_chg":"1.25","vol":12345,
                "trade_date":20240105,"name":"Kweichow Moutai","bid1":1699.9}"#,
        )
        .unwrap();
        assert_eq!(q.ts_code(), "600519.SH");
        assert_eq!(q.close(), Some(1700.0));
        assert_eq!(q.pct_chg(), Some(1.25));
        assert_eq!(q.vol(), Some(12345.0));
        assert_eq!(q.trade_date().as_deref(), Some("20240105"));
        assert_eq!(q.open(), None);
        assert_eq!(q.get("name").and_then(|v| v.as_str()), Some("Kweichow Moutai"));
        assert!(q.get("bid1").is_some());
    }

    #[test]
    fn null_and_junk_numbers_read_as_absent() {
        let q: RealtimeQuote = serde_json::from_str(r#"{"ts_code":"000001.SZ","close":null,"high":"--"}"#).unwrap();
        assert_eq!(q.close(), None);
        assert_eq!(q.high(), None);
        assert_eq!(q.get("high"), Some(&json!("--")));
    }

    #[test]
    fn serializes_back_to_the_inbound_object() {
        let inbound = json!({"ts_code":"600519.SH","high":"--","close":"1700.50","trade_date":20240105,"vol":null});
        let q: RealtimeQuote = serde_json::from_value(inbound.clone()).unwrap();
        assert_eq!(serde_json::to_value(&q).unwrap(), inbound);
    }

    #[test]
    fn needs_a_string_ts_code() {
        assert!(serde_json::from_str::<RealtimeQuote>(r#"{"close":1.0}"#).is_err());
        assert!(serde_json::from_str::<RealtimeQuote>(r#"{"ts_code":""}"#).is_err());
        assert!(serde_json::from_str::<RealtimeQuote>(r#"{"ts_code":600519}"#).is_err());
        assert!(serde_json::from_str::<RealtimeQuote>("[]").is_err());
    }

    #[test]
    fn empty_quote() {
        let q = RealtimeQuote::empty("300750.SZ");
        assert_eq!(serde_json::to_value(&q).unwrap(), json!({"ts_code": "300750.SZ"}));
        assert_eq!(q.close(), None);
    }

    #[test]
    fn display() {
        assert_eq!(RealtimeQuote::empty("600519.SH").to_string(), "Quote(600519.SH -)");
        let q: RealtimeQuote = serde_json::from_str(r#"{"ts_code":"600519.SH","close":1705.5,"pct_chg":0.32}"#).unwrap();
        assert_eq!(q.to_string(), "Quote(600519.SH close=1705.50 pct=+0.32%)");
    }
}
