//! Symbol (`ts_code`) utilities.
//!
//! Symbols are exchange-suffixed stock codes such as `600519.SH` or
//! `000001.SZ`. User input is normalized before it reaches the subscription
//! set so that `" 600519.sh"` and `"600519.SH"` track the same stock.

/// Normalize one user-supplied symbol: trim and upper-case.
///
/// Returns `None` for blank input.
pub fn normalize_ts_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() {
        return None;
    }
    Some(code.to_ascii_uppercase())
}

/// Normalize a batch of symbols, dropping blanks and repeated entries while
/// keeping first-seen order.
pub fn normalize_ts_codes<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for code in raw.into_iter().filter_map(|s| normalize_ts_code(s.as_ref())) {
        if !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

/// Split a free-form list (`"600519.SH, 000001.SZ 300750.SZ"`) into
/// normalized symbols. Commas, semicolons and whitespace all separate entries.
pub fn parse_ts_code_list(text: &str) -> Vec<String> {
    normalize_ts_codes(text.split(|c: char| c == ',' || c == ';' || c.is_whitespace()))
}
