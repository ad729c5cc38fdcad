//! HTTP adapters for the external data providers: NewsAPI (primary news),
//! Yahoo Finance search (key-free fallback news) and the Yahoo Finance chart
//! endpoint (daily OHLCV history).

use analysis_core::NewsSourceError;
use reqwest::Client;
use std::time::Duration;

pub mod newsapi;
pub mod yahoo_chart;
pub mod yahoo_news;

pub use newsapi::NewsApiSource;
pub use yahoo_chart::YahooChartClient;
pub use yahoo_news::YahooNewsSource;

/// Summaries longer than this are cut and suffixed with `...`
pub const SUMMARY_MAX_CHARS: usize = 300;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub(crate) fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Map a transport-level reqwest failure onto the adapter error contract
pub(crate) fn transport_error(err: reqwest::Error) -> NewsSourceError {
    if err.is_timeout() {
        NewsSourceError::Timeout
    } else {
        NewsSourceError::Network(err.to_string())
    }
}

/// Trim, drop empty text and cap the length at [`SUMMARY_MAX_CHARS`] characters.
pub fn truncate_summary(summary: Option<&str>) -> Option<String> {
    let text = summary?.trim();
    if text.is_empty() {
        return None;
    }
    if text.chars().count() > SUMMARY_MAX_CHARS {
        let cut: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
        Some(format!("{}...", cut))
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_summary_caps_length() {
        let long = "x".repeat(SUMMARY_MAX_CHARS + 20);
        let cut = truncate_summary(Some(&long)).unwrap();
        assert_eq!(cut.chars().count(), SUMMARY_MAX_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_summary_keeps_short_text() {
        assert_eq!(truncate_summary(Some("  short  ")), Some("short".to_string()));
        assert_eq!(truncate_summary(Some("   ")), None);
        assert_eq!(truncate_summary(None), None);
    }
}
