use async_trait::async_trait;
use chrono::NaiveDate;
use crate::{AnalysisError, NewsArticle, NewsSourceError, Quote};

/// A provider of news articles for a symbol over a date window
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Provider name reported in aggregated results, e.g. "NewsAPI"
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        symbol: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<NewsArticle>, NewsSourceError>;
}

/// A provider of daily OHLCV history
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Daily quotes for the `days` calendar days ending at `until`, oldest first
    async fn daily_history(
        &self,
        symbol: &str,
        until: NaiveDate,
        days: u32,
    ) -> Result<Vec<Quote>, AnalysisError>;

    async fn latest_quote(&self, symbol: &str) -> Result<Quote, AnalysisError>;
}
