use analysis_core::{
    AggregatedNews, NewsArticle, NewsConfig, NewsSource, NewsSourceError, SourceLabel,
};
use chrono::{Duration, NaiveDate};
use dashmap::DashSet;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Merges articles from an ordered chain of news sources.
///
/// Index 0 is the primary tier; every later source is fallback. Sources are
/// consulted in order until `min_articles` distinct articles are collected or
/// the chain is exhausted. A source with a missing credential, or a primary
/// that reports a rate limit, is skipped for the rest of this aggregator's
/// lifetime. Fallback rate limits are treated as transient.
pub struct NewsAggregator {
    sources: Vec<Arc<dyn NewsSource>>,
    /// Indices into `sources` that must not be called again
    suppressed: DashSet<usize>,
    lookback_days: i64,
    min_articles: usize,
    max_articles: usize,
    source_timeout: std::time::Duration,
}

impl NewsAggregator {
    pub fn new(sources: Vec<Arc<dyn NewsSource>>, config: &NewsConfig) -> Self {
        Self {
            sources,
            suppressed: DashSet::new(),
            lookback_days: config.lookback_days,
            min_articles: config.min_articles,
            max_articles: config.max_articles,
            source_timeout: config.source_timeout(),
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn is_suppressed(&self, name: &str) -> bool {
        self.sources
            .iter()
            .enumerate()
            .any(|(idx, s)| s.name() == name && self.suppressed.contains(&idx))
    }

    /// Collect news for `symbol` over `[date - lookback_days, date]`.
    ///
    /// Source failures never surface; when nothing usable comes back the result
    /// is empty with label `None`.
    pub async fn aggregate(&self, symbol: &str, date: NaiveDate) -> AggregatedNews {
        let since = Duration::try_days(self.lookback_days)
            .and_then(|lookback| date.checked_sub_signed(lookback))
            .unwrap_or(NaiveDate::MIN);
        let mut seen: HashSet<String> = HashSet::new();
        // (source index, article), in first-seen order
        let mut merged: Vec<(usize, NewsArticle)> = Vec::new();

        for (idx, source) in self.sources.iter().enumerate() {
            if merged.len() >= self.min_articles {
                break;
            }
            if self.suppressed.contains(&idx) {
                tracing::debug!("Skipping suppressed news source {}", source.name());
                continue;
            }

            match self.fetch_from(source.as_ref(), symbol, since, date).await {
                Ok(articles) => {
                    let before = merged.len();
                    for article in articles {
                        if seen.insert(article.id.clone()) {
                            merged.push((idx, article));
                        }
                    }
                    tracing::info!(
                        "{} contributed {} new articles for {}",
                        source.name(),
                        merged.len() - before,
                        symbol
                    );
                }
                Err(NewsSourceError::EmptyResult) => {
                    tracing::debug!("{} had no articles for {}", source.name(), symbol);
                }
                Err(e) if e.suppresses_source(idx == 0) => {
                    tracing::warn!(
                        "Suppressing news source {} for this session: {}",
                        source.name(),
                        e
                    );
                    self.suppressed.insert(idx);
                }
                Err(e) => {
                    tracing::warn!("News source {} failed for {}: {}", source.name(), symbol, e);
                }
            }
        }

        if merged.is_empty() {
            tracing::info!("No news found for {} up to {}", symbol, date);
            return AggregatedNews::empty();
        }

        // Stable sort keeps first-seen order among equal timestamps
        merged.sort_by(|a, b| b.1.published_utc.cmp(&a.1.published_utc));
        merged.truncate(self.max_articles);

        let contributing: BTreeSet<usize> = merged.iter().map(|(idx, _)| *idx).collect();
        let source_label = SourceLabel::from_tiers(
            contributing.contains(&0),
            contributing.iter().any(|&idx| idx > 0),
        );
        let providers = contributing
            .iter()
            .map(|&idx| self.sources[idx].name().to_string())
            .collect();

        AggregatedNews {
            articles: merged.into_iter().map(|(_, article)| article).collect(),
            source_label,
            providers,
        }
    }

    async fn fetch_from(
        &self,
        source: &dyn NewsSource,
        symbol: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<NewsArticle>, NewsSourceError> {
        match tokio::time::timeout(self.source_timeout, source.fetch(symbol, since, until)).await {
            Ok(result) => result,
            Err(_) => Err(NewsSourceError::Timeout),
        }
    }
}
