use analysis_core::{
    AggregatedNews, AnalysisError, HistoryProvider, Insight, InsightConfig, NewsSource, Quote,
};
use chrono::NaiveDate;
use market_client::{NewsApiSource, YahooChartClient, YahooNewsSource};
use news_aggregator::NewsAggregator;
use sentiment_analysis::SentimentClassifier;
use std::sync::Arc;
use technical_analysis::compute_snapshot;

pub mod cache;
pub mod correlator;

pub use cache::{CacheEntry, CacheKey, QueryKind, ResultCache};
pub use correlator::Correlator;

/// Entry point for directional insights.
///
/// Owns the news chain, the price history provider, the classifier and the
/// correlator, plus one result cache per query kind. Concurrent sessions can
/// share one instance; identical in-flight queries are computed once.
pub struct InsightService {
    config: InsightConfig,
    aggregator: NewsAggregator,
    history: Arc<dyn HistoryProvider>,
    classifier: SentimentClassifier,
    correlator: Correlator,
    /// Aggregated news per (symbol, date)
    news_cache: ResultCache<AggregatedNews>,
    /// Daily quotes per (symbol, date)
    history_cache: ResultCache<Vec<Quote>>,
    /// Finished insights per (symbol, date)
    insight_cache: ResultCache<Insight>,
}

impl InsightService {
    /// `sources` is the news chain in priority order: primary first.
    pub fn new(
        config: InsightConfig,
        sources: Vec<Arc<dyn NewsSource>>,
        history: Arc<dyn HistoryProvider>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let classifier = SentimentClassifier::new(&config.classifier)?;

        Ok(Self {
            aggregator: NewsAggregator::new(sources, &config.news),
            history,
            classifier,
            correlator: Correlator::new(config.correlator.clone()),
            news_cache: ResultCache::new(),
            history_cache: ResultCache::new(),
            insight_cache: ResultCache::new(),
            config,
        })
    }

    /// Wire up NewsAPI (primary), Yahoo Finance news (fallback) and Yahoo
    /// chart history.
    pub fn from_config(config: InsightConfig) -> Result<Self, AnalysisError> {
        let primary = NewsApiSource::from_config(&config.news);
        if !primary.has_credential() {
            tracing::warn!("NEWSAPI_KEY not set, primary news source disabled for this session");
        }

        let sources: Vec<Arc<dyn NewsSource>> = vec![
            Arc::new(primary),
            Arc::new(YahooNewsSource::from_config(&config.news)),
        ];
        let history = Arc::new(YahooChartClient::new(
            analysis_core::YAHOO_CHART_BASE_URL,
            config.news.source_timeout(),
        ));

        Self::new(config, sources, history)
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    pub fn news_sources(&self) -> Vec<String> {
        self.aggregator.source_names()
    }

    /// Directional insight for `symbol` as of `as_of`.
    ///
    /// Fails with `InsufficientData` only when there is neither news nor enough
    /// history for both moving averages.
    pub async fn get_insight(&self, symbol: &str, as_of: NaiveDate) -> Result<Arc<Insight>, AnalysisError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidData("symbol must not be empty".to_string()));
        }

        let key = CacheKey::new(&symbol, as_of, QueryKind::Insight);
        self.insight_cache
            .get_or_try_compute(key, self.config.cache.ttl(), || self.build_insight(&symbol, as_of))
            .await
    }

    /// Most recent quote from the history provider, uncached
    pub async fn latest_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
        self.history.latest_quote(&symbol.trim().to_uppercase()).await
    }

    async fn build_insight(&self, symbol: &str, as_of: NaiveDate) -> Result<Insight, AnalysisError> {
        tracing::info!("Building insight for {} as of {}", symbol, as_of);

        let (news, quotes) = tokio::join!(
            self.aggregated_news(symbol, as_of),
            self.price_history(symbol, as_of)
        );

        let sentiments = self.classifier.classify_all(&news.articles);
        let snapshot = compute_snapshot(symbol, as_of, &quotes, &self.config.indicators);

        if news.is_empty() && !snapshot.has_moving_averages() {
            return Err(AnalysisError::InsufficientData(format!(
                "no news and only {} usable quotes for {} as of {}",
                snapshot.data_points, symbol, as_of
            )));
        }

        Ok(self.correlator.correlate(&news, &sentiments, &snapshot))
    }

    async fn aggregated_news(&self, symbol: &str, as_of: NaiveDate) -> Arc<AggregatedNews> {
        let key = CacheKey::new(symbol, as_of, QueryKind::News);
        let news = self
            .news_cache
            .get_or_compute(key, self.config.cache.ttl(), || self.aggregator.aggregate(symbol, as_of))
            .await;
        tracing::info!(
            "{} articles for {} (source: {})",
            news.articles.len(),
            symbol,
            news.source_label
        );
        news
    }

    /// Price history; provider failures degrade to an empty series
    async fn price_history(&self, symbol: &str, as_of: NaiveDate) -> Arc<Vec<Quote>> {
        let key = CacheKey::new(symbol, as_of, QueryKind::History);
        let days = self.config.indicators.history_days;
        let result = self
            .history_cache
            .get_or_try_compute(key, self.config.cache.ttl(), || {
                self.history.daily_history(symbol, as_of, days)
            })
            .await;

        match result {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!("Price history unavailable for {}: {}", symbol, e);
                Arc::new(Vec::new())
            }
        }
    }
}
