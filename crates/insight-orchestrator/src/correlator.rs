use analysis_core::{
    AggregatedNews, Confidence, CorrelatorConfig, Direction, Insight, NewsBias, Polarity,
    SentimentDistribution, SentimentResult, TechnicalLean, TechnicalSnapshot, WeeklyForecast,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const MAX_DOMINANT_REASONS: usize = 3;

/// Projected weekly moves are capped to this many percent either way
const FORECAST_CAP_PCT: f64 = 15.0;
const TRADING_DAYS_PER_WEEK: f64 = 5.0;
const DAYS_AHEAD: f64 = 7.0;
const NEWS_COVERAGE_MIN_ARTICLES: usize = 3;

/// Rule-based combination of news sentiment and technical lean into a call.
pub struct Correlator {
    config: CorrelatorConfig,
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self { config }
    }

    pub fn news_bias(&self, distribution: &SentimentDistribution, article_count: usize) -> NewsBias {
        if article_count == 0 {
            return NewsBias::Absent;
        }

        let margin = self.config.news_margin;
        if distribution.positive > distribution.negative + margin {
            NewsBias::Positive
        } else if distribution.negative > distribution.positive + margin {
            NewsBias::Negative
        } else {
            NewsBias::Neutral
        }
    }

    pub fn technical_lean(snapshot: &TechnicalSnapshot) -> TechnicalLean {
        match (snapshot.short_ma, snapshot.long_ma) {
            (Some(short), Some(long)) if short > long => TechnicalLean::Bullish,
            (Some(short), Some(long)) if short < long => TechnicalLean::Bearish,
            (Some(_), Some(_)) => TechnicalLean::Flat,
            _ => TechnicalLean::Unavailable,
        }
    }

    /// Decision table, before volume and volatility modifiers
    pub fn decide(bias: NewsBias, lean: TechnicalLean) -> (Direction, Confidence) {
        let news = match bias {
            NewsBias::Positive => Some(Direction::LikelyUp),
            NewsBias::Negative => Some(Direction::LikelyDown),
            NewsBias::Neutral | NewsBias::Absent => None,
        };
        let technical = match lean {
            TechnicalLean::Bullish => Some(Direction::LikelyUp),
            TechnicalLean::Bearish => Some(Direction::LikelyDown),
            TechnicalLean::Flat | TechnicalLean::Unavailable => None,
        };

        match (news, technical) {
            (Some(n), Some(t)) if n == t => (n, Confidence::High),
            (Some(_), Some(_)) => (Direction::Uncertain, Confidence::Low),
            (Some(n), None) if lean == TechnicalLean::Unavailable => (n, Confidence::Medium),
            (Some(n), None) => (n, Confidence::Low),
            (None, Some(t)) if bias == NewsBias::Absent => (t, Confidence::Medium),
            (None, Some(t)) => (t, Confidence::Low),
            (None, None) => (Direction::Uncertain, Confidence::Low),
        }
    }

    pub fn correlate(
        &self,
        news: &AggregatedNews,
        sentiments: &[SentimentResult],
        snapshot: &TechnicalSnapshot,
    ) -> Insight {
        let sentiment = SentimentDistribution::tally(sentiments);
        let news_bias = self.news_bias(&sentiment, news.articles.len());
        let technical_lean = Self::technical_lean(snapshot);

        let (direction, mut confidence) = Self::decide(news_bias, technical_lean);
        if direction != Direction::Uncertain {
            let lean_is_directional =
                matches!(technical_lean, TechnicalLean::Bullish | TechnicalLean::Bearish);
            if snapshot.unusual_volume && lean_is_directional {
                confidence = confidence.raise();
            }
            if snapshot.high_volatility {
                confidence = confidence.lower();
            }
        }

        let dominant_reasons = dominant_reasons(news, sentiments, news_bias);
        let highlights = highlights(snapshot, &sentiment, news_bias);
        let forecast = weekly_forecast(snapshot, &sentiment);

        tracing::info!(
            "{}: news {:?} + technicals {:?} => {} ({})",
            snapshot.symbol,
            news_bias,
            technical_lean,
            direction.to_label(),
            confidence.to_label()
        );

        Insight {
            symbol: snapshot.symbol.clone(),
            as_of: snapshot.as_of,
            sentiment,
            news_bias,
            technical_lean,
            dominant_reasons,
            technical: snapshot.clone(),
            direction,
            confidence,
            source_label: news.source_label,
            article_count: news.articles.len(),
            highlights,
            forecast,
            generated_at: Utc::now(),
        }
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(CorrelatorConfig::default())
    }
}

/// Reason categories among articles of the winning polarity, most frequent
/// first, ties going to the category seen most recently.
fn dominant_reasons(
    news: &AggregatedNews,
    sentiments: &[SentimentResult],
    bias: NewsBias,
) -> Vec<String> {
    let winning = match bias {
        NewsBias::Positive => Some(Polarity::Positive),
        NewsBias::Negative => Some(Polarity::Negative),
        NewsBias::Neutral | NewsBias::Absent => None,
    };

    let published: HashMap<&str, DateTime<Utc>> = news
        .articles
        .iter()
        .map(|a| (a.id.as_str(), a.published_utc))
        .collect();

    // label -> (count, latest publication)
    let mut tally: HashMap<&str, (usize, Option<DateTime<Utc>>)> = HashMap::new();
    for result in sentiments {
        if winning.is_some_and(|p| p != result.polarity) {
            continue;
        }
        let Some(reason) = result.reason.as_deref() else {
            continue;
        };
        let seen_at = published.get(result.article_id.as_str()).copied();
        let slot = tally.entry(reason).or_insert((0, None));
        slot.0 += 1;
        slot.1 = slot.1.max(seen_at);
    }

    let mut ranked: Vec<(&str, usize, Option<DateTime<Utc>>)> = tally
        .into_iter()
        .map(|(label, (count, latest))| (label, count, latest))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
        .into_iter()
        .take(MAX_DOMINANT_REASONS)
        .map(|(label, _, _)| label.to_string())
        .collect()
}

/// Linear seven-day projection from the latest close.
///
/// Weighted inputs: momentum (0.3), distance from the short average (0.2),
/// net news score (2.0) and volume trend (0.5). Their sum is a daily-rate
/// estimate scaled to seven days, then capped. Confidence counts how many of
/// strong momentum, a clear trend and adequate news coverage are present.
pub fn weekly_forecast(
    snapshot: &TechnicalSnapshot,
    sentiment: &SentimentDistribution,
) -> Option<WeeklyForecast> {
    let close = snapshot.latest_close?;
    let short_ma = snapshot.short_ma.filter(|ma| *ma > 0.0)?;
    let momentum = snapshot.momentum_pct?;
    let volume_trend = snapshot.volume_trend.unwrap_or(0.0);

    let articles = sentiment.total();
    let news_score = (sentiment.positive as f64 - sentiment.negative as f64) / articles.max(1) as f64;
    let ma_distance = (close - short_ma) / short_ma;

    let daily = momentum * 0.3 + ma_distance * 100.0 * 0.2 + news_score * 2.0 + volume_trend * 0.5;
    let percent_change =
        (daily * DAYS_AHEAD / TRADING_DAYS_PER_WEEK).clamp(-FORECAST_CAP_PCT, FORECAST_CAP_PCT);
    let forecast_price = close * (1.0 + percent_change / 100.0);

    let mut factors = Vec::new();
    if momentum.abs() > 1.0 {
        factors.push("Strong momentum".to_string());
    }
    if ma_distance.abs() > 0.02 {
        factors.push("Clear trend".to_string());
    }
    if articles >= NEWS_COVERAGE_MIN_ARTICLES {
        factors.push("News coverage".to_string());
    }
    let confidence = match factors.len() {
        0 | 1 => Confidence::Low,
        2 => Confidence::Medium,
        _ => Confidence::High,
    };

    Some(WeeklyForecast {
        current_price: close,
        forecast_price,
        price_change: forecast_price - close,
        percent_change,
        confidence,
        factors,
    })
}

fn highlights(
    snapshot: &TechnicalSnapshot,
    sentiment: &SentimentDistribution,
    bias: NewsBias,
) -> Vec<String> {
    let mut lines = Vec::new();

    match (snapshot.latest_close, snapshot.short_ma) {
        (Some(close), Some(short_ma)) => {
            let above = close > short_ma;
            lines.push(format!(
                "Price Trend: {} trend detected",
                if above { "Upward" } else { "Downward" }
            ));
            lines.push(format!(
                "Moving Average: Current price is {} the short-term average",
                if above { "above" } else { "below" }
            ));
        }
        _ => lines.push("Price Trend: Insufficient price history".to_string()),
    }

    if snapshot.unusual_volume {
        if let Some(ratio) = snapshot.volume_ratio {
            lines.push(format!(
                "Volume: High trading volume detected ({:.1}% above average)",
                (ratio - 1.0) * 100.0
            ));
        }
    }

    lines.push(match bias {
        NewsBias::Positive => format!(
            "News Sentiment: Positive news flow ({} positive vs {} negative)",
            sentiment.positive, sentiment.negative
        ),
        NewsBias::Negative => format!(
            "News Sentiment: Negative news flow ({} negative vs {} positive)",
            sentiment.negative, sentiment.positive
        ),
        NewsBias::Neutral => "News Sentiment: Mixed news flow".to_string(),
        NewsBias::Absent => "News Sentiment: No recent news".to_string(),
    });

    if snapshot.high_volatility {
        if let Some(volatility) = snapshot.volatility {
            lines.push(format!("Volatility: High volatility detected ({:.2}%)", volatility));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{NewsArticle, SourceLabel};
    use chrono::{NaiveDate, TimeZone};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    fn snapshot(short_ma: Option<f64>, long_ma: Option<f64>) -> TechnicalSnapshot {
        TechnicalSnapshot {
            symbol: "ABC".to_string(),
            as_of: as_of(),
            data_points: 20,
            latest_close: Some(101.0),
            daily_change_pct: Some(0.5),
            short_ma,
            long_ma,
            volume_ratio: Some(1.0),
            unusual_volume: false,
            volatility: Some(1.0),
            high_volatility: false,
            momentum_pct: None,
            volume_trend: None,
        }
    }

    fn bullish() -> TechnicalSnapshot {
        snapshot(Some(102.0), Some(100.0))
    }

    fn bearish() -> TechnicalSnapshot {
        snapshot(Some(98.0), Some(100.0))
    }

    fn no_history() -> TechnicalSnapshot {
        TechnicalSnapshot::empty("ABC", as_of())
    }

    fn article(headline: &str, day: u32) -> NewsArticle {
        NewsArticle::new(
            "Wire",
            headline,
            None,
            Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            "https://news.example",
        )
    }

    fn result(article: &NewsArticle, polarity: Polarity, reason: Option<&str>) -> SentimentResult {
        SentimentResult {
            article_id: article.id.clone(),
            polarity,
            reason: reason.map(str::to_string),
            score: 0.0,
            positive_hits: 0,
            negative_hits: 0,
        }
    }

    /// Builds news plus one classified result per (polarity, reason) pair
    fn classified(items: &[(Polarity, Option<&str>)]) -> (AggregatedNews, Vec<SentimentResult>) {
        let articles: Vec<NewsArticle> = items
            .iter()
            .enumerate()
            .map(|(i, _)| article(&format!("Story {}", i), 1 + i as u32))
            .collect();
        let results = articles
            .iter()
            .zip(items)
            .map(|(a, (polarity, reason))| result(a, *polarity, *reason))
            .collect();
        let news = AggregatedNews {
            articles,
            source_label: SourceLabel::Primary,
            providers: vec!["NewsAPI".to_string()],
        };
        (news, results)
    }

    #[test]
    fn test_decision_table() {
        use Confidence::*;
        use Direction::*;

        let rows = [
            (NewsBias::Positive, TechnicalLean::Bullish, LikelyUp, High),
            (NewsBias::Negative, TechnicalLean::Bearish, LikelyDown, High),
            (NewsBias::Positive, TechnicalLean::Bearish, Uncertain, Low),
            (NewsBias::Negative, TechnicalLean::Bullish, Uncertain, Low),
            (NewsBias::Absent, TechnicalLean::Bullish, LikelyUp, Medium),
            (NewsBias::Absent, TechnicalLean::Bearish, LikelyDown, Medium),
            (NewsBias::Positive, TechnicalLean::Unavailable, LikelyUp, Medium),
            (NewsBias::Negative, TechnicalLean::Unavailable, LikelyDown, Medium),
            (NewsBias::Neutral, TechnicalLean::Bullish, LikelyUp, Low),
            (NewsBias::Positive, TechnicalLean::Flat, LikelyUp, Low),
            (NewsBias::Neutral, TechnicalLean::Flat, Uncertain, Low),
            (NewsBias::Absent, TechnicalLean::Unavailable, Uncertain, Low),
        ];

        for (bias, lean, direction, confidence) in rows {
            assert_eq!(
                Correlator::decide(bias, lean),
                (direction, confidence),
                "{:?} + {:?}",
                bias,
                lean
            );
        }
    }

    #[test]
    fn test_news_bias_margin() {
        let dist = SentimentDistribution { positive: 3, negative: 2, neutral: 1 };
        assert_eq!(Correlator::default().news_bias(&dist, 6), NewsBias::Positive);

        let strict = Correlator::new(CorrelatorConfig { news_margin: 1 });
        assert_eq!(strict.news_bias(&dist, 6), NewsBias::Neutral);

        let dist = SentimentDistribution { positive: 0, negative: 2, neutral: 0 };
        assert_eq!(strict.news_bias(&dist, 2), NewsBias::Negative);

        let empty = SentimentDistribution::default();
        assert_eq!(strict.news_bias(&empty, 0), NewsBias::Absent);
    }

    #[test]
    fn test_technical_lean() {
        assert_eq!(Correlator::technical_lean(&bullish()), TechnicalLean::Bullish);
        assert_eq!(Correlator::technical_lean(&bearish()), TechnicalLean::Bearish);
        assert_eq!(
            Correlator::technical_lean(&snapshot(Some(100.0), Some(100.0))),
            TechnicalLean::Flat
        );
        assert_eq!(
            Correlator::technical_lean(&snapshot(Some(100.0), None)),
            TechnicalLean::Unavailable
        );
    }

    #[test]
    fn test_positive_news_and_bullish_trend_is_up_high() {
        let (news, results) = classified(&[
            (Polarity::Positive, Some("Earnings")),
            (Polarity::Positive, Some("Earnings")),
            (Polarity::Neutral, None),
        ]);

        let insight = Correlator::default().correlate(&news, &results, &bullish());

        assert_eq!(insight.direction, Direction::LikelyUp);
        assert_eq!(insight.confidence, Confidence::High);
        assert_eq!(insight.dominant_reasons, vec!["Earnings".to_string()]);
        assert_eq!(insight.sentiment.positive, 2);
        assert_eq!(insight.article_count, 3);
        assert_eq!(insight.source_label, SourceLabel::Primary);
    }

    #[test]
    fn test_conflicting_signals_are_uncertain_low() {
        let (news, results) = classified(&[(Polarity::Positive, None)]);
        let insight = Correlator::default().correlate(&news, &results, &bearish());

        assert_eq!(insight.direction, Direction::Uncertain);
        assert_eq!(insight.confidence, Confidence::Low);
    }

    #[test]
    fn test_no_news_uses_technicals_at_medium() {
        let insight = Correlator::default().correlate(&AggregatedNews::empty(), &[], &bullish());

        assert_eq!(insight.news_bias, NewsBias::Absent);
        assert_eq!(insight.direction, Direction::LikelyUp);
        assert_eq!(insight.confidence, Confidence::Medium);
        assert!(insight.dominant_reasons.is_empty());
    }

    #[test]
    fn test_unusual_volume_raises_confidence() {
        let mut technical = bullish();
        technical.unusual_volume = true;
        technical.volume_ratio = Some(1.5);

        let insight = Correlator::default().correlate(&AggregatedNews::empty(), &[], &technical);

        assert_eq!(insight.confidence, Confidence::High);
        assert!(insight
            .highlights
            .iter()
            .any(|h| h == "Volume: High trading volume detected (50.0% above average)"));
    }

    #[test]
    fn test_high_volatility_lowers_confidence() {
        let mut technical = bullish();
        technical.high_volatility = true;
        technical.volatility = Some(4.25);
        let (news, results) = classified(&[(Polarity::Positive, None)]);

        let insight = Correlator::default().correlate(&news, &results, &technical);

        assert_eq!(insight.direction, Direction::LikelyUp);
        assert_eq!(insight.confidence, Confidence::Medium);
        assert!(insight
            .highlights
            .iter()
            .any(|h| h == "Volatility: High volatility detected (4.25%)"));
    }

    #[test]
    fn test_modifiers_leave_uncertain_calls_alone() {
        let mut technical = bearish();
        technical.unusual_volume = true;
        let (news, results) = classified(&[(Polarity::Positive, None)]);

        let insight = Correlator::default().correlate(&news, &results, &technical);

        assert_eq!(insight.direction, Direction::Uncertain);
        assert_eq!(insight.confidence, Confidence::Low);
    }

    #[test]
    fn test_dominant_reason_counts_only_winning_polarity() {
        let (news, results) = classified(&[
            (Polarity::Negative, Some("Legal")),
            (Polarity::Negative, Some("Legal")),
            (Polarity::Negative, Some("Legal")),
            (Polarity::Positive, Some("Product")),
            (Polarity::Positive, Some("Product")),
            (Polarity::Positive, Some("Earnings")),
            (Polarity::Positive, Some("Earnings")),
            (Polarity::Positive, None),
            (Polarity::Positive, Some("Guidance")),
        ]);

        let insight = Correlator::default().correlate(&news, &results, &bullish());

        assert_eq!(insight.news_bias, NewsBias::Positive);
        // Product and Earnings tie at two; Earnings is more recent
        assert_eq!(
            insight.dominant_reasons,
            vec!["Earnings".to_string(), "Product".to_string(), "Guidance".to_string()]
        );
    }

    #[test]
    fn test_neutral_bias_ranks_all_reasons() {
        let (news, results) = classified(&[
            (Polarity::Positive, Some("Guidance")),
            (Polarity::Negative, Some("Legal")),
            (Polarity::Neutral, Some("Legal")),
        ]);

        let insight = Correlator::default().correlate(&news, &results, &bullish());

        assert_eq!(insight.news_bias, NewsBias::Neutral);
        assert_eq!(insight.dominant_reasons[0], "Legal");
    }

    #[test]
    fn test_highlights_trend_and_news_flow() {
        let (news, results) = classified(&[(Polarity::Negative, None), (Polarity::Negative, None)]);
        let mut technical = bearish();
        technical.latest_close = Some(95.0);

        let insight = Correlator::default().correlate(&news, &results, &technical);

        assert_eq!(
            insight.highlights,
            vec![
                "Price Trend: Downward trend detected".to_string(),
                "Moving Average: Current price is below the short-term average".to_string(),
                "News Sentiment: Negative news flow (2 negative vs 0 positive)".to_string(),
            ]
        );
    }

    fn trending(momentum: f64, volume_trend: f64) -> TechnicalSnapshot {
        let mut technical = bearish();
        technical.momentum_pct = Some(momentum);
        technical.volume_trend = Some(volume_trend);
        technical
    }

    #[test]
    fn test_weekly_forecast_blends_weighted_signals() {
        // close 101 vs short average 98
        let technical = trending(2.0, 0.5);
        let sentiment = SentimentDistribution { positive: 2, negative: 1, neutral: 0 };

        let forecast = weekly_forecast(&technical, &sentiment).unwrap();

        let daily = 2.0 * 0.3 + 3.0 / 98.0 * 100.0 * 0.2 + 1.0 / 3.0 * 2.0 + 0.5 * 0.5;
        let expected = daily * 7.0 / 5.0;
        assert!((forecast.percent_change - expected).abs() < 1e-9);
        assert_eq!(forecast.current_price, 101.0);
        assert!((forecast.forecast_price - 101.0 * (1.0 + expected / 100.0)).abs() < 1e-9);
        assert!((forecast.price_change - (forecast.forecast_price - 101.0)).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_forecast_is_capped() {
        let sentiment = SentimentDistribution::default();

        let up = weekly_forecast(&trending(100.0, 0.0), &sentiment).unwrap();
        assert_eq!(up.percent_change, 15.0);
        assert!((up.forecast_price - 101.0 * 1.15).abs() < 1e-9);

        let down = weekly_forecast(&trending(-100.0, -1.0), &sentiment).unwrap();
        assert_eq!(down.percent_change, -15.0);
        assert!((down.forecast_price - 101.0 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_forecast_confidence_counts_factors() {
        let covered = SentimentDistribution { positive: 1, negative: 1, neutral: 1 };
        let sparse = SentimentDistribution { positive: 1, negative: 0, neutral: 0 };

        let all = weekly_forecast(&trending(2.0, 0.0), &covered).unwrap();
        assert_eq!(all.confidence, Confidence::High);
        assert_eq!(
            all.factors,
            vec!["Strong momentum".to_string(), "Clear trend".to_string(), "News coverage".to_string()]
        );

        let two = weekly_forecast(&trending(2.0, 0.0), &sparse).unwrap();
        assert_eq!(two.confidence, Confidence::Medium);

        // 101 vs 100.5 is inside the 2% band
        let mut quiet = trending(0.5, 0.0);
        quiet.short_ma = Some(100.5);
        let one = weekly_forecast(&quiet, &covered).unwrap();
        assert_eq!(one.factors, vec!["News coverage".to_string()]);
        assert_eq!(one.confidence, Confidence::Low);
    }

    #[test]
    fn test_weekly_forecast_needs_price_history() {
        let sentiment = SentimentDistribution::default();
        assert_eq!(weekly_forecast(&no_history(), &sentiment), None);
        // moving averages alone without a momentum reading
        assert_eq!(weekly_forecast(&bullish(), &sentiment), None);

        let insight = Correlator::default().correlate(&AggregatedNews::empty(), &[], &trending(2.0, 0.0));
        assert!(insight.forecast.is_some());
    }

    #[test]
    fn test_highlights_without_history() {
        let insight = Correlator::default().correlate(&AggregatedNews::empty(), &[], &no_history());

        assert_eq!(insight.direction, Direction::Uncertain);
        assert_eq!(
            insight.highlights,
            vec![
                "Price Trend: Insufficient price history".to_string(),
                "News Sentiment: No recent news".to_string(),
            ]
        );
    }
}
