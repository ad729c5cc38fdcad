use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV snapshot for one trading session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// News article in canonical form, independent of the provider it came from.
///
/// `id` is the cross-source dedup key: the normalized headline plus the UTC
/// publication date. It is derived in [`NewsArticle::new`] and never set by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub source: String,
    pub headline: String,
    pub summary: Option<String>,
    pub published_utc: DateTime<Utc>,
    pub url: String,
}

impl NewsArticle {
    pub fn new(
        source: impl Into<String>,
        headline: impl Into<String>,
        summary: Option<String>,
        published_utc: DateTime<Utc>,
        url: impl Into<String>,
    ) -> Self {
        let headline = headline.into();
        Self {
            id: dedup_key(&headline, published_utc.date_naive()),
            source: source.into(),
            headline,
            summary: summary.filter(|s| !s.trim().is_empty()),
            published_utc,
            url: url.into(),
        }
    }

    /// Headline and summary joined, as fed to the classifier
    pub fn text(&self) -> String {
        match &self.summary {
            Some(summary) => format!("{} {}", self.headline, summary),
            None => self.headline.clone(),
        }
    }
}

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn dedup_key(headline: &str, date: NaiveDate) -> String {
    format!("{}|{}", normalize_text(headline), date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// Classifier output for a single article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Back-reference to [`NewsArticle::id`]
    pub article_id: String,
    pub polarity: Polarity,
    pub reason: Option<String>,
    /// Normalized count difference, always within [-1, 1]
    pub score: f64,
    pub positive_hits: u32,
    pub negative_hits: u32,
}

/// Indicator values derived from a price history.
///
/// Every derived field is optional: `None` means the history was too short
/// for that indicator's window, not that the value is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub data_points: usize,
    pub latest_close: Option<f64>,
    pub daily_change_pct: Option<f64>,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub unusual_volume: bool,
    /// Standard deviation of daily returns, in percent
    pub volatility: Option<f64>,
    pub high_volatility: bool,
    /// Percent change across the momentum window
    pub momentum_pct: Option<f64>,
    /// Fractional volume change across the volume trend window
    pub volume_trend: Option<f64>,
}

impl TechnicalSnapshot {
    pub fn empty(symbol: &str, as_of: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            as_of,
            data_points: 0,
            latest_close: None,
            daily_change_pct: None,
            short_ma: None,
            long_ma: None,
            volume_ratio: None,
            unusual_volume: false,
            volatility: None,
            high_volatility: false,
            momentum_pct: None,
            volume_trend: None,
        }
    }

    pub fn has_moving_averages(&self) -> bool {
        self.short_ma.is_some() && self.long_ma.is_some()
    }
}

/// Which tiers of the source chain contributed articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLabel {
    None,
    Primary,
    Fallback,
    PrimaryAndFallback,
}

impl SourceLabel {
    pub fn from_tiers(primary: bool, fallback: bool) -> Self {
        match (primary, fallback) {
            (true, true) => SourceLabel::PrimaryAndFallback,
            (true, false) => SourceLabel::Primary,
            (false, true) => SourceLabel::Fallback,
            (false, false) => SourceLabel::None,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            SourceLabel::None => "None",
            SourceLabel::Primary => "Primary",
            SourceLabel::Fallback => "Fallback",
            SourceLabel::PrimaryAndFallback => "Primary & Fallback",
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

/// Merged, deduplicated news for one symbol and date window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedNews {
    pub articles: Vec<NewsArticle>,
    pub source_label: SourceLabel,
    /// Provider names that contributed at least one article, in chain order
    pub providers: Vec<String>,
}

impl AggregatedNews {
    pub fn empty() -> Self {
        Self {
            articles: Vec::new(),
            source_label: SourceLabel::None,
            providers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsBias {
    Positive,
    Negative,
    Neutral,
    /// No articles at all
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechnicalLean {
    Bullish,
    Bearish,
    Flat,
    /// One or both moving averages unavailable
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    LikelyUp,
    LikelyDown,
    Uncertain,
}

impl Direction {
    pub fn to_label(&self) -> &'static str {
        match self {
            Direction::LikelyUp => "Likely Up",
            Direction::LikelyDown => "Likely Down",
            Direction::Uncertain => "Neutral / Uncertain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn raise(self) -> Self {
        match self {
            Confidence::Low => Confidence::Medium,
            Confidence::Medium | Confidence::High => Confidence::High,
        }
    }

    pub fn lower(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium | Confidence::Low => Confidence::Low,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentDistribution {
    pub fn tally(results: &[SentimentResult]) -> Self {
        let mut dist = Self::default();
        for result in results {
            match result.polarity {
                Polarity::Positive => dist.positive += 1,
                Polarity::Negative => dist.negative += 1,
                Polarity::Neutral => dist.neutral += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Seven-day price projection from momentum, trend, news and volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyForecast {
    pub current_price: f64,
    pub forecast_price: f64,
    pub price_change: f64,
    /// Projected move in percent, capped to +/-15
    pub percent_change: f64,
    pub confidence: Confidence,
    /// Supporting signals behind `confidence`
    pub factors: Vec<String>,
}

/// Directional insight for a symbol on a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub sentiment: SentimentDistribution,
    pub news_bias: NewsBias,
    pub technical_lean: TechnicalLean,
    /// Reason categories, most dominant first
    pub dominant_reasons: Vec<String>,
    pub technical: TechnicalSnapshot,
    pub direction: Direction,
    pub confidence: Confidence,
    pub source_label: SourceLabel,
    pub article_count: usize,
    pub highlights: Vec<String>,
    /// `None` when the history is too short to project from
    pub forecast: Option<WeeklyForecast>,
    pub generated_at: DateTime<Utc>,
}
