//! Runtime configuration for the insight pipeline.
//!
//! Every threshold, window length and word list used by the classifier,
//! indicator engine and correlator lives here and is handed to those
//! components at construction time. `InsightConfig::from_env` builds the
//! whole tree from environment variables, falling back to the defaults below.

use crate::{normalize_text, AnalysisError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const NEWSAPI_BASE_URL: &str = "https://newsapi.org";
pub const YAHOO_QUERY_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const YAHOO_CHART_BASE_URL: &str = "https://query2.finance.yahoo.com";

pub const MAX_LOOKBACK_DAYS: i64 = 365;
pub const MAX_HISTORY_DAYS: u32 = 3650;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightConfig {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub correlator: CorrelatorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl InsightConfig {
    /// Build configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let mut config = Self::default();

        config.news.newsapi_key = std::env::var("NEWSAPI_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        config.news.source_timeout_secs =
            env_or("INSIGHT_SOURCE_TIMEOUT_SECS", config.news.source_timeout_secs)?;
        config.news.min_articles = env_or("INSIGHT_MIN_ARTICLES", config.news.min_articles)?;
        config.news.lookback_days = env_or("INSIGHT_NEWS_LOOKBACK_DAYS", config.news.lookback_days)?;

        config.indicators.short_window = env_or("INSIGHT_SHORT_MA", config.indicators.short_window)?;
        config.indicators.long_window = env_or("INSIGHT_LONG_MA", config.indicators.long_window)?;
        config.indicators.volume_ratio_threshold = env_or(
            "INSIGHT_VOLUME_RATIO_THRESHOLD",
            config.indicators.volume_ratio_threshold,
        )?;
        config.indicators.volatility_threshold = env_or(
            "INSIGHT_VOLATILITY_THRESHOLD",
            config.indicators.volatility_threshold,
        )?;

        config.correlator.news_margin = env_or("INSIGHT_NEWS_MARGIN", config.correlator.news_margin)?;
        config.cache.ttl_secs = env_or("INSIGHT_CACHE_TTL_SECS", config.cache.ttl_secs)?;

        if let Ok(path) = std::env::var("INSIGHT_LEXICON_PATH") {
            config.classifier = ClassifierConfig::from_json_file(&path)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.news.validate()?;
        self.classifier.validate()?;
        self.indicators.validate()?;
        if self.cache.ttl_secs == 0 {
            return Err(AnalysisError::InvalidConfig("cache TTL must be positive".to_string()));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, AnalysisError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AnalysisError::InvalidConfig(format!("{} has an invalid value: {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// NewsAPI credential; `None` disables the primary source for the session
    #[serde(default, skip_serializing)]
    pub newsapi_key: Option<String>,
    pub newsapi_base_url: String,
    pub yahoo_base_url: String,
    /// Calendar days before the as-of date included in the news window
    pub lookback_days: i64,
    /// The fallback is consulted while fewer than this many articles are merged
    pub min_articles: usize,
    pub max_articles: usize,
    pub source_timeout_secs: u64,
}

impl NewsConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) {
            return Err(AnalysisError::InvalidConfig(format!(
                "news lookback must be between 0 and {} days",
                MAX_LOOKBACK_DAYS
            )));
        }
        if self.max_articles == 0 || self.source_timeout_secs == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_articles and source timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            newsapi_key: None,
            newsapi_base_url: NEWSAPI_BASE_URL.to_string(),
            yahoo_base_url: YAHOO_QUERY_BASE_URL.to_string(),
            lookback_days: 7,
            min_articles: 5,
            max_articles: 15,
            source_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for NewsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsConfig")
            .field("newsapi_key", &self.newsapi_key.as_ref().map(|_| "<redacted>"))
            .field("newsapi_base_url", &self.newsapi_base_url)
            .field("yahoo_base_url", &self.yahoo_base_url)
            .field("lookback_days", &self.lookback_days)
            .field("min_articles", &self.min_articles)
            .field("max_articles", &self.max_articles)
            .field("source_timeout_secs", &self.source_timeout_secs)
            .finish()
    }
}

/// Sentiment word lists. Bump `version` whenever the lists change so cached
/// or logged results can be traced back to the lexicon that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    pub version: u32,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            version: 1,
            positive: words(&[
                "bullish", "rally", "rallies", "surge", "surges", "soar", "soars", "jump", "jumps",
                "gain", "gains", "profit", "profits", "growth", "beat", "beats", "surprise",
                "upgrade", "upgraded", "outperform", "strong", "stronger", "positive", "rise",
                "rises", "increase", "breakthrough", "success", "exceed", "exceeds", "momentum",
                "buy", "optimistic", "record", "advance", "dividend", "buyback", "repurchase",
                "upside", "recovery", "rebound", "expansion", "robust", "accelerating",
                "overweight", "raised", "raises", "tailwind",
            ]),
            negative: words(&[
                "bearish", "decline", "declines", "loss", "losses", "fall", "falls", "plunge",
                "plunges", "crash", "miss", "misses", "missed", "downgrade", "downgraded",
                "underperform", "weak", "weaker", "negative", "drop", "drops", "decrease",
                "concern", "concerns", "risk", "fail", "fails", "disappoint", "disappointing",
                "slump", "sell", "warning", "warns", "pessimistic", "retreat", "fear", "fears",
                "trouble", "dilution", "headwind", "lawsuit", "litigation", "recall",
                "investigation", "probe", "default", "bankruptcy", "layoff", "layoffs",
                "downside", "overvalued", "underweight", "lowered", "lowers", "suspended",
                "cut", "cuts",
            ]),
        }
    }
}

/// A price-movement reason and the phrases that indicate it.
///
/// Phrases match at the start of a word; a trailing space demands a whole
/// word (`"sec "` matches "SEC" but not "second").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonCategory {
    pub label: String,
    pub phrases: Vec<String>,
}

impl ReasonCategory {
    pub fn new(label: &str, phrases: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            phrases: words(phrases),
        }
    }
}

pub fn default_reason_categories() -> Vec<ReasonCategory> {
    vec![
        ReasonCategory::new(
            "Earnings",
            &["earnings", "quarterly results", "eps ", "revenue", "quarter", "profit"],
        ),
        ReasonCategory::new(
            "Analyst Rating",
            &["upgrade", "downgrade", "price target", "analyst", "rating", "initiates coverage"],
        ),
        ReasonCategory::new("Guidance", &["guidance", "outlook", "forecast"]),
        ReasonCategory::new(
            "Regulatory",
            &["fda ", "sec ", "regulat", "antitrust", "approval", "compliance"],
        ),
        ReasonCategory::new(
            "Mergers & Acquisitions",
            &["acqui", "merger", "buyout", "takeover", "spinoff", "spin off"],
        ),
        ReasonCategory::new(
            "Legal",
            &["lawsuit", "litigation", "settlement", "sued ", "court", "indictment"],
        ),
        ReasonCategory::new(
            "Management",
            &["ceo ", "cfo ", "board", "executive", "resign", "appoint"],
        ),
        ReasonCategory::new("Product", &["launch", "product", "recall", "patent"]),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub lexicon: Lexicon,
    #[serde(default = "default_reason_categories")]
    pub reasons: Vec<ReasonCategory>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lexicon: Lexicon::default(),
            reasons: default_reason_categories(),
        }
    }
}

impl ClassifierConfig {
    pub fn from_json_file(path: &str) -> Result<Self, AnalysisError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::InvalidConfig(format!("cannot read lexicon {}: {}", path, e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| AnalysisError::InvalidConfig(format!("cannot parse lexicon {}: {}", path, e)))
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let positive = normalized_terms(&self.lexicon.positive)?;
        let negative = normalized_terms(&self.lexicon.negative)?;
        let mut overlap: Vec<&String> = positive.intersection(&negative).collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Err(AnalysisError::InvalidConfig(format!(
                "lexicon v{} lists terms as both positive and negative: {:?}",
                self.lexicon.version, overlap
            )));
        }
        if self.reasons.iter().any(|r| r.phrases.iter().all(|p| p.trim().is_empty())) {
            return Err(AnalysisError::InvalidConfig(
                "every reason category needs at least one phrase".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub volume_window: usize,
    pub volatility_window: usize,
    /// Latest volume over trailing mean above this flags unusual activity
    pub volume_ratio_threshold: f64,
    /// Daily-return standard deviation (percent) above this is high volatility
    pub volatility_threshold: f64,
    /// Calendar days of history requested from the market data provider
    pub history_days: u32,
    /// Closes spanned by the momentum reading behind the weekly forecast
    pub momentum_window: usize,
    pub volume_trend_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 20,
            volume_window: 20,
            volatility_window: 20,
            volume_ratio_threshold: 1.2,
            volatility_threshold: 3.0,
            history_days: 60,
            momentum_window: 10,
            volume_trend_window: 5,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.short_window == 0 || self.volume_window == 0 {
            return Err(AnalysisError::InvalidConfig("indicator windows must be positive".to_string()));
        }
        if self.momentum_window < 2 || self.volume_trend_window < 2 {
            return Err(AnalysisError::InvalidConfig(
                "momentum and volume trend windows need at least 2 points".to_string(),
            ));
        }
        if self.volatility_window < 3 {
            return Err(AnalysisError::InvalidConfig(
                "volatility window needs at least 3 closes".to_string(),
            ));
        }
        if self.short_window >= self.long_window {
            return Err(AnalysisError::InvalidConfig(format!(
                "short window ({}) must be shorter than long window ({})",
                self.short_window, self.long_window
            )));
        }
        if self.history_days == 0 || self.history_days > MAX_HISTORY_DAYS {
            return Err(AnalysisError::InvalidConfig(format!(
                "history window must be between 1 and {} days",
                MAX_HISTORY_DAYS
            )));
        }
        if !(self.volume_ratio_threshold > 0.0 && self.volatility_threshold > 0.0) {
            return Err(AnalysisError::InvalidConfig("thresholds must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelatorConfig {
    /// Positive count must exceed negative count by more than this (and vice versa)
    pub news_margin: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// Terms in the form the classifier matches them: one normalized token each.
fn normalized_terms(terms: &[String]) -> Result<HashSet<String>, AnalysisError> {
    let mut normalized = HashSet::with_capacity(terms.len());
    for term in terms {
        let token = normalize_text(term);
        if token.is_empty() || token.contains(' ') {
            return Err(AnalysisError::InvalidConfig(format!(
                "lexicon term {:?} must normalize to a single word",
                term
            )));
        }
        normalized.insert(token);
    }
    Ok(normalized)
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}
