use analysis_core::{
    normalize_text, AnalysisError, ClassifierConfig, NewsArticle, Polarity, SentimentResult,
};
use std::collections::HashSet;

/// Compiled reason category: label plus word-start search patterns
struct ReasonMatcher {
    label: String,
    patterns: Vec<String>,
}

impl ReasonMatcher {
    fn matches(&self, padded_text: &str) -> bool {
        self.patterns.iter().any(|p| padded_text.contains(p.as_str()))
    }
}

/// Deterministic lexicon classifier.
///
/// Counts positive and negative lexicon hits in headline + summary, derives a
/// polarity and a bounded score from the counts, and tags the first matching
/// reason category. Unmatched text is neutral with no reason; classification
/// itself never fails.
pub struct SentimentClassifier {
    lexicon_version: u32,
    positive_words: HashSet<String>,
    negative_words: HashSet<String>,
    reasons: Vec<ReasonMatcher>,
}

impl SentimentClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &ClassifierConfig) -> Self {
        let reasons = config
            .reasons
            .iter()
            .map(|category| ReasonMatcher {
                label: category.label.clone(),
                patterns: category
                    .phrases
                    .iter()
                    .filter_map(|phrase| compile_phrase(phrase))
                    .collect(),
            })
            .collect();

        Self {
            lexicon_version: config.lexicon.version,
            positive_words: config.lexicon.positive.iter().map(|w| normalize_text(w)).collect(),
            negative_words: config.lexicon.negative.iter().map(|w| normalize_text(w)).collect(),
            reasons,
        }
    }

    pub fn lexicon_version(&self) -> u32 {
        self.lexicon_version
    }

    /// Count (positive, negative) lexicon hits; every occurrence counts
    fn count_hits(&self, normalized: &str) -> (u32, u32) {
        normalized
            .split_whitespace()
            .fold((0, 0), |(pos, neg), word| {
                if self.positive_words.contains(word) {
                    (pos + 1, neg)
                } else if self.negative_words.contains(word) {
                    (pos, neg + 1)
                } else {
                    (pos, neg)
                }
            })
    }

    fn extract_reason(&self, normalized: &str) -> Option<String> {
        let padded = format!(" {} ", normalized);
        self.reasons
            .iter()
            .find(|reason| reason.matches(&padded))
            .map(|reason| reason.label.clone())
    }

    pub fn classify(&self, article: &NewsArticle) -> SentimentResult {
        let normalized = normalize_text(&article.text());
        let (positive_hits, negative_hits) = self.count_hits(&normalized);

        let polarity = if positive_hits > negative_hits {
            Polarity::Positive
        } else if negative_hits > positive_hits {
            Polarity::Negative
        } else {
            Polarity::Neutral
        };

        let total = positive_hits + negative_hits;
        let score = if total == 0 {
            0.0
        } else {
            ((positive_hits as f64 - negative_hits as f64) / total as f64).clamp(-1.0, 1.0)
        };

        SentimentResult {
            article_id: article.id.clone(),
            polarity,
            reason: self.extract_reason(&normalized),
            score,
            positive_hits,
            negative_hits,
        }
    }

    pub fn classify_all(&self, articles: &[NewsArticle]) -> Vec<SentimentResult> {
        let results: Vec<SentimentResult> = articles.iter().map(|a| self.classify(a)).collect();
        tracing::debug!(
            "Classified {} articles with lexicon v{}",
            results.len(),
            self.lexicon_version
        );
        results
    }
}

impl Default for SentimentClassifier {
    fn default() -> Self {
        Self::build(&ClassifierConfig::default())
    }
}

/// `"sec "` becomes `" sec "` (whole word), `"regulat"` becomes `" regulat"` (word start)
fn compile_phrase(phrase: &str) -> Option<String> {
    let core = normalize_text(phrase);
    if core.is_empty() {
        return None;
    }
    if phrase.ends_with(' ') {
        Some(format!(" {} ", core))
    } else {
        Some(format!(" {}", core))
    }
}
