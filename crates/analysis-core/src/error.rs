use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Neither news nor usable price history was available
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Failure kinds a news source adapter may report.
///
/// The aggregator absorbs all of these; none reach the correlator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NewsSourceError {
    /// Missing credential or rejected authentication
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Provider quota exhausted
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("No articles returned")]
    EmptyResult,
}

impl NewsSourceError {
    /// Whether the source should be skipped for the rest of the session.
    ///
    /// Missing credentials disable any source. Rate limits only disable the
    /// quota-bound primary tier; a throttled fallback is retried next call.
    pub fn suppresses_source(&self, is_primary: bool) -> bool {
        match self {
            NewsSourceError::Unavailable(_) => true,
            NewsSourceError::RateLimited(_) => is_primary,
            _ => false,
        }
    }
}
