use crate::{build_http_client, transport_error, truncate_summary};
use analysis_core::{NewsArticle, NewsConfig, NewsSource, NewsSourceError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const NEWS_COUNT: u32 = 15;
const MAX_ARTICLES: usize = 10;

/// Key-free fallback news source using the Yahoo Finance search endpoint.
///
/// The endpoint has no date filter, so the window is applied client-side.
#[derive(Clone)]
pub struct YahooNewsSource {
    base_url: String,
    client: Client,
}

impl YahooNewsSource {
    pub fn new(base_url: impl Into<String>, config: &NewsConfig) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_http_client(config.source_timeout()),
        }
    }

    pub fn from_config(config: &NewsConfig) -> Self {
        Self::new(config.yahoo_base_url.clone(), config)
    }
}

#[async_trait]
impl NewsSource for YahooNewsSource {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch(
        &self,
        symbol: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<NewsArticle>, NewsSourceError> {
        let url = format!("{}/v1/finance/search", self.base_url);
        let news_count = NEWS_COUNT.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", symbol),
                ("newsCount", news_count.as_str()),
                ("quotesCount", "0"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NewsSourceError::RateLimited("Yahoo Finance throttled the request".to_string()));
        }
        if !status.is_success() {
            return Err(NewsSourceError::Network(format!(
                "Yahoo Finance HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|e| NewsSourceError::Network(format!("invalid Yahoo payload: {}", e)))?;

        let articles: Vec<NewsArticle> = payload
            .news
            .into_iter()
            .filter_map(|item| {
                let title = item.title.filter(|t| !t.trim().is_empty())?;
                let published = DateTime::from_timestamp(item.provider_publish_time?, 0)?;
                let day = published.date_naive();
                if day < since || day > until {
                    return None;
                }
                Some(NewsArticle::new(
                    item.publisher.unwrap_or_else(|| "Yahoo Finance".to_string()),
                    title,
                    truncate_summary(item.summary.as_deref()),
                    published,
                    item.link.unwrap_or_default(),
                ))
            })
            .take(MAX_ARTICLES)
            .collect();

        if articles.is_empty() {
            return Err(NewsSourceError::EmptyResult);
        }

        tracing::debug!("Yahoo Finance returned {} articles for {}", articles.len(), symbol);
        Ok(articles)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNewsItem {
    title: Option<String>,
    publisher: Option<String>,
    link: Option<String>,
    summary: Option<String>,
    provider_publish_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn epoch(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 15, 0, 0).unwrap().timestamp()
    }

    #[tokio::test]
    async fn test_filters_to_window() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/finance/search")
                .query_param("q", "ABC")
                .query_param("quotesCount", "0");
            then.status(200).json_body(json!({
                "quotes": [],
                "news": [
                    {
                        "uuid": "1",
                        "title": "ABC shares rally on upgrade",
                        "publisher": "Motley Fool",
                        "link": "https://finance.yahoo.com/1",
                        "providerPublishTime": epoch(2024, 3, 6)
                    },
                    {
                        "uuid": "2",
                        "title": "Old ABC story",
                        "publisher": "Zacks",
                        "link": "https://finance.yahoo.com/2",
                        "providerPublishTime": epoch(2024, 1, 2)
                    },
                    {
                        "uuid": "3",
                        "title": "No timestamp",
                        "publisher": "Zacks"
                    }
                ]
            }));
        });

        let source = YahooNewsSource::new(server.base_url(), &NewsConfig::default());
        let articles = source
            .fetch("ABC", date(2024, 3, 1), date(2024, 3, 8))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, "Motley Fool");
        assert_eq!(articles[0].headline, "ABC shares rally on upgrade");
        assert!(articles[0].summary.is_none());
    }

    #[tokio::test]
    async fn test_nothing_in_window_is_empty_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/finance/search");
            then.status(200).json_body(json!({"news": []}));
        });

        let source = YahooNewsSource::new(server.base_url(), &NewsConfig::default());
        let err = source
            .fetch("ABC", date(2024, 3, 1), date(2024, 3, 8))
            .await
            .unwrap_err();

        assert_eq!(err, NewsSourceError::EmptyResult);
    }

    #[tokio::test]
    async fn test_http_failure_is_network_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/finance/search");
            then.status(503).body("unavailable");
        });

        let source = YahooNewsSource::new(server.base_url(), &NewsConfig::default());
        let err = source
            .fetch("ABC", date(2024, 3, 1), date(2024, 3, 8))
            .await
            .unwrap_err();

        assert!(matches!(err, NewsSourceError::Network(_)));
    }

    #[tokio::test]
    async fn test_throttled_request_is_transient_for_fallback() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/finance/search");
            then.status(429).body("Too Many Requests");
        });

        let source = YahooNewsSource::new(server.base_url(), &NewsConfig::default());
        let err = source
            .fetch("ABC", date(2024, 3, 1), date(2024, 3, 8))
            .await
            .unwrap_err();

        assert!(matches!(err, NewsSourceError::RateLimited(_)));
        assert!(!err.suppresses_source(false));
    }
}
